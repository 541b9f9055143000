use crate::models::AccountInfo;
use serde::{Deserialize, Serialize};

pub(crate) const TOKEN_KEY: &str = "rentals_token";
pub(crate) const USER_KEY: &str = "rentals_user";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_user_from_storage() -> Option<AccountInfo> {
    load_json_from_storage(USER_KEY)
}

pub(crate) fn load_string_from_storage(key: &str) -> Option<String> {
    local_storage()?.get_item(key).ok().flatten()
}

pub(crate) fn save_string_to_storage(key: &str, value: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.set_item(key, value);
    }
}

pub(crate) fn remove_from_storage(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let json = load_string_from_storage(key)?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        save_string_to_storage(key, &json);
    }
}

// Browser-only: localStorage does not exist in native test runs.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_user_storage_roundtrip() {
        let user = AccountInfo {
            extra: serde_json::json!({"id": 1, "role": "admin"}),
        };
        save_json_to_storage(USER_KEY, &user);
        let loaded = load_user_from_storage().expect("should load user from localStorage");
        assert!(loaded.is_admin());

        remove_from_storage(USER_KEY);
        assert!(load_user_from_storage().is_none());
    }

    #[wasm_bindgen_test]
    fn test_corrupt_json_reads_as_none() {
        save_string_to_storage("rentals_test_corrupt", "{not json");
        assert!(load_json_from_storage::<AccountInfo>("rentals_test_corrupt").is_none());
        remove_from_storage("rentals_test_corrupt");
    }
}
