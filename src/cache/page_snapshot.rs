use crate::models::PageDocument;
use crate::storage::{load_json_from_storage, save_json_to_storage};
use serde::{Deserialize, Serialize};

fn key(page_key: &str) -> String {
    format!("rentals_page_snapshot::{page_key}")
}

/// Last page document seen from the backend, kept for a fast first paint.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct PageSnapshot {
    pub saved_ms: i64,
    pub page: PageDocument,
}

pub(crate) fn save_page_snapshot(page: &PageDocument, saved_ms: i64) {
    if page.page_key.trim().is_empty() {
        return;
    }

    let snap = PageSnapshot {
        saved_ms,
        page: page.clone(),
    };
    save_json_to_storage(&key(&page.page_key), &snap);
}

pub(crate) fn load_page_snapshot(page_key: &str) -> Option<PageSnapshot> {
    if page_key.trim().is_empty() {
        return None;
    }
    load_json_from_storage::<PageSnapshot>(&key(page_key))
}
