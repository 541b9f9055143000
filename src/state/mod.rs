use crate::api::ApiClient;
use crate::cache::PageCache;
use crate::models::AccountInfo;
use crate::storage::load_user_from_storage;
use leptos::prelude::*;

#[derive(Clone)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,
    /// Set by the auth flow; only the admin flag is read here.
    pub current_user: RwSignal<Option<AccountInfo>>,
    pub page_cache: PageCache,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            api_client: RwSignal::new(ApiClient::load_from_storage()),
            current_user: RwSignal::new(load_user_from_storage()),
            page_cache: PageCache::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
