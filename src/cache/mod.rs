pub(crate) mod page_snapshot;

use crate::api::{ApiClient, ApiResult};
use crate::models::PageDocument;
use crate::state::AppContext;
use crate::util::now_ms;
use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use serde_json::Value;
use page_snapshot::{load_page_snapshot, save_page_snapshot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Read-cache keys: `["pages"]` for the collection, `["pages", key]` per page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum QueryKey {
    Pages,
    Page(String),
}

impl QueryKey {
    pub fn parts(&self) -> Vec<&str> {
        match self {
            QueryKey::Pages => vec!["pages"],
            QueryKey::Page(page_key) => vec!["pages", page_key.as_str()],
        }
    }
}

/// Receiver of "this read is stale" signals raised after writes.
pub(crate) trait CacheInvalidator {
    fn invalidate(&self, key: &QueryKey);
}

/// In-memory part of the page cache.
#[derive(Debug, Default)]
pub(crate) struct PageStore {
    pages: HashMap<String, PageDocument>,
    list: Option<Vec<PageDocument>>,
    versions: HashMap<QueryKey, u64>,
}

impl PageStore {
    pub fn get(&self, page_key: &str) -> Option<&PageDocument> {
        self.pages.get(page_key)
    }

    pub fn put(&mut self, page: PageDocument) {
        self.pages.insert(page.page_key.clone(), page);
    }

    pub fn list(&self) -> Option<&[PageDocument]> {
        self.list.as_deref()
    }

    pub fn put_list(&mut self, pages: Vec<PageDocument>) {
        self.list = Some(pages);
    }

    pub fn invalidate(&mut self, key: &QueryKey) {
        match key {
            QueryKey::Pages => self.list = None,
            QueryKey::Page(page_key) => {
                self.pages.remove(page_key);
            }
        }
        *self.versions.entry(key.clone()).or_default() += 1;
    }

    pub fn version(&self, key: &QueryKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }
}

/// Shared page read cache.
///
/// Readers call [`PageCache::track`] inside an `Effect` so any invalidation
/// re-runs them; they refetch when the entry they need is gone.
#[derive(Clone)]
pub(crate) struct PageCache {
    store: Arc<Mutex<PageStore>>,
    epoch: RwSignal<u64>,
}

impl PageCache {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(PageStore::default())),
            epoch: RwSignal::new(0),
        }
    }

    /// Subscribe the current reactive scope to invalidations; returns the key's version.
    pub fn track(&self, key: &QueryKey) -> u64 {
        self.epoch.track();
        self.version(key)
    }

    pub fn version(&self, key: &QueryKey) -> u64 {
        self.store.lock().map(|s| s.version(key)).unwrap_or(0)
    }

    /// Fresh in-memory page, if any.
    pub fn get(&self, page_key: &str) -> Option<PageDocument> {
        self.store
            .lock()
            .ok()
            .and_then(|s| s.get(page_key).cloned())
    }

    /// Fresh page, else the last snapshot (possibly stale) for first paint.
    pub fn get_or_snapshot(&self, page_key: &str) -> Option<PageDocument> {
        self.get(page_key)
            .or_else(|| load_page_snapshot(page_key).map(|s| s.page))
    }

    pub fn get_list(&self) -> Option<Vec<PageDocument>> {
        self.store
            .lock()
            .ok()
            .and_then(|s| s.list().map(|l| l.to_vec()))
    }

    pub fn put(&self, page: PageDocument) {
        save_page_snapshot(&page, now_ms());
        if let Ok(mut s) = self.store.lock() {
            s.put(page);
        }
    }

    /// Cached page, fetching through `api` when it is missing or invalidated.
    pub async fn load_page(
        &self,
        api: &ApiClient,
        page_key: &str,
    ) -> ApiResult<Option<PageDocument>> {
        if let Some(page) = self.get(page_key) {
            return Ok(Some(page));
        }

        let fetched = api.get_page(page_key).await?;
        if let Some(page) = &fetched {
            self.put(page.clone());
        }
        Ok(fetched)
    }

    pub async fn load_pages(&self, api: &ApiClient) -> ApiResult<Vec<PageDocument>> {
        if let Some(list) = self.get_list() {
            return Ok(list);
        }

        let pages = api.list_pages().await?;
        if let Ok(mut s) = self.store.lock() {
            s.put_list(pages.clone());
        }
        Ok(pages)
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInvalidator for PageCache {
    fn invalidate(&self, key: &QueryKey) {
        log!("[cache] invalidate {:?}", key.parts());
        if let Ok(mut s) = self.store.lock() {
            s.invalidate(key);
        }
        self.epoch.update(|e| *e = e.wrapping_add(1));
    }
}

/// One page read through the shared cache, reloaded after invalidation.
#[derive(Clone, Copy)]
pub(crate) struct PageQuery {
    pub page: RwSignal<Option<PageDocument>>,
    pub loading: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
}

impl PageQuery {
    /// Text of `field_key`, or `fallback` while the page has no such field.
    pub fn field(&self, field_key: &'static str, fallback: &'static str) -> Signal<String> {
        let page = self.page;
        Signal::derive(move || {
            page.with(|p| p.as_ref().and_then(|p| p.field_text(field_key)))
                .unwrap_or_else(|| fallback.to_string())
        })
    }

    /// Reflect a local edit before it is saved.
    pub fn apply(&self, field_key: &str, value: String) {
        let field_key = field_key.to_string();
        self.page.update(|p| {
            let page = p.get_or_insert_with(PageDocument::default);
            page.content.insert(field_key, Value::String(value));
        });
    }
}

pub(crate) fn use_page_content(page_key: &str) -> PageQuery {
    let app = expect_context::<AppContext>();
    let cache = app.0.page_cache.clone();
    let page_key = page_key.to_string();

    let query = PageQuery {
        page: RwSignal::new(cache.get_or_snapshot(&page_key)),
        loading: RwSignal::new(false),
        error: RwSignal::new(None),
    };

    Effect::new(move |_| {
        let key = QueryKey::Page(page_key.clone());
        let version = cache.track(&key);
        let api = app.0.api_client.get_untracked();
        let cache = cache.clone();
        let page_key = page_key.clone();

        query.loading.set(true);
        spawn_local(async move {
            let result = cache.load_page(&api, &page_key).await;
            if cache.version(&key) != version {
                // invalidated while loading; the next run reloads
                return;
            }
            match result {
                Ok(Some(page)) => {
                    query.page.set(Some(page));
                    query.error.set(None);
                }
                Ok(None) => {
                    query.page.set(None);
                    query.error.set(None);
                }
                Err(e) => {
                    warn!("[cache] load {page_key} failed: {e}");
                    query.error.set(Some(e.to_string()));
                }
            }
            query.loading.set(false);
        });
    });

    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(key: &str) -> PageDocument {
        PageDocument {
            page_key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_key_parts() {
        assert_eq!(QueryKey::Pages.parts(), vec!["pages"]);
        assert_eq!(
            QueryKey::Page("homepage".to_string()).parts(),
            vec!["pages", "homepage"]
        );
    }

    #[test]
    fn test_store_invalidate_page_drops_entry_and_bumps_version() {
        let mut store = PageStore::default();
        store.put(page("homepage"));
        store.put(page("about"));
        let key = QueryKey::Page("homepage".to_string());

        assert_eq!(store.version(&key), 0);
        store.invalidate(&key);

        assert!(store.get("homepage").is_none());
        assert!(store.get("about").is_some());
        assert_eq!(store.version(&key), 1);
        assert_eq!(store.version(&QueryKey::Pages), 0);
    }

    #[test]
    fn test_store_invalidate_collection_drops_list_only() {
        let mut store = PageStore::default();
        store.put(page("homepage"));
        store.put_list(vec![page("homepage")]);

        store.invalidate(&QueryKey::Pages);

        assert!(store.list().is_none());
        assert!(store.get("homepage").is_some());
        assert_eq!(store.version(&QueryKey::Pages), 1);
    }
}
