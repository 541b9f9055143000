//! In-memory page API and cache used by the edit tests.

use crate::api::{ApiError, ApiResult, PagesApi};
use crate::cache::{CacheInvalidator, QueryKey};
use crate::models::{PageContent, PageDocument, PageUpdate};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Fetch(String),
    Update(String, PageUpdate),
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub pages: RefCell<HashMap<String, PageDocument>>,
    pub fail_fetch: Vec<&'static str>,
    pub fail_update: Vec<&'static str>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeApi {
    pub fn with_page(self, page_key: &str, content: serde_json::Value) -> Self {
        let content = content.as_object().cloned().unwrap_or_default();
        self.pages.borrow_mut().insert(
            page_key.to_string(),
            PageDocument {
                page_key: page_key.to_string(),
                content,
                ..Default::default()
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn stored(&self, page_key: &str) -> Option<PageDocument> {
        self.pages.borrow().get(page_key).cloned()
    }
}

impl PagesApi for FakeApi {
    async fn fetch_page(&self, page_key: &str) -> ApiResult<Option<PageDocument>> {
        self.calls.borrow_mut().push(Call::Fetch(page_key.to_string()));
        if self.fail_fetch.iter().any(|k| *k == page_key) {
            return Err(ApiError::http(503, "unavailable".to_string(), "Request failed"));
        }
        Ok(self.pages.borrow().get(page_key).cloned())
    }

    async fn update_page(&self, page_key: &str, update: &PageUpdate) -> ApiResult<PageDocument> {
        self.calls
            .borrow_mut()
            .push(Call::Update(page_key.to_string(), update.clone()));
        if self.fail_update.iter().any(|k| *k == page_key) {
            return Err(ApiError::http(500, "boom".to_string(), "Request failed"));
        }
        let doc = PageDocument {
            page_key: page_key.to_string(),
            title: update.title.clone().unwrap_or_default(),
            content: update.content.clone().unwrap_or_default(),
            ..Default::default()
        };
        self.pages.borrow_mut().insert(page_key.to_string(), doc.clone());
        Ok(doc)
    }
}

#[derive(Default)]
pub(crate) struct FakeCache {
    pub invalidated: RefCell<Vec<QueryKey>>,
}

impl CacheInvalidator for FakeCache {
    fn invalidate(&self, key: &QueryKey) {
        self.invalidated.borrow_mut().push(key.clone());
    }
}

pub(crate) fn content(value: serde_json::Value) -> PageContent {
    value.as_object().cloned().unwrap_or_default()
}
