use super::ledger::ChangeLedger;
use crate::api::{ApiError, PagesApi};
use crate::cache::{CacheInvalidator, QueryKey};
use crate::models::{PageContent, PageUpdate};
use crate::util::page_title_from_key;
use leptos::logging::{log, warn};

/// A page failed to persist. Pages listed in `saved` were written before it.
#[derive(Clone, Debug, thiserror::Error)]
#[error("Failed to save {}: {source}", page_title_from_key(.page_key))]
pub(crate) struct ReconcileError {
    pub page_key: String,
    pub saved: Vec<String>,
    #[source]
    pub source: ApiError,
}

/// Write every ledger entry back to its page.
///
/// Pages are processed one at a time in first-edit order. Each page is
/// fetched, its changed fields are merged over the stored content, and the
/// merged content is persisted with a title derived from the page key. The
/// first persist failure stops the batch. Cached reads of the collection and
/// of every page that was written are invalidated either way.
pub(crate) async fn reconcile<A, C>(
    api: &A,
    cache: &C,
    changes: &ChangeLedger,
) -> Result<Vec<String>, ReconcileError>
where
    A: PagesApi,
    C: CacheInvalidator,
{
    let batch = changes.group_by_page();
    for key in &batch.malformed {
        warn!("[reconcile] skipping change with malformed key {key:?}");
    }

    let mut saved: Vec<String> = Vec::with_capacity(batch.pages.len());
    let mut failure: Option<(String, ApiError)> = None;

    for (page_key, changed) in batch.pages {
        let current = match api.fetch_page(&page_key).await {
            Ok(Some(page)) => page.content,
            Ok(None) => PageContent::new(),
            Err(e) => {
                warn!("[reconcile] fetch {page_key} failed, saving over empty content: {e}");
                PageContent::new()
            }
        };

        let update = PageUpdate {
            title: Some(page_title_from_key(&page_key)),
            content: Some(merge_content(current, changed)),
            ..Default::default()
        };

        match api.update_page(&page_key, &update).await {
            Ok(_) => {
                log!("[reconcile] saved {page_key}");
                saved.push(page_key);
            }
            Err(e) => {
                failure = Some((page_key, e));
                break;
            }
        }
    }

    if !saved.is_empty() || failure.is_some() {
        invalidate_saved(cache, &saved);
    }

    match failure {
        None => Ok(saved),
        Some((page_key, source)) => Err(ReconcileError {
            page_key,
            saved,
            source,
        }),
    }
}

/// Shallow merge; `changed` wins on collisions.
fn merge_content(mut current: PageContent, changed: PageContent) -> PageContent {
    for (field_key, value) in changed {
        current.insert(field_key, value);
    }
    current
}

fn invalidate_saved<C: CacheInvalidator>(cache: &C, saved: &[String]) {
    cache.invalidate(&QueryKey::Pages);
    for page_key in saved {
        cache.invalidate(&QueryKey::Page(page_key.clone()));
    }
}
