use super::ledger::{split_content_key, ChangeLedger};
use super::reconcile::{reconcile, ReconcileError};
use crate::api::{ApiClient, PagesApi};
use crate::cache::{CacheInvalidator, PageCache, QueryKey};
use crate::models::AccountInfo;
use crate::state::AppContext;
use crate::util::{join_names, page_title_from_key};
use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub(crate) enum EditMode {
    Viewing,
    Editing,
}

/// Edit-mode state machine, independent of the reactive runtime.
///
/// `requested` is what the user asked for; edit mode is only effective while
/// the user is also an admin. `saving` blocks mode changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SessionState {
    requested: bool,
    saving: bool,
    pending: ChangeLedger,
}

impl SessionState {
    pub fn is_edit_mode(&self, is_admin: bool) -> bool {
        is_admin && self.requested
    }

    pub fn mode(&self, is_admin: bool) -> EditMode {
        if self.is_edit_mode(is_admin) {
            EditMode::Editing
        } else {
            EditMode::Viewing
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn pending(&self) -> &ChangeLedger {
        &self.pending
    }

    /// `None` when the request was ignored. Otherwise the pages whose
    /// pending changes were discarded, which is only non-empty when leaving
    /// edit mode.
    pub fn request_edit_mode(&mut self, on: bool, is_admin: bool) -> Option<Vec<String>> {
        if self.saving || (on && !is_admin) {
            return None;
        }
        self.requested = on;
        Some(if on { vec![] } else { self.discard_changes() })
    }

    /// Returns `false` for a key that does not name a page and a field.
    pub fn register_change(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if split_content_key(&key).is_none() {
            return false;
        }
        self.pending.insert(key, value);
        true
    }

    /// Drop every pending change, returning the pages that had some.
    pub fn discard_changes(&mut self) -> Vec<String> {
        let pages = self.pending.page_keys();
        self.pending.clear();
        pages
    }

    /// Enter the saving state and hand out the ledger to write. `None` when
    /// a save is already running or nothing is pending.
    pub fn begin_save(&mut self) -> Option<ChangeLedger> {
        if self.saving || self.pending.is_empty() {
            return None;
        }
        self.saving = true;
        Some(self.pending.clone())
    }

    /// Leave the saving state, dropping what `saved_pages` persisted from `snapshot`.
    pub fn finish_save(&mut self, snapshot: &ChangeLedger, saved_pages: &[String]) {
        self.saving = false;
        self.pending.remove_saved(snapshot, saved_pages);
    }
}

/// Somewhere a [`SessionState`] lives between awaits.
pub(crate) trait SessionStore {
    /// `None` when the state is gone.
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Option<R>;
}

impl SessionStore for RwSignal<SessionState> {
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        self.try_update(f)
    }
}

/// Write the pending ledger through `api` and settle the session.
///
/// Nothing happens outside edit mode or while another save runs. Pages
/// written before a failure leave the ledger; the failed page and the ones
/// after it stay pending for a retry.
pub(crate) async fn save_session<S, A, C>(
    store: &S,
    is_admin: bool,
    api: &A,
    cache: &C,
) -> Result<Vec<String>, ReconcileError>
where
    S: SessionStore,
    A: PagesApi,
    C: CacheInvalidator,
{
    let snapshot = store
        .with_state(|s| if s.is_edit_mode(is_admin) { s.begin_save() } else { None })
        .flatten();
    let Some(snapshot) = snapshot else {
        return Ok(vec![]);
    };

    let result = reconcile(api, cache, &snapshot).await;
    let saved = match &result {
        Ok(saved) => saved.clone(),
        Err(e) => {
            error!("[edit] {e}");
            e.saved.clone()
        }
    };
    store.with_state(|s| s.finish_save(&snapshot, &saved));
    result
}

/// Mark discarded pages stale so readers reload the stored copy.
pub(crate) fn reload_pages<C: CacheInvalidator>(cache: &C, pages: &[String]) {
    for page_key in pages {
        cache.invalidate(&QueryKey::Page(page_key.clone()));
    }
}

/// Outcome of the last save, shown by the toolbar.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SaveNotice {
    Saved(Vec<String>),
    Failed { page_key: String, message: String },
}

impl SaveNotice {
    pub fn from_result(result: &Result<Vec<String>, ReconcileError>) -> Self {
        match result {
            Ok(saved) => SaveNotice::Saved(saved.clone()),
            Err(e) => SaveNotice::Failed {
                page_key: e.page_key.clone(),
                message: e.source.to_string(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SaveNotice::Failed { .. })
    }

    pub fn message(&self) -> String {
        match self {
            SaveNotice::Saved(pages) if pages.is_empty() => "Nothing to save".to_string(),
            SaveNotice::Saved(pages) => {
                let titles: Vec<String> = pages.iter().map(|p| page_title_from_key(p)).collect();
                format!("Saved {}", join_names(&titles))
            }
            SaveNotice::Failed { page_key, message } => {
                format!("Failed to save {}: {message}", page_title_from_key(page_key))
            }
        }
    }
}

/// Edit-mode session for one app mount, shared through context.
#[derive(Clone, Copy)]
pub(crate) struct EditSession {
    is_admin: Signal<bool>,
    state: RwSignal<SessionState>,
    pub notice: RwSignal<Option<SaveNotice>>,
    /// Bumped whenever pending changes are thrown away.
    discards: RwSignal<u64>,
    api_client: RwSignal<ApiClient>,
    cache: StoredValue<PageCache>,
}

impl EditSession {
    pub fn new(app: &AppContext) -> Self {
        let current_user: RwSignal<Option<AccountInfo>> = app.0.current_user;
        Self {
            is_admin: Signal::derive(move || {
                current_user.with(|u| u.as_ref().map(AccountInfo::is_admin).unwrap_or(false))
            }),
            state: RwSignal::new(SessionState::default()),
            notice: RwSignal::new(None),
            discards: RwSignal::new(0),
            api_client: app.0.api_client,
            cache: StoredValue::new(app.0.page_cache.clone()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin.get()
    }

    pub fn is_edit_mode(&self) -> bool {
        let is_admin = self.is_admin.get();
        self.state.with(|s| s.is_edit_mode(is_admin))
    }

    pub fn mode(&self) -> EditMode {
        let is_admin = self.is_admin.get();
        self.state.with(|s| s.mode(is_admin))
    }

    pub fn is_saving(&self) -> bool {
        self.state.with(SessionState::is_saving)
    }

    pub fn pending_count(&self) -> usize {
        self.state.with(|s| s.pending().len())
    }

    /// Tracked counter that editors watch to drop local values nobody saved.
    pub fn discards(&self) -> u64 {
        self.discards.get()
    }

    pub fn set_edit_mode(&self, on: bool) {
        let is_admin = self.is_admin.get_untracked();
        let discarded = self
            .state
            .try_update(|s| {
                let result = s.request_edit_mode(on, is_admin);
                if result.is_none() {
                    log!("[edit] edit mode request ignored (admin={is_admin}, saving={})", s.is_saving());
                }
                result
            })
            .flatten();
        if !on {
            self.notice.set(None);
        }
        if let Some(pages) = discarded {
            self.reload_discarded(&pages);
        }
    }

    pub fn toggle(&self) {
        let is_admin = self.is_admin.get_untracked();
        let on = !self.state.with_untracked(|s| s.is_edit_mode(is_admin));
        self.set_edit_mode(on);
    }

    pub fn register_change(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let accepted = self
            .state
            .try_update(|s| s.register_change(key.clone(), value))
            .unwrap_or(false);
        if !accepted {
            warn!("[edit] ignoring change with malformed key {key:?}");
        }
    }

    pub fn clear_changes(&self) {
        let pages = self
            .state
            .try_update(SessionState::discard_changes)
            .unwrap_or_default();
        self.reload_discarded(&pages);
    }

    fn reload_discarded(&self, pages: &[String]) {
        if pages.is_empty() {
            return;
        }
        reload_pages(&self.cache.get_value(), pages);
        self.discards.update(|n| *n += 1);
    }

    /// Persist every pending change and report the outcome as a notice.
    pub async fn save_changes(&self) -> Result<Vec<String>, ReconcileError> {
        let is_admin = self.is_admin.get_untracked();
        let api = self.api_client.get_untracked();
        let cache = self.cache.get_value();
        let result = save_session(&self.state, is_admin, &api, &cache).await;
        self.notice.set(Some(SaveNotice::from_result(&result)));
        result
    }
}

pub(crate) fn provide_edit_session(app: &AppContext) -> EditSession {
    let session = EditSession::new(app);
    provide_context(session);
    session
}

pub(crate) fn use_edit_session() -> EditSession {
    expect_context::<EditSession>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::edit::fakes::{FakeApi, FakeCache};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;

    impl SessionStore for RefCell<SessionState> {
        fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
            Some(f(&mut self.borrow_mut()))
        }
    }

    fn editing_admin() -> SessionState {
        let mut s = SessionState::default();
        assert_eq!(s.request_edit_mode(true, true), Some(vec![]));
        s
    }

    #[test]
    fn test_non_admin_cannot_enter_edit_mode() {
        let mut s = SessionState::default();
        assert_eq!(s.request_edit_mode(true, false), None);
        assert_eq!(s.mode(false), EditMode::Viewing);
        assert_eq!(s.mode(true), EditMode::Viewing);
    }

    #[test]
    fn test_edit_mode_follows_admin_flag() {
        let s = editing_admin();
        assert!(s.is_edit_mode(true));
        assert!(!s.is_edit_mode(false));
        assert_eq!(s.mode(true).to_string(), "Editing");
    }

    #[test]
    fn test_leaving_edit_mode_discards_pending_and_names_pages() {
        let mut s = editing_admin();
        assert!(s.register_change("homepage.heroTitle", json!("A")));
        assert!(s.register_change("about.title", json!("B")));
        assert!(s.register_change("homepage.stat1", json!("C")));

        let discarded = s.request_edit_mode(false, true).expect("not saving");

        assert_eq!(discarded, vec!["homepage".to_string(), "about".to_string()]);
        assert!(s.pending().is_empty());
        assert!(!s.is_edit_mode(true));

        let cache = FakeCache::default();
        reload_pages(&cache, &discarded);
        assert_eq!(
            *cache.invalidated.borrow(),
            vec![
                QueryKey::Page("homepage".to_string()),
                QueryKey::Page("about".to_string())
            ]
        );
    }

    #[test]
    fn test_discard_keeps_edit_mode() {
        let mut s = editing_admin();
        s.register_change("about.body", json!("<p>Draft</p>"));

        assert_eq!(s.discard_changes(), vec!["about".to_string()]);
        assert!(s.pending().is_empty());
        assert!(s.is_edit_mode(true));
        assert!(s.discard_changes().is_empty());
    }

    #[test]
    fn test_malformed_keys_are_not_registered() {
        let mut s = editing_admin();
        assert!(!s.register_change("homepage.", json!("x")));
        assert!(!s.register_change("heroTitle", json!("x")));
        assert!(!s.register_change(".heroTitle", json!("x")));
        assert!(s.pending().is_empty());
    }

    #[test]
    fn test_mode_changes_ignored_while_saving() {
        let mut s = editing_admin();
        s.register_change("homepage.heroTitle", json!("A"));
        let snapshot = s.begin_save().expect("pending change");

        assert_eq!(s.request_edit_mode(false, true), None);
        assert!(s.is_edit_mode(true));
        assert_eq!(s.pending().len(), 1);
        assert!(s.begin_save().is_none());

        s.finish_save(&snapshot, &["homepage".to_string()]);
        assert!(!s.is_saving());
        assert!(s.pending().is_empty());
    }

    #[test]
    fn test_begin_save_with_nothing_pending() {
        let mut s = editing_admin();
        assert!(s.begin_save().is_none());
        assert!(!s.is_saving());
    }

    #[test]
    fn test_save_clears_ledger_on_success() {
        let store = RefCell::new(editing_admin());
        store.borrow_mut().register_change("homepage.heroTitle", json!("Welcome Home"));
        store.borrow_mut().register_change("homepage.stat1", json!("99,999+ Listings"));
        let api = FakeApi::default().with_page("homepage", json!({"heroSubtitle": "Keep me"}));
        let cache = FakeCache::default();

        let saved = block_on(save_session(&store, true, &api, &cache)).expect("save succeeds");

        assert_eq!(saved, vec!["homepage".to_string()]);
        assert!(store.borrow().pending().is_empty());
        assert!(!store.borrow().is_saving());
        assert_eq!(
            api.stored("homepage").and_then(|p| p.field_text("heroSubtitle")).as_deref(),
            Some("Keep me")
        );
    }

    #[test]
    fn test_failed_save_keeps_only_unsaved_pages() {
        let store = RefCell::new(editing_admin());
        store.borrow_mut().register_change("homepage.heroTitle", json!("A"));
        store.borrow_mut().register_change("about.title", json!("B"));
        let api = FakeApi {
            fail_update: vec!["about"],
            ..Default::default()
        };
        let cache = FakeCache::default();

        let err = block_on(save_session(&store, true, &api, &cache)).expect_err("about fails");

        assert_eq!(err.page_key, "about");
        assert_eq!(err.saved, vec!["homepage".to_string()]);
        let state = store.borrow();
        assert_eq!(state.pending().get("homepage.heroTitle"), None);
        assert_eq!(state.pending().get("about.title"), Some(&json!("B")));
        assert!(!state.is_saving());
        assert!(state.is_edit_mode(true));
        assert_eq!(
            *cache.invalidated.borrow(),
            vec![QueryKey::Pages, QueryKey::Page("homepage".to_string())]
        );
    }

    #[test]
    fn test_save_outside_edit_mode_sends_nothing() {
        let store = RefCell::new(SessionState::default());
        store.borrow_mut().register_change("about.title", json!("B"));
        let api = FakeApi::default();
        let cache = FakeCache::default();

        let saved = block_on(save_session(&store, true, &api, &cache)).expect("no-op");

        assert!(saved.is_empty());
        assert!(api.calls().is_empty());
        assert_eq!(store.borrow().pending().len(), 1);
    }

    #[test]
    fn test_save_notice_messages() {
        let saved = SaveNotice::Saved(vec!["homepage".to_string(), "about".to_string()]);
        assert_eq!(saved.message(), "Saved Homepage and About");
        assert!(!saved.is_error());

        let err = ReconcileError {
            page_key: "about".to_string(),
            saved: vec!["homepage".to_string()],
            source: ApiError::http(500, "boom".to_string(), "Request failed"),
        };
        let failed = SaveNotice::from_result(&Err(err));
        assert!(failed.is_error());
        assert_eq!(failed.message(), "Failed to save About: Request failed (500): boom");
    }
}
