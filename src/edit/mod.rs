//! In-place page editing: the change ledger, the edit-mode session that owns
//! it, the reconciler that writes it back, and the per-page autosave debounce.

pub(crate) mod autosave;
#[cfg(test)]
mod fakes;
pub(crate) mod ledger;
pub(crate) mod reconcile;
pub(crate) mod session;

pub(crate) use ledger::{content_key, ChangeLedger};
pub(crate) use session::{provide_edit_session, use_edit_session, EditSession};

/// Editor tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EditorConfig {
    /// Quiet period before a page editor autosaves.
    pub autosave_ms: u32,
    /// Target upper bound for compressed uploads.
    pub image_target_bytes: u64,
    /// Longest side of a compressed upload, in pixels.
    pub image_max_dimension: u32,
    /// How long the toolbar keeps a save notice on screen.
    pub notice_ms: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_ms: 2000,
            image_target_bytes: 1024 * 1024,
            image_max_dimension: 1920,
            notice_ms: 4000,
        }
    }
}
