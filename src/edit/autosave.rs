use crate::models::{PageContent, PageStatus, PageUpdate};
use crate::sanitize::sanitize;
use crate::util::page_title_from_key;
use leptos::logging::warn;
use leptos_dom::helpers::{set_timeout_with_handle, TimeoutHandle};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// One-shot timers the scheduler runs on.
pub(crate) trait Timers {
    type Handle;

    /// `None` when the timer could not be armed.
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Option<Self::Handle>;

    fn cancel(&self, handle: Self::Handle);
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BrowserTimers;

impl Timers for BrowserTimers {
    type Handle = TimeoutHandle;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Option<TimeoutHandle> {
        match set_timeout_with_handle(task, Duration::from_millis(u64::from(delay_ms))) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("[autosave] failed to arm timer: {e:?}");
                None
            }
        }
    }

    fn cancel(&self, handle: TimeoutHandle) {
        handle.clear();
    }
}

struct Inner<H, P> {
    pending: Option<P>,
    timer: Option<H>,
    generation: u64,
}

/// Debounced save of the latest payload.
///
/// `schedule` replaces the payload and restarts the quiet period; only the
/// last payload is saved when it elapses. `flush` saves right away and
/// `cancel` drops whatever is pending.
pub(crate) struct AutosaveScheduler<T: Timers, P> {
    timers: T,
    delay_ms: u32,
    inner: Rc<RefCell<Inner<T::Handle, P>>>,
    save: Rc<dyn Fn(P)>,
}

impl<T: Timers + Clone, P> Clone for AutosaveScheduler<T, P> {
    fn clone(&self) -> Self {
        Self {
            timers: self.timers.clone(),
            delay_ms: self.delay_ms,
            inner: Rc::clone(&self.inner),
            save: Rc::clone(&self.save),
        }
    }
}

impl<T, P> AutosaveScheduler<T, P>
where
    T: Timers,
    P: 'static,
    T::Handle: 'static,
{
    pub fn new(timers: T, delay_ms: u32, save: impl Fn(P) + 'static) -> Self {
        Self {
            timers,
            delay_ms,
            inner: Rc::new(RefCell::new(Inner {
                pending: None,
                timer: None,
                generation: 0,
            })),
            save: Rc::new(save),
        }
    }

    pub fn schedule(&self, payload: P) {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            if let Some(handle) = inner.timer.take() {
                self.timers.cancel(handle);
            }
            inner.pending = Some(payload);
            inner.generation += 1;
            inner.generation
        };

        let weak = Rc::downgrade(&self.inner);
        let save = Rc::clone(&self.save);
        let task = Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let payload = {
                let mut inner = inner.borrow_mut();
                if inner.generation != generation {
                    return;
                }
                inner.timer = None;
                inner.pending.take()
            };
            if let Some(payload) = payload {
                save(payload);
            }
        });

        let handle = self.timers.schedule(self.delay_ms, task);
        self.inner.borrow_mut().timer = handle;
    }

    /// Save the pending payload now. Returns `false` if nothing was pending.
    pub fn flush(&self) -> bool {
        let payload = {
            let mut inner = self.inner.borrow_mut();
            if let Some(handle) = inner.timer.take() {
                self.timers.cancel(handle);
            }
            inner.generation += 1;
            inner.pending.take()
        };
        match payload {
            Some(payload) => {
                (self.save)(payload);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(handle) = inner.timer.take() {
            self.timers.cancel(handle);
        }
        inner.generation += 1;
        inner.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.inner.borrow().pending.is_some()
    }
}

/// Local, not yet persisted state of the page being edited.
///
/// String content is sanitized by [`PageDraft::to_update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PageDraft {
    pub title: String,
    pub content: PageContent,
    pub meta_title: String,
    pub meta_description: String,
    pub status: PageStatus,
}

impl PageDraft {
    /// Full update for `page_key`.
    ///
    /// Every field is sent, blank ones included, so clearing a field clears
    /// it on the server. A blank title falls back to the one derived from the key.
    pub fn to_update(&self, page_key: &str) -> PageUpdate {
        let title = match self.title.trim() {
            "" => page_title_from_key(page_key),
            title => title.to_string(),
        };
        let content = self
            .content
            .iter()
            .map(|(k, v)| match v {
                Value::String(html) => (k.clone(), Value::String(sanitize(html))),
                other => (k.clone(), other.clone()),
            })
            .collect();
        PageUpdate {
            title: Some(title),
            content: Some(content),
            meta_title: Some(self.meta_title.trim().to_string()),
            meta_description: Some(self.meta_description.trim().to_string()),
            status: Some(self.status),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub(crate) enum SaveStatus {
    #[default]
    #[strum(serialize = "Saved")]
    Saved,
    #[strum(serialize = "Unsaved")]
    Unsaved,
    #[strum(serialize = "Saving…")]
    Saving,
    #[strum(serialize = "Save failed")]
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Task = Box<dyn FnOnce()>;

    /// Timers fired by hand.
    #[derive(Clone, Default)]
    struct ManualTimers {
        slots: Rc<RefCell<Vec<Option<Task>>>>,
    }

    impl ManualTimers {
        fn armed(&self) -> usize {
            self.slots.borrow().iter().filter(|t| t.is_some()).count()
        }

        fn fire_all(&self) {
            let tasks: Vec<Task> = self.slots.borrow_mut().iter_mut().filter_map(Option::take).collect();
            for task in tasks {
                task();
            }
        }
    }

    impl Timers for ManualTimers {
        type Handle = usize;

        fn schedule(&self, _delay_ms: u32, task: Task) -> Option<usize> {
            let mut slots = self.slots.borrow_mut();
            slots.push(Some(task));
            Some(slots.len() - 1)
        }

        fn cancel(&self, handle: usize) {
            if let Some(slot) = self.slots.borrow_mut().get_mut(handle) {
                *slot = None;
            }
        }
    }

    fn scheduler() -> (ManualTimers, Rc<RefCell<Vec<u32>>>, AutosaveScheduler<ManualTimers, u32>) {
        let timers = ManualTimers::default();
        let saved = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&saved);
        let s = AutosaveScheduler::new(timers.clone(), 2000, move |v| sink.borrow_mut().push(v));
        (timers, saved, s)
    }

    #[test]
    fn test_rapid_updates_coalesce_into_last_payload() {
        let (timers, saved, s) = scheduler();
        s.schedule(1);
        s.schedule(2);
        s.schedule(3);

        assert_eq!(timers.armed(), 1);
        assert!(saved.borrow().is_empty());

        timers.fire_all();
        assert_eq!(*saved.borrow(), vec![3]);
        assert!(!s.is_pending());
    }

    #[test]
    fn test_flush_saves_immediately_and_disarms() {
        let (timers, saved, s) = scheduler();
        s.schedule(7);

        assert!(s.flush());
        assert_eq!(*saved.borrow(), vec![7]);
        assert_eq!(timers.armed(), 0);

        timers.fire_all();
        assert!(!s.flush());
        assert_eq!(*saved.borrow(), vec![7]);
    }

    #[test]
    fn test_cancel_drops_pending_payload() {
        let (timers, saved, s) = scheduler();
        s.schedule(1);
        s.cancel();

        timers.fire_all();
        assert!(saved.borrow().is_empty());
        assert!(!s.is_pending());
    }

    #[test]
    fn test_dropped_scheduler_never_saves() {
        let (timers, saved, s) = scheduler();
        s.schedule(1);
        drop(s);

        timers.fire_all();
        assert!(saved.borrow().is_empty());
    }

    #[test]
    fn test_page_draft_to_update() {
        let mut content = PageContent::new();
        content.insert("body".to_string(), json!("<p>Hi</p><script>x()</script>"));
        content.insert("rank".to_string(), json!(3));
        let draft = PageDraft {
            title: " About us ".to_string(),
            content,
            meta_title: String::new(),
            meta_description: "Who we are".to_string(),
            status: PageStatus::Draft,
        };

        let update = draft.to_update("about");
        assert_eq!(update.title.as_deref(), Some("About us"));
        let content = update.content.clone().unwrap_or_default();
        assert_eq!(content["body"], json!("<p>Hi</p>"));
        assert_eq!(content["rank"], json!(3));
        assert_eq!(update.meta_title.as_deref(), Some(""));
        assert_eq!(update.meta_description.as_deref(), Some("Who we are"));
        assert_eq!(update.status, Some(PageStatus::Draft));
    }

    #[test]
    fn test_cleared_draft_fields_are_sent() {
        let draft = PageDraft {
            title: "  ".to_string(),
            meta_title: String::new(),
            meta_description: " ".to_string(),
            ..Default::default()
        };

        let body = serde_json::to_value(draft.to_update("about")).expect("should serialize");
        assert_eq!(body["title"], json!("About"));
        assert_eq!(body["metaTitle"], json!(""));
        assert_eq!(body["metaDescription"], json!(""));
        assert_eq!(body["content"], json!({}));
        assert_eq!(body["status"], json!("published"));
    }

    #[test]
    fn test_save_status_labels() {
        assert_eq!(SaveStatus::Saving.to_string(), "Saving…");
        assert_eq!(SaveStatus::default().as_ref(), "Saved");
    }
}
