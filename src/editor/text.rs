use crate::edit::{content_key, use_edit_session};
use crate::sanitize::sanitize;
use icons::{Bold, Italic, Link, Unlink};
use leptos::html;
use leptos::logging::warn;
use leptos::prelude::*;
use serde_json::Value;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

/// What a key press inside an editable field should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeyIntent {
    /// Leave the field (commits through the blur handler).
    Blur,
    Insert,
}

pub(crate) fn key_intent(key: &str, multiline: bool) -> KeyIntent {
    match key {
        "Escape" => KeyIntent::Blur,
        "Enter" if !multiline => KeyIntent::Blur,
        _ => KeyIntent::Insert,
    }
}

/// Sanitized value to commit, or `None` when it matches what is already committed.
pub(crate) fn commit_value(raw_html: &str, committed: &str) -> Option<String> {
    let clean = sanitize(raw_html);
    (clean != committed).then_some(clean)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FormatCommand {
    Bold,
    Italic,
    Link,
    Unlink,
}

fn exec_format(command: FormatCommand) {
    let Some(doc) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
    else {
        return;
    };

    let result = match command {
        FormatCommand::Bold => doc.exec_command("bold"),
        FormatCommand::Italic => doc.exec_command("italic"),
        FormatCommand::Unlink => doc.exec_command("unlink"),
        FormatCommand::Link => {
            let url = web_sys::window()
                .and_then(|w| w.prompt_with_message("Link URL").ok().flatten())
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty());
            match url {
                Some(url) => doc.exec_command_with_show_ui_and_value("createLink", false, &url),
                None => return,
            }
        }
    };

    if let Err(e) = result {
        warn!("[editor] {command:?} failed: {e:?}");
    }
}

#[component]
fn FormatButton(command: FormatCommand, children: Children) -> impl IntoView {
    view! {
        <button
            type="button"
            class="inline-flex size-7 items-center justify-center rounded hover:bg-accent [&_svg]:size-3.5"
            title=format!("{command:?}")
            // mousedown keeps the selection inside the field
            on:mousedown=move |ev: web_sys::MouseEvent| {
                ev.prevent_default();
                exec_format(command);
            }
        >
            {children()}
        </button>
    }
}

/// Rich-text field bound to `<page_key>.<field_key>`.
///
/// Renders sanitized HTML. While the session is in edit mode the field is
/// contenteditable; leaving it commits the sanitized markup to the session
/// ledger when it differs from the last committed value.
#[component]
pub fn EditableText(
    #[prop(into)] page_key: String,
    #[prop(into)] field_key: String,
    #[prop(into)] value: Signal<String>,
    #[prop(optional)] multiline: bool,
    #[prop(into, optional)] class: String,
    #[prop(optional)] on_change: Option<Callback<String>>,
) -> impl IntoView {
    let session = use_edit_session();
    let key = StoredValue::new(content_key(&page_key, &field_key));

    let committed = RwSignal::new(sanitize(&value.get_untracked()));
    // Follow the source value, and fall back to it when edits are discarded.
    Effect::new(move |_| {
        session.discards();
        let next = sanitize(&value.get());
        if next != committed.get_untracked() {
            committed.set(next);
        }
    });

    let focused = RwSignal::new(false);
    let node_ref = NodeRef::<html::Div>::new();

    let on_blur = move |_: web_sys::FocusEvent| {
        focused.set(false);
        let Some(el) = node_ref.get_untracked() else {
            return;
        };
        let Some(clean) = commit_value(&el.inner_html(), &committed.get_untracked()) else {
            return;
        };

        committed.set(clean.clone());
        session.register_change(key.get_value(), Value::String(clean.clone()));
        if let Some(cb) = on_change {
            cb.run(clean);
        }
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        if key_intent(&ev.key(), multiline) == KeyIntent::Blur {
            ev.prevent_default();
            if let Some(el) = node_ref.get_untracked() {
                let _ = el.blur();
            }
        }
    };

    let view_class = StoredValue::new(class);
    let edit_class = move || {
        tw_merge!(
            "relative rounded-sm outline-none ring-1 ring-dashed ring-primary/40 hover:ring-primary/70",
            if focused.get() { "ring-2 ring-primary bg-background/60" } else { "" },
            view_class.get_value()
        )
    };

    view! {
        <Show
            when=move || session.is_edit_mode()
            fallback=move || view! {
                <div class=view_class.get_value() inner_html=move || committed.get() />
            }
        >
            <div class="relative" data-name="EditableText">
                <Show when=move || focused.get()>
                    <div class="absolute -top-9 left-0 z-40 flex gap-0.5 rounded-md border bg-popover p-0.5 text-popover-foreground shadow-sm">
                        <FormatButton command=FormatCommand::Bold><Bold /></FormatButton>
                        <FormatButton command=FormatCommand::Italic><Italic /></FormatButton>
                        <FormatButton command=FormatCommand::Link><Link /></FormatButton>
                        <FormatButton command=FormatCommand::Unlink><Unlink /></FormatButton>
                    </div>
                </Show>
                <div
                    node_ref=node_ref
                    class=edit_class
                    contenteditable="true"
                    data-field=key.get_value()
                    inner_html=move || committed.get()
                    on:focus=move |_: web_sys::FocusEvent| focused.set(true)
                    on:blur=on_blur
                    on:keydown=on_keydown
                />
            </div>
        </Show>
    }
}
