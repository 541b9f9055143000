use crate::components::ui::{Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Spinner};
use crate::edit::{use_edit_session, EditorConfig};
use icons::{Pencil, Save, X};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::{set_timeout_with_handle, TimeoutHandle};
use std::time::Duration;

/// Floating edit-mode controls, rendered for admins only.
#[component]
pub fn EditModeToolbar() -> impl IntoView {
    let session = use_edit_session();
    let notice_ms = EditorConfig::default().notice_ms;

    // Each new notice replaces the previous one's dismiss timer.
    let dismiss: StoredValue<Option<TimeoutHandle>> = StoredValue::new(None);
    Effect::new(move |_| {
        if session.notice.with(Option::is_none) {
            return;
        }
        if let Some(handle) = dismiss.get_value() {
            handle.clear();
        }
        let handle = set_timeout_with_handle(
            move || session.notice.set(None),
            Duration::from_millis(u64::from(notice_ms)),
        )
        .ok();
        dismiss.set_value(handle);
    });
    on_cleanup(move || {
        if let Some(handle) = dismiss.get_value() {
            handle.clear();
        }
    });

    let on_save = move |_: web_sys::MouseEvent| {
        spawn_local(async move {
            // Outcome is reported through the session notice.
            let _ = session.save_changes().await;
        });
    };

    let pending_label = move || match session.pending_count() {
        0 => "No changes".to_string(),
        1 => "1 unsaved change".to_string(),
        n => format!("{n} unsaved changes"),
    };

    view! {
        <Show when=move || session.is_admin()>
            <div
                data-name="EditModeToolbar"
                data-mode=move || session.mode().to_string()
                class="fixed bottom-4 right-4 z-50 flex flex-col items-end gap-2"
            >
                {move || {
                    session
                        .notice
                        .get()
                        .map(|notice| {
                            let class = if notice.is_error() {
                                "border-destructive/30 bg-background shadow-md"
                            } else {
                                "bg-background shadow-md"
                            };
                            let text_class = if notice.is_error() { "text-destructive" } else { "" };
                            view! {
                                <Alert class=class attr:role="status">
                                    <AlertDescription class=text_class>{notice.message()}</AlertDescription>
                                </Alert>
                            }
                        })
                }}

                <div class="flex items-center gap-2 rounded-lg border bg-background p-2 shadow-lg">
                    <Show
                        when=move || session.is_edit_mode()
                        fallback=move || view! {
                            <Button
                                size=ButtonSize::Sm
                                on:click=move |_| session.toggle()
                                attr:disabled=move || session.is_saving()
                            >
                                <Pencil />
                                "Edit page"
                            </Button>
                        }
                    >
                        <span class="px-1 text-xs text-muted-foreground">{pending_label}</span>
                        <Button
                            size=ButtonSize::Sm
                            on:click=on_save
                            attr:disabled=move || session.is_saving() || session.pending_count() == 0
                        >
                            <Show when=move || session.is_saving() fallback=|| view! { <Save /> }>
                                <Spinner />
                            </Show>
                            {move || if session.is_saving() { "Saving..." } else { "Save Changes" }}
                        </Button>
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            on:click=move |_| session.clear_changes()
                            attr:disabled=move || session.is_saving() || session.pending_count() == 0
                        >
                            "Discard"
                        </Button>
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Ghost
                            on:click=move |_| session.toggle()
                            attr:disabled=move || session.is_saving()
                        >
                            <X />
                            "Exit"
                        </Button>
                    </Show>
                </div>
            </div>
        </Show>
    }
}
