use crate::cache::{CacheInvalidator, QueryKey};
use crate::components::ui::{Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Input, Spinner};
use crate::edit::autosave::{AutosaveScheduler, BrowserTimers, PageDraft, SaveStatus};
use crate::edit::{use_edit_session, EditorConfig};
use crate::models::{field_text, PageContent, PageDocument, PageStatus};
use crate::state::AppContext;
use crate::util::page_title_from_key;
use leptos::logging::{error, log};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_params;
use leptos_router::params::Params;
use serde_json::Value;
use strum::IntoEnumIterator;
use wasm_bindgen::JsCast;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct PageRouteParams {
    pub page_key: Option<String>,
}

fn draft_from_page(page_key: &str, page: Option<PageDocument>) -> PageDraft {
    match page {
        Some(page) => PageDraft {
            title: if page.title.trim().is_empty() {
                page_title_from_key(page_key)
            } else {
                page.title
            },
            content: page.content,
            meta_title: page.meta_title.unwrap_or_default(),
            meta_description: page.meta_description.unwrap_or_default(),
            status: page.status,
        },
        None => PageDraft {
            title: page_title_from_key(page_key),
            ..Default::default()
        },
    }
}

fn event_value(ev: &web_sys::Event) -> Option<String> {
    let target = ev.target()?;
    if let Some(el) = target.dyn_ref::<web_sys::HtmlTextAreaElement>() {
        return Some(el.value());
    }
    if let Some(el) = target.dyn_ref::<web_sys::HtmlSelectElement>() {
        return Some(el.value());
    }
    target.dyn_ref::<web_sys::HtmlInputElement>().map(|el| el.value())
}

/// Form editor for one page at `/admin/pages/:page_key`, saved by autosave.
#[component]
pub fn PageEditorPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let session = use_edit_session();
    let params = use_params::<PageRouteParams>();
    let page_key = move || {
        params
            .get()
            .ok()
            .and_then(|p| p.page_key)
            .unwrap_or_default()
    };

    let title = RwSignal::new(String::new());
    let meta_title = RwSignal::new(String::new());
    let meta_description = RwSignal::new(String::new());
    let status = RwSignal::new(PageStatus::default());
    let content: RwSignal<PageContent> = RwSignal::new(PageContent::new());
    let new_field = RwSignal::new(String::new());

    let loaded_key: RwSignal<Option<String>> = RwSignal::new(None);
    let loading = RwSignal::new(false);
    let load_error: RwSignal<Option<String>> = RwSignal::new(None);
    let save_status = RwSignal::new(SaveStatus::Saved);
    let save_error: RwSignal<Option<String>> = RwSignal::new(None);

    // Last draft known to be on the server.
    let baseline: StoredValue<Option<PageDraft>> = StoredValue::new(None);

    let current_draft = move || PageDraft {
        title: title.get(),
        content: content.get(),
        meta_title: meta_title.get(),
        meta_description: meta_description.get(),
        status: status.get(),
    };

    let api_client = app_state.0.api_client;
    let cache = StoredValue::new(app_state.0.page_cache.clone());

    let save = move |(key, draft): (String, PageDraft)| {
        save_status.set(SaveStatus::Saving);
        let api = api_client.get_untracked();
        spawn_local(async move {
            let update = draft.to_update(&key);
            match api.update_page(&key, &update).await {
                Ok(_) => {
                    log!("[page-editor] saved {key}");
                    baseline.set_value(Some(draft.clone()));
                    save_error.set(None);
                    let unchanged = loaded_key.get_untracked().as_deref() == Some(key.as_str())
                        && current_draft_untracked(title, content, meta_title, meta_description, status) == draft;
                    save_status.set(if unchanged { SaveStatus::Saved } else { SaveStatus::Unsaved });

                    let cache = cache.get_value();
                    cache.invalidate(&QueryKey::Pages);
                    cache.invalidate(&QueryKey::Page(key));
                }
                Err(e) => {
                    error!("[page-editor] autosave {key} failed: {e}");
                    save_error.set(Some(e.to_string()));
                    save_status.set(SaveStatus::Failed);
                }
            }
        });
    };

    let autosave_ms = EditorConfig::default().autosave_ms;
    let scheduler = StoredValue::new_local(AutosaveScheduler::new(BrowserTimers, autosave_ms, save));
    on_cleanup(move || scheduler.with_value(|s| s.cancel()));

    // Load the page into the draft whenever the route changes.
    Effect::new(move |_| {
        let key = page_key();
        scheduler.with_value(|s| s.cancel());
        loaded_key.set(None);
        if key.trim().is_empty() {
            return;
        }

        let api = api_client.get_untracked();
        let cache = cache.get_value();
        loading.set(true);
        load_error.set(None);
        spawn_local(async move {
            let page = match cache.load_page(&api, &key).await {
                Ok(page) => page,
                Err(e) => {
                    load_error.set(Some(e.to_string()));
                    loading.set(false);
                    return;
                }
            };
            let draft = draft_from_page(&key, page);
            baseline.set_value(Some(draft.clone()));
            title.set(draft.title);
            content.set(draft.content);
            meta_title.set(draft.meta_title);
            meta_description.set(draft.meta_description);
            status.set(draft.status);
            save_status.set(SaveStatus::Saved);
            loaded_key.set(Some(key));
            loading.set(false);
        });
    });

    // Any draft change restarts the quiet period.
    Effect::new(move |_| {
        let draft = current_draft();
        let Some(key) = loaded_key.get() else {
            return;
        };
        if baseline.with_value(|b| b.as_ref() == Some(&draft)) {
            scheduler.with_value(|s| s.cancel());
            if save_status.get_untracked() == SaveStatus::Unsaved {
                save_status.set(SaveStatus::Saved);
            }
            return;
        }
        save_status.set(SaveStatus::Unsaved);
        scheduler.with_value(|s| s.schedule((key, draft)));
    });

    let save_now = move |_: web_sys::MouseEvent| {
        let Some(key) = loaded_key.get_untracked() else {
            return;
        };
        let draft = current_draft_untracked(title, content, meta_title, meta_description, status);
        scheduler.with_value(|s| {
            s.schedule((key, draft));
            s.flush();
        });
    };

    let add_field = move |_: web_sys::MouseEvent| {
        let field_key = new_field.get_untracked().trim().to_string();
        if field_key.is_empty() || content.with_untracked(|c| c.contains_key(&field_key)) {
            return;
        }
        content.update(|c| {
            c.insert(field_key, Value::String(String::new()));
        });
        new_field.set(String::new());
    };

    let field_keys = move || content.with(|c| c.keys().cloned().collect::<Vec<_>>());

    view! {
        <main class="mx-auto flex max-w-3xl flex-col gap-6 px-4 py-10">
            <Show
                when=move || session.is_admin()
                fallback=|| view! {
                    <Alert><AlertDescription>"Only administrators can edit pages."</AlertDescription></Alert>
                }
            >
                <div class="flex items-center justify-between gap-4">
                    <h1 class="text-2xl font-semibold">{move || page_title_from_key(&page_key())}</h1>
                    <div class="flex items-center gap-3">
                        <span
                            class="text-xs text-muted-foreground"
                            data-status=move || save_status.get().as_ref().to_string()
                        >
                            {move || save_status.get().to_string()}
                        </span>
                        <Button
                            size=ButtonSize::Sm
                            on:click=save_now
                            attr:disabled=move || loaded_key.get().is_none() || save_status.get() == SaveStatus::Saving
                        >
                            "Save now"
                        </Button>
                    </div>
                </div>

                <Show when=move || loading.get()>
                    <Spinner />
                </Show>
                {move || load_error.get().or_else(|| save_error.get()).map(|e| view! {
                    <Alert class="border-destructive/30">
                        <AlertDescription class="text-destructive">{e}</AlertDescription>
                    </Alert>
                })}

                <section class="flex flex-col gap-4">
                    <label class="flex flex-col gap-1 text-sm">
                        <span class="font-medium">"Title"</span>
                        <Input bind_value=title />
                    </label>
                    <label class="flex flex-col gap-1 text-sm">
                        <span class="font-medium">"Meta title"</span>
                        <Input bind_value=meta_title />
                    </label>
                    <label class="flex flex-col gap-1 text-sm">
                        <span class="font-medium">"Meta description"</span>
                        <textarea
                            class="min-h-20 rounded-md border bg-transparent px-3 py-2 text-sm"
                            prop:value=move || meta_description.get()
                            on:input=move |ev| {
                                if let Some(v) = event_value(&ev) {
                                    meta_description.set(v);
                                }
                            }
                        />
                    </label>
                    <label class="flex flex-col gap-1 text-sm">
                        <span class="font-medium">"Status"</span>
                        <select
                            class="h-9 rounded-md border bg-transparent px-3 text-sm"
                            prop:value=move || status.get().as_ref().to_string()
                            on:change=move |ev| {
                                if let Some(next) = event_value(&ev).and_then(|v| v.parse::<PageStatus>().ok()) {
                                    status.set(next);
                                }
                            }
                        >
                            {PageStatus::iter()
                                .map(|s| view! { <option value=s.as_ref().to_string()>{s.to_string()}</option> })
                                .collect_view()}
                        </select>
                    </label>
                </section>

                <section class="flex flex-col gap-4">
                    <h2 class="text-lg font-semibold">"Content"</h2>
                    <For
                        each=field_keys
                        key=|k| k.clone()
                        children=move |field_key| {
                            let label = field_key.clone();
                            let read_key = field_key.clone();
                            let data_key = field_key.clone();
                            view! {
                                <label class="flex flex-col gap-1 text-sm">
                                    <span class="font-mono text-xs text-muted-foreground">{label}</span>
                                    <textarea
                                        class="min-h-16 rounded-md border bg-transparent px-3 py-2 text-sm"
                                        prop:value=move || content.with(|c| field_text(c, &read_key)).unwrap_or_default()
                                        data-field=data_key
                                        on:input=move |ev| {
                                            if let Some(v) = event_value(&ev) {
                                                let key = field_key.clone();
                                                content.update(|c| {
                                                    c.insert(key, Value::String(v));
                                                });
                                            }
                                        }
                                    />
                                </label>
                            }
                        }
                    />
                    <div class="flex items-center gap-2">
                        <Input placeholder="newField" bind_value=new_field />
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=add_field>
                            "Add field"
                        </Button>
                    </div>
                </section>
            </Show>
        </main>
    }
}

fn current_draft_untracked(
    title: RwSignal<String>,
    content: RwSignal<PageContent>,
    meta_title: RwSignal<String>,
    meta_description: RwSignal<String>,
    status: RwSignal<PageStatus>,
) -> PageDraft {
    PageDraft {
        title: title.get_untracked(),
        content: content.get_untracked(),
        meta_title: meta_title.get_untracked(),
        meta_description: meta_description.get_untracked(),
        status: status.get_untracked(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draft_from_missing_page_uses_key_title() {
        let draft = draft_from_page("faq", None);
        assert_eq!(draft.title, "Faq");
        assert!(draft.content.is_empty());
        assert_eq!(draft.status, PageStatus::Published);
    }

    #[test]
    fn test_draft_from_page_keeps_stored_fields() {
        let page = PageDocument {
            page_key: "about".to_string(),
            title: "About Rentals".to_string(),
            content: json!({"body": "<p>Hi</p>"}).as_object().cloned().unwrap_or_default(),
            meta_title: Some("About".to_string()),
            meta_description: None,
            status: PageStatus::Draft,
            ..Default::default()
        };
        let draft = draft_from_page("about", Some(page));
        assert_eq!(draft.title, "About Rentals");
        assert_eq!(draft.meta_title, "About");
        assert_eq!(draft.meta_description, "");
        assert_eq!(draft.status, PageStatus::Draft);
        assert_eq!(field_text(&draft.content, "body").as_deref(), Some("<p>Hi</p>"));
    }
}
