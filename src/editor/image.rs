use super::compress::{blob_to_data_url, compress_or_original, CompressOptions};
use crate::components::ui::{
    Button, ButtonVariant, Dialog, DialogBody, DialogDescription, DialogFooter, DialogHeader,
    DialogTitle, Input, Spinner,
};
use crate::edit::{content_key, use_edit_session};
use icons::ImagePlus;
use leptos::logging::error;
use leptos::prelude::*;
use leptos::task::spawn_local;
use serde_json::Value;
use wasm_bindgen::JsCast;

/// Trimmed URL to apply, `None` for blank input.
pub(crate) fn normalize_image_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    (!url.is_empty()).then(|| url.to_string())
}

/// Image field bound to `<page_key>.<field_key>`.
///
/// In edit mode a click opens a dialog that either uploads a file
/// (compressed and stored inline as a data URL) or takes an image URL.
#[component]
pub fn EditableImage(
    #[prop(into)] page_key: String,
    #[prop(into)] field_key: String,
    #[prop(into)] value: Signal<String>,
    #[prop(into, optional)] alt: String,
    #[prop(into, optional)] class: String,
    #[prop(optional)] on_change: Option<Callback<String>>,
) -> impl IntoView {
    let session = use_edit_session();
    let key = StoredValue::new(content_key(&page_key, &field_key));

    let src = RwSignal::new(value.get_untracked());
    let broken = RwSignal::new(false);
    Effect::new(move |_| {
        session.discards();
        let next = value.get();
        if next != src.get_untracked() {
            src.set(next);
        }
    });
    // A new source gets a fresh chance to load.
    Effect::new(move |_| {
        src.track();
        broken.set(false);
    });

    let open = RwSignal::new(false);
    let url_input = RwSignal::new(String::new());
    let uploading = RwSignal::new(false);

    let reset = move || {
        url_input.set(String::new());
        uploading.set(false);
    };

    let commit = move |url: String| {
        if url == src.get_untracked() {
            return;
        }
        src.set(url.clone());
        session.register_change(key.get_value(), Value::String(url.clone()));
        if let Some(cb) = on_change {
            cb.run(url);
        }
    };

    let on_file = move |ev: web_sys::Event| {
        let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            return;
        };
        input.set_value("");

        uploading.set(true);
        spawn_local(async move {
            let result = compress_or_original(&file, CompressOptions::default()).await;
            match blob_to_data_url(&result.file).await {
                Ok(data_url) => {
                    commit(data_url);
                    open.set(false);
                    reset();
                }
                Err(e) => {
                    error!("[image] could not read {}: {e}", file.name());
                    uploading.set(false);
                }
            }
        });
    };

    let apply_url = move |_: web_sys::MouseEvent| {
        if let Some(url) = normalize_image_url(&url_input.get_untracked()) {
            commit(url);
            open.set(false);
            reset();
        }
    };

    let alt = StoredValue::new(alt);
    let class = StoredValue::new(class);
    let image = move || {
        view! {
            <img
                src=move || src.get()
                alt=alt.get_value()
                class=class.get_value()
                style:display=move || if broken.get() { "none" } else { "" }
                on:error=move |_| broken.set(true)
            />
        }
    };

    view! {
        <Show when=move || session.is_edit_mode() fallback=image>
            <button
                type="button"
                data-name="EditableImage"
                data-field=key.get_value()
                class="group relative block w-full cursor-pointer rounded-sm ring-1 ring-dashed ring-primary/40 hover:ring-primary/70"
                on:click=move |_| open.set(true)
            >
                {image()}
                <span class="absolute inset-0 hidden items-center justify-center gap-2 bg-black/40 text-sm font-medium text-white group-hover:flex">
                    <ImagePlus class="size-4" />
                    "Change image"
                </span>
            </button>
        </Show>

        <Dialog open=open on_close=Callback::new(move |_| reset())>
            <DialogBody>
                <DialogHeader>
                    <DialogTitle>"Change image"</DialogTitle>
                    <DialogDescription>"Upload a file or paste an image URL."</DialogDescription>
                </DialogHeader>

                <label class="flex flex-col gap-2 text-sm">
                    <span class="font-medium">"Upload"</span>
                    <input
                        type="file"
                        accept="image/*"
                        class="text-sm"
                        disabled=move || uploading.get()
                        on:change=on_file
                    />
                </label>
                <Show when=move || uploading.get()>
                    <div class="flex items-center gap-2 text-xs text-muted-foreground">
                        <Spinner />
                        "Compressing…"
                    </div>
                </Show>

                <div class="flex flex-col gap-2 text-sm">
                    <span class="font-medium">"Image URL"</span>
                    <Input r#type="url" placeholder="https://…" bind_value=url_input />
                </div>

                <DialogFooter>
                    <Button variant=ButtonVariant::Outline on:click=move |_| {
                        open.set(false);
                        reset();
                    }>
                        "Cancel"
                    </Button>
                    <Button on:click=apply_url attr:disabled=move || uploading.get()>
                        "Use URL"
                    </Button>
                </DialogFooter>
            </DialogBody>
        </Dialog>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_image_url() {
        assert_eq!(
            normalize_image_url("  https://cdn.example.com/hero.jpg \n"),
            Some("https://cdn.example.com/hero.jpg".to_string())
        );
        assert_eq!(normalize_image_url("   "), None);
        assert_eq!(normalize_image_url(""), None);
        assert_eq!(
            normalize_image_url("/images/hero.png"),
            Some("/images/hero.png".to_string())
        );
    }
}
