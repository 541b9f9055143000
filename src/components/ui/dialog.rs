use icons::X;
use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::*;

mod components {
    use super::*;
    clx! {DialogBody, div, "flex flex-col gap-4"}
    clx! {DialogHeader, div, "flex flex-col gap-2 text-center sm:text-left"}
    clx! {DialogTitle, h3, "text-lg leading-none font-semibold"}
    clx! {DialogDescription, p, "text-muted-foreground text-sm"}
    clx! {DialogFooter, footer, "flex flex-col-reverse gap-2 sm:flex-row sm:justify-end"}
}

pub use components::*;

/// Modal dialog driven by an `open` signal.
///
/// The backdrop and the close button set `open` to false and run `on_close`.
#[component]
pub fn Dialog(
    open: RwSignal<bool>,
    children: ChildrenFn,
    #[prop(optional, into)] class: String,
    #[prop(default = true)] close_on_backdrop_click: bool,
    #[prop(optional)] on_close: Option<Callback<()>>,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "relative bg-background border rounded-2xl shadow-lg p-6 w-full max-w-[calc(100%-2rem)] sm:max-w-md max-h-[85vh] overflow-y-auto fixed top-[50%] left-[50%] translate-x-[-50%] translate-y-[-50%] z-100",
        class
    );
    let merged_class = StoredValue::new(merged_class);
    let children = StoredValue::new(children);

    let close = move || {
        open.set(false);
        if let Some(cb) = on_close {
            cb.run(());
        }
    };

    view! {
        <Show when=move || open.get()>
            <div
                data-name="DialogBackdrop"
                class="fixed inset-0 z-60 bg-black/50"
                on:click=move |_| {
                    if close_on_backdrop_click {
                        close();
                    }
                }
            />
            <div
                data-name="DialogContent"
                role="dialog"
                aria-modal="true"
                class=merged_class.get_value()
            >
                <button
                    type="button"
                    class="absolute top-4 right-4 p-1 rounded-sm opacity-70 hover:opacity-100 focus:ring-2 focus:ring-ring focus:outline-none [&_svg:not([class*='size-'])]:size-4"
                    aria-label="Close"
                    on:click=move |_| close()
                >
                    <X />
                </button>
                {children.with_value(|c| c())}
            </div>
        </Show>
    }
}
