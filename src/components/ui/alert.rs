use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Alert, div, "relative w-full rounded-lg border bg-background px-4 py-3 text-sm shadow-sm"}
    clx! {AlertDescription, p, "text-sm leading-relaxed"}
}

pub use components::*;
