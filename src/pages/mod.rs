mod editor;

pub use editor::PageEditorPage;

use crate::cache::{use_page_content, PageQuery};
use crate::components::ui::{Alert, AlertDescription, Spinner};
use crate::edit::use_edit_session;
use crate::editor::{EditableImage, EditableText};
use crate::state::AppContext;
use crate::util::page_title_from_key;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::A;

const HOME: &str = "homepage";
const ABOUT: &str = "about";

const DEFAULT_HERO_IMAGE: &str = "/images/hero.jpg";

#[component]
pub fn SiteHeader() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let session = use_edit_session();
    let api_client = app_state.0.api_client;
    let current_user = app_state.0.current_user;
    let is_authenticated = move || api_client.with(|c| c.is_authenticated());

    let sign_out = move |_: web_sys::MouseEvent| {
        api_client.update(|c| c.logout());
        current_user.set(None);
    };

    view! {
        <header class="border-b">
            <nav class="mx-auto flex max-w-6xl items-center gap-6 px-4 py-3 text-sm">
                <A href="/" attr:class="font-semibold">"Rentals"</A>
                <A href="/about" attr:class="text-muted-foreground hover:text-foreground">"About"</A>
                <Show when=move || session.is_admin()>
                    <A href="/admin/pages" attr:class="ml-auto text-muted-foreground hover:text-foreground">
                        "Pages"
                    </A>
                </Show>
                <Show when=is_authenticated>
                    <button
                        type="button"
                        class="text-muted-foreground hover:text-foreground"
                        on:click=sign_out
                    >
                        "Sign out"
                    </button>
                </Show>
            </nav>
        </header>
    }
}

/// Load/error line for a page read through the cache.
#[component]
fn QueryStatus(query: PageQuery) -> impl IntoView {
    view! {
        <Show when=move || query.loading.get() && query.page.with(Option::is_none)>
            <Spinner />
        </Show>
        {move || query.error.get().map(|e| view! {
            <Alert class="border-destructive/30">
                <AlertDescription class="text-destructive">{e}</AlertDescription>
            </Alert>
        })}
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    let query = use_page_content(HOME);
    let local = move |field: &'static str| Callback::new(move |v: String| query.apply(field, v));

    view! {
        <main class="mx-auto flex max-w-6xl flex-col gap-12 px-4 py-10">
            <QueryStatus query=query />
            <section class="grid items-center gap-8 md:grid-cols-2">
                <div class="flex flex-col gap-4">
                    <EditableText
                        page_key=HOME
                        field_key="heroTitle"
                        value=query.field("heroTitle", "Find your next rental home")
                        class="text-4xl font-bold tracking-tight"
                        on_change=local("heroTitle")
                    />
                    <EditableText
                        page_key=HOME
                        field_key="heroSubtitle"
                        value=query.field(
                            "heroSubtitle",
                            "Apartments, houses and rooms from verified landlords.",
                        )
                        multiline=true
                        class="text-lg text-muted-foreground"
                        on_change=local("heroSubtitle")
                    />
                </div>
                <EditableImage
                    page_key=HOME
                    field_key="heroImage"
                    value=query.field("heroImage", DEFAULT_HERO_IMAGE)
                    alt="Rental homes"
                    class="aspect-video w-full rounded-xl object-cover"
                    on_change=local("heroImage")
                />
            </section>

            <section class="grid gap-4 sm:grid-cols-3">
                <div class="rounded-lg border p-6 text-center">
                    <EditableText
                        page_key=HOME
                        field_key="stat1"
                        value=query.field("stat1", "10,000+ Listings")
                        class="text-2xl font-semibold"
                        on_change=local("stat1")
                    />
                </div>
                <div class="rounded-lg border p-6 text-center">
                    <EditableText
                        page_key=HOME
                        field_key="stat2"
                        value=query.field("stat2", "500+ Cities")
                        class="text-2xl font-semibold"
                        on_change=local("stat2")
                    />
                </div>
                <div class="rounded-lg border p-6 text-center">
                    <EditableText
                        page_key=HOME
                        field_key="stat3"
                        value=query.field("stat3", "24/7 Support")
                        class="text-2xl font-semibold"
                        on_change=local("stat3")
                    />
                </div>
            </section>
        </main>
    }
}

#[component]
pub fn AboutPage() -> impl IntoView {
    let query = use_page_content(ABOUT);
    let local = move |field: &'static str| Callback::new(move |v: String| query.apply(field, v));

    view! {
        <main class="mx-auto flex max-w-3xl flex-col gap-6 px-4 py-10">
            <QueryStatus query=query />
            <EditableText
                page_key=ABOUT
                field_key="title"
                value=query.field("title", "About us")
                class="text-3xl font-bold"
                on_change=local("title")
            />
            <EditableText
                page_key=ABOUT
                field_key="body"
                value=query.field("body", "<p>We connect renters with trusted landlords.</p>")
                multiline=true
                class="prose max-w-none"
                on_change=local("body")
            />
        </main>
    }
}

/// Admin list of every stored page.
#[component]
pub fn PagesIndexPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let session = use_edit_session();

    let pages = RwSignal::new(app_state.0.page_cache.get_list().unwrap_or_default());
    let loading = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    let cache = app_state.0.page_cache.clone();
    Effect::new(move |_| {
        if !session.is_admin() {
            return;
        }
        cache.track(&crate::cache::QueryKey::Pages);
        let api = app_state.0.api_client.get_untracked();
        let cache = cache.clone();

        loading.set(true);
        spawn_local(async move {
            match cache.load_pages(&api).await {
                Ok(list) => {
                    pages.set(list);
                    error.set(None);
                }
                Err(e) => error.set(Some(e.to_string())),
            }
            loading.set(false);
        });
    });

    view! {
        <main class="mx-auto flex max-w-3xl flex-col gap-4 px-4 py-10">
            <h1 class="text-2xl font-semibold">"Pages"</h1>
            <Show
                when=move || session.is_admin()
                fallback=|| view! {
                    <Alert><AlertDescription>"Only administrators can manage pages."</AlertDescription></Alert>
                }
            >
                <Show when=move || loading.get()>
                    <Spinner />
                </Show>
                {move || error.get().map(|e| view! {
                    <Alert class="border-destructive/30">
                        <AlertDescription class="text-destructive">{e}</AlertDescription>
                    </Alert>
                })}
                <ul class="divide-y rounded-lg border">
                    <For
                        each=move || pages.get()
                        key=|p| p.page_key.clone()
                        children=|p| {
                            let href = format!("/admin/pages/{}", urlencoding::encode(&p.page_key));
                            let title = if p.title.trim().is_empty() {
                                page_title_from_key(&p.page_key)
                            } else {
                                p.title.clone()
                            };
                            view! {
                                <li class="flex items-center justify-between px-4 py-3 text-sm">
                                    <A href=href attr:class="font-medium hover:underline">{title}</A>
                                    <span class="text-xs text-muted-foreground">{p.status.to_string()}</span>
                                </li>
                            }
                        }
                    />
                </ul>
            </Show>
        </main>
    }
}
