use crate::components::EditModeToolbar;
use crate::edit::provide_edit_session;
use crate::pages::{AboutPage, HomePage, PageEditorPage, PagesIndexPage, SiteHeader};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    let app = AppContext(AppState::new());
    provide_edit_session(&app);
    provide_context(app);

    view! {
        <Router>
            <SiteHeader />
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("") view=HomePage />
                <Route path=path!("about") view=AboutPage />
                <Route path=path!("admin/pages") view=PagesIndexPage />
                <Route path=path!("admin/pages/:page_key") view=PageEditorPage />
            </Routes>
            <EditModeToolbar />
        </Router>
    }
}
