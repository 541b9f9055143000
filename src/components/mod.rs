pub mod edit_toolbar;
pub mod ui;

pub use edit_toolbar::EditModeToolbar;
