//! Field editors that write into the edit session's ledger.

pub(crate) mod compress;
pub(crate) mod image;
pub(crate) mod text;

pub use image::EditableImage;
pub use text::EditableText;
