//! Image operations behind the toolbar actions.

pub mod clipboard;
pub mod export;
pub mod overlay;
