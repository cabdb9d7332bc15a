//! ImageStacker: capture a region of a base image to the clipboard, then
//! paste a replacement patch back into that region as a composite + mask.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;
pub mod settings;

pub use error::{Result, StackerError};
