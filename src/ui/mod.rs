//! Text presentation of a rendered drawer.
//!
//! The drawer itself renders into a [`View`](crate::view::View); this module
//! turns a [`ViewTree`](crate::view::ViewTree) into text for terminals and
//! test output.
//!
//! # Modules
//!
//! - [`outline`]: Indented node outline with optional ANSI colour

pub mod outline;

pub use outline::{outline, OutlineOptions};
