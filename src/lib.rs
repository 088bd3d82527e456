//! A filterable tree view over caller-supplied records.
//!
//! The [`tree::Tree`] controller filters a [`tree::Node`] hierarchy with
//! ancestor preservation, renders it into a [`dom::Document`] in bounded
//! chunks, and loads further chunks as "load more" rows approach the
//! viewport.

pub mod config;
pub mod dom;
pub mod error;
pub mod tree;

pub use error::{AppError, Result};
