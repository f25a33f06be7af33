//! Core types for rewind.

mod document;
mod snapshot;

pub use document::*;
pub use snapshot::*;
