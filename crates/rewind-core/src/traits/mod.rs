//! Core traits for rewind storage backends.

mod document_store;
mod history_store;

pub use document_store::*;
pub use history_store::*;
