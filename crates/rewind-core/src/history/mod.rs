//! History store binding.

mod registry;

pub use registry::HistoryRegistry;
