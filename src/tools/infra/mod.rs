//! Infrastructure adapters.

pub mod tagging;

pub use tagging::Tagging;
