//! Request export functionality
//!
//! Persists captured requests for offline analysis. Currently supports a
//! single JSON document format.

pub mod json;

pub use json::{RequestExporter, RequestRecord};
