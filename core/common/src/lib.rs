//! Common utilities and types shared across Sluice crates.
//!
//! This module provides the classified storage error domain and the small
//! value types (object keys, storage classes) that cross crate boundaries.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ObjectKey, StorageClass};
