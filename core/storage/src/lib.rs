//! Object store abstraction for Sluice.
//!
//! This module provides a trait-based interface for the buckets the sync
//! engine writes to (S3, a local directory, memory) and a provider registry
//! for resolving a store from configuration.
//!
//! # Design Principles
//! - Minimal capability: point lookup and whole-object write only
//! - Async operations: All I/O operations are async
//! - Unified error semantics: every backend classifies its failures as
//!   transient or permanent through [`sluice_common::Error`]

pub mod config;
pub mod local;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod s3;

pub use config::StoreConfig;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use provider::{ObjectMetadata, ObjectStore};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
pub use s3::S3Store;
