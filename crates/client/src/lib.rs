//! Client code for swcache.
//!
//! This crate provides the HTTP network capability the worker host hands to
//! the offline-caching worker.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
