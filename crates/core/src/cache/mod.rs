//! SQLite-backed cache storage: named stores of request/response entries.
//!
//! This module provides the persistent cache the worker pre-populates on
//! install and reads on fetch, using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Any number of named stores, matched in creation order
//! - At most one entry per request key within a store
//! - All-or-nothing `add_all` batches
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod storage;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::NamedCache;
