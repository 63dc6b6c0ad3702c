//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response descriptors and URL resolution
//! - Cache storage with SQLite backend
//! - The offline-caching worker, its events and its host
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod worker;

pub use cache::{CacheDb, NamedCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Method, Request, Response, ResponseSource, Url};
pub use worker::{CACHE_NAME, CacheStorage, CacheStore, Network, OfflineCacheWorker, WorkerHost, WorkerState};
