//! Cache-related MCP tools.
//!
//! Read-only views of the cache storage; none of them touch the network.

pub mod keys;
pub mod lookup;

pub use keys::{CacheKeysParams, keys_impl};
pub use lookup::{CacheMatchParams, match_impl};
