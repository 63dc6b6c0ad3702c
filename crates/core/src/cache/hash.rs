//! Request key generation.

use sha2::{Digest, Sha256};

use crate::http::{Method, Url};

/// Compute the key a request is stored and matched under.
pub fn compute_request_key(method: Method, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
