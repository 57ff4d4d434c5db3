//! Content addressing.
//!
//! Every text unit and every uploaded file is identified by the SHA-256 of its
//! bytes. The full 64-character digest keys the ingestion ledger; vector-store
//! points use the first [`POINT_ID_LEN`] characters to keep identifiers short.
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex prefix used as a vector-store point identifier.
pub const POINT_ID_LEN: usize = 32;

/// Lowercase hex SHA-256 digest of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    pub fn as_str(&self) -> &str { &self.0 }

    /// Truncated form used for point identifiers.
    pub fn point_id(&self) -> &str { &self.0[..POINT_ID_LEN] }

    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for ContentKey {
    fn as_ref(&self) -> &str { &self.0 }
}

pub fn digest(bytes: &[u8]) -> ContentKey {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentKey(format!("{:x}", hasher.finalize()))
}

pub fn digest_text(text: &str) -> ContentKey { digest(text.as_bytes()) }

/// Point identifier for a text unit.
pub fn point_id(text: &str) -> String { digest_text(text).point_id().to_string() }
