//! Shared-secret signing for outbound messaging API requests.
//!
//! The messaging API authenticates each request by a `secret` field: the
//! lowercase hex SHA-256 digest of the signed text followed by the shared key.

use sha2::{Digest, Sha256};

/// Hashes message bodies (or user ids for invites) with the shared API key.
#[derive(Clone)]
pub struct MessageHasher {
    secret: String,
}

impl MessageHasher {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Produce the request signature for `text`.
    pub fn encode(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for MessageHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHasher")
            .field("secret", &"<redacted>")
            .finish()
    }
}
