//! Registry key for caller credentials.
//!
//! The raw private key is hashed before it is used as a map key, so the
//! registry never holds the secret string itself.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a caller-supplied private key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialKey([u8; 32]);

impl CredentialKey {
    /// Hash a credential into its registry key
    pub fn from_secret(secret: &str) -> Self {
        Self(Sha256::digest(secret.as_bytes()).into())
    }
}

impl fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialKey(<redacted>)")
    }
}
