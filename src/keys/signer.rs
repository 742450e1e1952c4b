//! Signer derivation from caller-supplied private keys.
//!
//! # Key format
//!
//! - 32 bytes, hex encoded (64 characters)
//! - Optional `0x` prefix, surrounding whitespace ignored
//!
//! The key is used as an Ed25519 seed. The signer's public `address` is the
//! hex-encoded verifying key and is the only identity that may appear in logs.

use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use std::fmt;
use zeroize::Zeroizing;

use crate::types::{BridgeError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Ed25519 private key length (32 bytes)
pub const PRIVATE_KEY_LEN: usize = 32;

// =============================================================================
// Signer
// =============================================================================

/// Identity attached to a fabric client; authorizes its remote calls.
///
/// Key material is zeroized when the signer is dropped.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    address: String,
}

impl Signer {
    /// Derive a signer from a hex private key.
    ///
    /// Error messages never echo the supplied key.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.is_empty() {
            return Err(BridgeError::ClientConstruction(
                "private key is empty".into(),
            ));
        }

        let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        hex::decode_to_slice(hex_part, &mut seed[..]).map_err(|_| {
            BridgeError::ClientConstruction(format!(
                "private key must be {} bytes of hex",
                PRIVATE_KEY_LEN
            ))
        })?;

        let key = SigningKey::from_bytes(&seed);
        let address = hex::encode(key.verifying_key().to_bytes());

        Ok(Self { key, address })
    }

    /// Hex-encoded public key
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Ed25519 verifying key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Sign a payload
    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.key.sign(payload)
    }

    /// Sign a payload, hex-encoding the 64-byte signature
    pub fn sign_hex(&self, payload: &[u8]) -> String {
        hex::encode(self.sign(payload).to_bytes())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    const KEY_A: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const KEY_B: &str = "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb";

    #[test]
    fn test_derivation_is_deterministic() {
        let a1 = Signer::from_private_key(KEY_A).unwrap();
        let a2 = Signer::from_private_key(KEY_A).unwrap();
        let b = Signer::from_private_key(KEY_B).unwrap();

        assert_eq!(a1.address(), a2.address());
        assert_ne!(a1.address(), b.address());
        assert_eq!(a1.address().len(), 64);
    }

    #[test]
    fn test_known_public_key() {
        // RFC 8032 test vector 1
        let signer = Signer::from_private_key(KEY_A).unwrap();
        assert_eq!(
            signer.address(),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn test_accepts_prefix_and_whitespace() {
        let plain = Signer::from_private_key(KEY_A).unwrap();
        let prefixed = Signer::from_private_key(&format!("  0x{KEY_A}\n")).unwrap();
        assert_eq!(plain.address(), prefixed.address());
    }

    #[test]
    fn test_rejects_malformed_keys() {
        let too_long = format!("{KEY_A}00");
        let cases: [&str; 5] = ["", "0x", "not-hex", &KEY_A[..62], &too_long];
        for bad in cases {
            let err = Signer::from_private_key(bad).unwrap_err();
            assert!(matches!(err, BridgeError::ClientConstruction(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_error_does_not_leak_key() {
        let almost = &KEY_A[..63];
        let err = Signer::from_private_key(almost).unwrap_err();
        assert!(!err.to_string().contains(almost));
    }

    #[test]
    fn test_signature_verifies() {
        let signer = Signer::from_private_key(KEY_B).unwrap();
        let payload = b"{\"type\":\"FrameRequest\"}";
        let signature = signer.sign(payload);

        assert!(signer.verifying_key().verify(payload, &signature).is_ok());
        assert_eq!(signer.sign_hex(payload).len(), 128);
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = Signer::from_private_key(KEY_A).unwrap();
        let rendered = format!("{signer:?}");
        assert!(rendered.contains(signer.address()));
        assert!(!rendered.contains(KEY_A));
    }
}
