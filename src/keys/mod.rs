//! Caller credentials
//!
//! Callers authenticate each request by supplying a private key. The key is
//! hashed into a [`CredentialKey`] for registry lookup and turned into a
//! [`Signer`] once, when the client for that credential is first built.

pub mod credential;
pub mod signer;

pub use credential::CredentialKey;
pub use signer::{Signer, PRIVATE_KEY_LEN};
