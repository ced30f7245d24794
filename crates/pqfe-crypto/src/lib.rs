//! PQFE Crypto - KEM and AEAD ports
//!
//! This crate provides:
//! - Kyber (ML-KEM) key encapsulation at NIST levels 1, 3 and 5
//! - AES-256-GCM and ChaCha20-Poly1305 authenticated encryption
//! - HKDF-SHA256 derivation of the symmetric key from the KEM secret
//!
//! Each algorithm sits behind a small trait (`KeyEncapsulation`,
//! `SymmetricCipher`) with one adapter per variant. The closed enums
//! `KemVariant` and `CipherId` hand out the adapters.

pub mod cipher;
pub mod kdf;
pub mod kem;

pub use cipher::{generate_nonce, CipherId, SymmetricCipher, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_key, DERIVED_KEY_LEN};
pub use kem::{Encapsulation, KemVariant, KeyEncapsulation, KeyPair};

/// Errors that can occur in cryptographic operations
///
/// Messages never contain key material. `Decapsulation` and
/// `Authentication` carry no detail at all.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Unsupported {kind}: {name}")]
    Unsupported { kind: &'static str, name: String },

    #[error("Invalid {kind} length: expected {expected}, got {actual}")]
    InvalidKey {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Primitive failure: {0}")]
    Primitive(String),

    #[error("Decapsulation failed")]
    Decapsulation,

    #[error("Authentication failed")]
    Authentication,
}

pub type Result<T> = std::result::Result<T, CryptoError>;

pub(crate) fn check_len(kind: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CryptoError::InvalidKey {
            kind,
            expected,
            actual,
        });
    }
    Ok(())
}
