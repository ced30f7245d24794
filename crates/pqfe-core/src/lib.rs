//! PQFE Core - Hybrid post-quantum file encryption
//!
//! A Kyber encapsulation per file, HKDF-SHA256 to a 32-byte key, one AEAD
//! pass over the content. The result is a self-describing artifact that
//! names its own KEM level and cipher.
//!
//! `Pqfe` is the entry point: configure it once, then generate/load keys
//! and encrypt/decrypt files or buffers.

mod artifact;
mod config;
mod engine;
mod facade;
mod files;

pub use artifact::{EncryptedArtifact, HEADER_LEN};
pub use config::{default_key_directory, PqfeConfig, DEFAULT_MAX_FILE_SIZE, ENCRYPTED_SUFFIX};
pub use engine::HybridEngine;
pub use facade::{Pqfe, PqfeEncryptor};
pub use files::{DataRef, OutputMode};

pub use pqfe_crypto::{CipherId, KemVariant, KeyPair};

use std::path::PathBuf;

use pqfe_crypto::CryptoError;
use pqfe_keystore::KeyStoreError;

/// Every failure the public API can report
///
/// `Decapsulation` and `Authentication` deliberately carry no detail: they
/// are the only signal for a wrong key or a tampered artifact.
#[derive(Debug, thiserror::Error)]
pub enum PqfeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[source] KeyStoreError),

    #[error("No {variant} key pair stored in {}", .directory.display())]
    KeyNotFound {
        variant: KemVariant,
        directory: PathBuf,
    },

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

    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("File access failed for {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is {size} bytes, over the {limit} byte limit", .path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
}

impl From<CryptoError> for PqfeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Unsupported { kind, name } => {
                PqfeError::Configuration(format!("unsupported {kind}: {name}"))
            }
            CryptoError::InvalidKey {
                kind,
                expected,
                actual,
            } => PqfeError::InvalidKey {
                kind,
                expected,
                actual,
            },
            CryptoError::Primitive(msg) => PqfeError::Primitive(msg),
            CryptoError::Decapsulation => PqfeError::Decapsulation,
            CryptoError::Authentication => PqfeError::Authentication,
        }
    }
}

impl From<KeyStoreError> for PqfeError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::Crypto(inner) => inner.into(),
            other => PqfeError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PqfeError>;
