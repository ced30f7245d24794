//! PQFE Keystore - Key pairs on disk
//!
//! One directory, two files per KEM variant. Private keys are written
//! owner-only and every file lands through a temp-file-and-rename, so a
//! crash never leaves a half-written key behind.

pub mod atomic;
mod store;

pub use atomic::{write_atomic, PRIVATE_FILE_MODE, PUBLIC_FILE_MODE};
pub use store::KeyManager;

use std::path::PathBuf;

use pqfe_crypto::{CryptoError, KemVariant};

/// Errors from key storage operations
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("Key storage I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Incomplete key pair: {} is missing", .missing.display())]
    Incomplete { missing: PathBuf },

    #[error("Key pair is {found}, store holds {expected}")]
    VariantMismatch {
        expected: KemVariant,
        found: KemVariant,
    },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

pub type Result<T> = std::result::Result<T, KeyStoreError>;
