//! Public entry point
//!
//! `Pqfe` ties one configuration to one key store and one engine.
//! `PqfeEncryptor` is the narrower handle for callers that only ever hold
//! a recipient's public key.

use std::path::Path;

use pqfe_crypto::KeyPair;
use pqfe_keystore::KeyManager;
use zeroize::Zeroizing;

use crate::artifact::EncryptedArtifact;
use crate::config::PqfeConfig;
use crate::engine::HybridEngine;
use crate::files::{self, DataRef, OutputMode};
use crate::{PqfeError, Result};

#[derive(Debug, Clone)]
pub struct Pqfe {
    config: PqfeConfig,
    engine: HybridEngine,
    keys: KeyManager,
}

impl Pqfe {
    /// Validate `config` and open (creating if needed) its key directory
    pub fn new(config: PqfeConfig) -> Result<Self> {
        config.validate()?;
        let keys = KeyManager::open(&config.key_directory, config.kem_variant)?;
        let engine = HybridEngine::new(config.kem_variant, config.cipher);
        tracing::debug!(
            kem = %config.kem_variant,
            cipher = %config.cipher,
            dir = %config.key_directory.display(),
            "configured"
        );
        Ok(Self {
            config,
            engine,
            keys,
        })
    }

    pub fn config(&self) -> &PqfeConfig {
        &self.config
    }

    pub fn engine(&self) -> &HybridEngine {
        &self.engine
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Generate and persist a key pair, replacing any existing one
    pub fn generate_keys(&self) -> Result<KeyPair> {
        Ok(self.keys.generate()?)
    }

    pub fn load_keys(&self) -> Result<Option<KeyPair>> {
        Ok(self.keys.load()?)
    }

    /// Like `load_keys`, but absence is an error
    pub fn require_keys(&self) -> Result<KeyPair> {
        self.load_keys()?.ok_or_else(|| PqfeError::KeyNotFound {
            variant: self.config.kem_variant,
            directory: self.config.key_directory.clone(),
        })
    }

    pub fn delete_keys(&self) -> Result<bool> {
        Ok(self.keys.delete()?)
    }

    pub fn encrypt_data(&self, plaintext: &[u8], public_key: &[u8]) -> Result<EncryptedArtifact> {
        self.engine.encrypt(plaintext, public_key)
    }

    /// Decrypt serialized artifact bytes
    pub fn decrypt_data(&self, data: &[u8], private_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.engine.decrypt_bytes(data, private_key)
    }

    pub fn encrypt_file(&self, path: &Path, public_key: &[u8], output: &OutputMode) -> Result<DataRef> {
        files::encrypt_file(&self.engine, path, public_key, self.config.max_file_size, output)
    }

    /// Decrypt an artifact file or buffer
    ///
    /// With `OutputMode::ToFile`, an in-memory input needs an explicit
    /// output name.
    pub fn decrypt_file(&self, input: &DataRef, private_key: &[u8], output: &OutputMode) -> Result<DataRef> {
        files::decrypt_file(&self.engine, input, private_key, self.config.max_file_size, output)
    }

    /// An encrypt-only handle for `public_key`
    pub fn encryptor(&self, public_key: &[u8]) -> Result<PqfeEncryptor> {
        PqfeEncryptor::new(self.engine, public_key, self.config.max_file_size)
    }
}

/// Encrypts to one recipient. Holds no private key material.
#[derive(Debug, Clone)]
pub struct PqfeEncryptor {
    engine: HybridEngine,
    public_key: Vec<u8>,
    max_file_size: u64,
}

impl PqfeEncryptor {
    pub fn new(engine: HybridEngine, public_key: &[u8], max_file_size: u64) -> Result<Self> {
        let expected = engine.kem_variant().public_key_len();
        if public_key.len() != expected {
            return Err(PqfeError::InvalidKey {
                kind: "public key",
                expected,
                actual: public_key.len(),
            });
        }
        Ok(Self {
            engine,
            public_key: public_key.to_vec(),
            max_file_size,
        })
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn encrypt_data(&self, plaintext: &[u8]) -> Result<EncryptedArtifact> {
        self.engine.encrypt(plaintext, &self.public_key)
    }

    pub fn encrypt_file(&self, path: &Path, output: &OutputMode) -> Result<DataRef> {
        files::encrypt_file(&self.engine, path, &self.public_key, self.max_file_size, output)
    }
}
