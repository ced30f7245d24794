//! Hybrid encryption engine
//!
//! One KEM encapsulation per payload, then a single AEAD pass. The
//! engine holds only its (copyable) configuration, so one instance can
//! serve any number of threads.

use pqfe_crypto::{derive_key, generate_nonce, CipherId, Encapsulation, KemVariant};
use zeroize::Zeroizing;

use crate::artifact::EncryptedArtifact;
use crate::{PqfeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridEngine {
    kem: KemVariant,
    cipher: CipherId,
}

impl HybridEngine {
    pub fn new(kem: KemVariant, cipher: CipherId) -> Self {
        Self { kem, cipher }
    }

    pub fn kem_variant(&self) -> KemVariant {
        self.kem
    }

    pub fn cipher(&self) -> CipherId {
        self.cipher
    }

    /// Encrypt `plaintext` to the holder of `public_key`
    pub fn encrypt(&self, plaintext: &[u8], public_key: &[u8]) -> Result<EncryptedArtifact> {
        let expected = self.kem.public_key_len();
        if public_key.len() != expected {
            return Err(PqfeError::Configuration(format!(
                "public key is {} bytes but {} expects {expected}",
                public_key.len(),
                self.kem
            )));
        }

        let Encapsulation {
            ciphertext: kem_ciphertext,
            shared_secret,
        } = self.kem.port().encapsulate(public_key)?;
        let nonce = generate_nonce(self.cipher.nonce_len())?;

        let (body, tag) = {
            let key = derive_key(&shared_secret)?;
            self.cipher.cipher().seal(&key[..], &nonce, plaintext, &[])?
        };
        drop(shared_secret);

        tracing::debug!(
            kem = %self.kem,
            cipher = %self.cipher,
            plaintext_len = plaintext.len(),
            "encrypted payload"
        );

        Ok(EncryptedArtifact {
            kem_variant: self.kem,
            cipher: self.cipher,
            kem_ciphertext,
            nonce,
            tag,
            body,
        })
    }

    /// Decrypt an artifact with `private_key`
    ///
    /// The artifact's own header selects KEM and cipher; the engine's
    /// configured pair only matters for encryption.
    pub fn decrypt(&self, artifact: &EncryptedArtifact, private_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        artifact.check_field_lengths()?;
        let variant = artifact.kem_variant;
        let expected = variant.private_key_len();
        if private_key.len() != expected {
            return Err(PqfeError::Configuration(format!(
                "private key is {} bytes but the artifact uses {variant} ({expected} bytes)",
                private_key.len()
            )));
        }

        let plaintext = {
            let shared_secret = variant.port().decapsulate(private_key, &artifact.kem_ciphertext)?;
            let key = derive_key(&shared_secret)?;
            artifact
                .cipher
                .cipher()
                .open(&key[..], &artifact.nonce, &artifact.body, &artifact.tag, &[])?
        };

        tracing::debug!(
            kem = %variant,
            cipher = %artifact.cipher,
            plaintext_len = plaintext.len(),
            "decrypted payload"
        );
        Ok(plaintext)
    }

    /// Encrypt and serialize in one step
    pub fn encrypt_to_bytes(&self, plaintext: &[u8], public_key: &[u8]) -> Result<Vec<u8>> {
        self.encrypt(plaintext, public_key)?.to_bytes()
    }

    /// Parse and decrypt in one step
    pub fn decrypt_bytes(&self, data: &[u8], private_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let artifact = EncryptedArtifact::from_bytes(data)?;
        self.decrypt(&artifact, private_key)
    }
}
