//! Authenticated encryption (AES-256-GCM, ChaCha20-Poly1305)
//!
//! Both ciphers take a 256-bit key and a 96-bit nonce and produce a
//! detached 128-bit tag. AES-256-GCM comes from `ring`, ChaCha20-Poly1305
//! from the RustCrypto `chacha20poly1305` crate. Tag checks in both are
//! constant-time and nothing is returned until the tag verifies.

use std::fmt;
use std::str::FromStr;

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};
use ring::aead::{self, Aad, LessSafeKey, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{check_len, CryptoError, Result};

/// 256-bit key (32 bytes)
pub const KEY_SIZE: usize = 32;
/// 96-bit nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;
/// 128-bit tag (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Supported AEAD algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherId {
    #[serde(rename = "AES-256-GCM", alias = "AES256GCM")]
    Aes256Gcm,
    #[serde(rename = "ChaCha20-Poly1305", alias = "ChaCha20Poly1305")]
    ChaCha20Poly1305,
}

impl CipherId {
    pub const ALL: [CipherId; 2] = [CipherId::Aes256Gcm, CipherId::ChaCha20Poly1305];

    /// Identifier byte written into artifacts
    pub fn id(self) -> u8 {
        match self {
            CipherId::Aes256Gcm => 0x01,
            CipherId::ChaCha20Poly1305 => 0x02,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            CipherId::Aes256Gcm => "AES-256-GCM",
            CipherId::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    /// The provider adapter for this algorithm
    pub fn cipher(self) -> &'static dyn SymmetricCipher {
        match self {
            CipherId::Aes256Gcm => &Aes256GcmCipher,
            CipherId::ChaCha20Poly1305 => &ChaCha20Poly1305Cipher,
        }
    }

    pub fn key_len(self) -> usize {
        self.cipher().key_len()
    }

    pub fn nonce_len(self) -> usize {
        self.cipher().nonce_len()
    }

    pub fn tag_len(self) -> usize {
        self.cipher().tag_len()
    }
}

impl Default for CipherId {
    fn default() -> Self {
        CipherId::Aes256Gcm
    }
}

impl fmt::Display for CipherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "aes256gcm" | "aes" => Ok(CipherId::Aes256Gcm),
            "chacha20poly1305" | "chacha" => Ok(CipherId::ChaCha20Poly1305),
            _ => Err(CryptoError::Unsupported {
                kind: "cipher",
                name: s.to_string(),
            }),
        }
    }
}

/// Capability over an AEAD provider
///
/// `aad` may be empty. `seal` returns `(ciphertext, tag)`.
pub trait SymmetricCipher: Send + Sync {
    fn id(&self) -> CipherId;

    fn key_len(&self) -> usize {
        KEY_SIZE
    }

    fn nonce_len(&self) -> usize {
        NONCE_SIZE
    }

    fn tag_len(&self) -> usize {
        TAG_SIZE
    }

    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Fails with `Authentication` when the tag does not verify
    fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>>;
}

fn check_key_and_nonce(cipher: &dyn SymmetricCipher, key: &[u8], nonce: &[u8]) -> Result<()> {
    check_len("cipher key", cipher.key_len(), key.len())?;
    check_len("nonce", cipher.nonce_len(), nonce.len())
}

/// Generate a cryptographically secure random nonce
pub fn generate_nonce(len: usize) -> Result<Vec<u8>> {
    let mut nonce = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CryptoError::Primitive("system random source unavailable".to_string()))?;
    Ok(nonce)
}

/// AES-256-GCM via `ring`
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmCipher;

impl Aes256GcmCipher {
    fn key(key: &[u8]) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CryptoError::InvalidKey {
            kind: "cipher key",
            expected: KEY_SIZE,
            actual: key.len(),
        })?;
        Ok(LessSafeKey::new(unbound))
    }

    fn nonce(nonce: &[u8]) -> Result<aead::Nonce> {
        aead::Nonce::try_assume_unique_for_key(nonce).map_err(|_| CryptoError::InvalidKey {
            kind: "nonce",
            expected: NONCE_SIZE,
            actual: nonce.len(),
        })
    }
}

impl SymmetricCipher for Aes256GcmCipher {
    fn id(&self) -> CipherId {
        CipherId::Aes256Gcm
    }

    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        check_key_and_nonce(self, key, nonce)?;
        let key = Self::key(key)?;
        let mut in_out = plaintext.to_vec();
        let tag = key
            .seal_in_place_separate_tag(Self::nonce(nonce)?, Aad::from(aad), &mut in_out)
            .map_err(|_| CryptoError::Primitive("AES-256-GCM seal failed".to_string()))?;
        Ok((in_out, tag.as_ref().to_vec()))
    }

    fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        check_key_and_nonce(self, key, nonce)?;
        if tag.len() != TAG_SIZE {
            return Err(CryptoError::Authentication);
        }
        let key = Self::key(key)?;

        // ring verifies ciphertext || tag in one buffer
        let mut in_out = Zeroizing::new(Vec::with_capacity(ciphertext.len() + TAG_SIZE));
        in_out.extend_from_slice(ciphertext);
        in_out.extend_from_slice(tag);
        let plaintext_len = key
            .open_in_place(Self::nonce(nonce)?, Aad::from(aad), in_out.as_mut_slice())
            .map_err(|_| CryptoError::Authentication)?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }
}

/// ChaCha20-Poly1305 via RustCrypto
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaCha20Poly1305Cipher;

impl ChaCha20Poly1305Cipher {
    fn cipher(key: &[u8]) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::InvalidKey {
            kind: "cipher key",
            expected: KEY_SIZE,
            actual: key.len(),
        })
    }
}

impl SymmetricCipher for ChaCha20Poly1305Cipher {
    fn id(&self) -> CipherId {
        CipherId::ChaCha20Poly1305
    }

    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        check_key_and_nonce(self, key, nonce)?;
        let cipher = Self::cipher(key)?;
        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, &mut buffer)
            .map_err(|_| CryptoError::Primitive("ChaCha20-Poly1305 seal failed".to_string()))?;
        Ok((buffer, tag.to_vec()))
    }

    fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        check_key_and_nonce(self, key, nonce)?;
        if tag.len() != TAG_SIZE {
            return Err(CryptoError::Authentication);
        }
        let cipher = Self::cipher(key)?;
        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                aad,
                buffer.as_mut_slice(),
                Tag::from_slice(tag),
            )
            .map_err(|_| CryptoError::Authentication)?;
        Ok(buffer)
    }
}
