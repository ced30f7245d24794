//! Symmetric key derivation
//!
//! The KEM secret is never used as a cipher key directly. HKDF-SHA256
//! stretches or shrinks it to the 32 bytes both ciphers expect.

use ring::hkdf;
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

pub const DERIVED_KEY_LEN: usize = 32;

const KDF_INFO: &[u8] = b"pqfe/v1/aead-key";

/// Derive the AEAD key from a KEM shared secret
pub fn derive_key(shared_secret: &[u8]) -> Result<Zeroizing<[u8; DERIVED_KEY_LEN]>> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, &[]).extract(shared_secret);
    let info = [KDF_INFO];
    let okm = prk
        .expand(&info, hkdf::HKDF_SHA256)
        .map_err(|_| CryptoError::Primitive("HKDF-SHA256 expand failed".to_string()))?;

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    okm.fill(&mut key[..])
        .map_err(|_| CryptoError::Primitive("HKDF-SHA256 fill failed".to_string()))?;
    Ok(key)
}
