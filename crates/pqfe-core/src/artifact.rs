//! Encrypted artifact format
//!
//! ```text
//! [1 kem id][1 cipher id][4 kem ciphertext len, big-endian]
//! [kem ciphertext][nonce][tag][body .. end]
//! ```
//!
//! Nonce and tag lengths follow from the cipher id, so only the KEM
//! ciphertext carries an explicit length.

use pqfe_crypto::{CipherId, KemVariant};

use crate::{PqfeError, Result};

/// Fixed header: two id bytes and a u32 length
pub const HEADER_LEN: usize = 6;

/// A complete, self-describing encrypted payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedArtifact {
    pub kem_variant: KemVariant,
    pub cipher: CipherId,
    pub kem_ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
    pub body: Vec<u8>,
}

impl EncryptedArtifact {
    /// Serialized size in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.kem_ciphertext.len() + self.nonce.len() + self.tag.len() + self.body.len()
    }

    /// Largest header-plus-overhead any supported combination produces
    pub fn max_overhead() -> usize {
        let kem = KemVariant::ALL
            .iter()
            .map(|v| v.ciphertext_len())
            .max()
            .unwrap_or(0);
        let cipher = CipherId::ALL
            .iter()
            .map(|c| c.nonce_len() + c.tag_len())
            .max()
            .unwrap_or(0);
        HEADER_LEN + kem + cipher
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.check_field_lengths()?;
        let kem_len = u32::try_from(self.kem_ciphertext.len())
            .map_err(|_| PqfeError::MalformedArtifact("KEM ciphertext too long".to_string()))?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.kem_variant.id());
        out.push(self.cipher.id());
        out.extend_from_slice(&kem_len.to_be_bytes());
        out.extend_from_slice(&self.kem_ciphertext);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(malformed(format!(
                "{} bytes is shorter than the {HEADER_LEN} byte header",
                data.len()
            )));
        }

        let kem_variant = KemVariant::from_id(data[0])
            .ok_or_else(|| malformed(format!("unknown KEM variant id {:#04x}", data[0])))?;
        let cipher = CipherId::from_id(data[1])
            .ok_or_else(|| malformed(format!("unknown cipher id {:#04x}", data[1])))?;
        let kem_len = u32::from_be_bytes([data[2], data[3], data[4], data[5]]) as usize;

        let mut rest = &data[HEADER_LEN..];
        let kem_ciphertext = take(&mut rest, kem_len, "KEM ciphertext")?;
        if kem_ciphertext.len() != kem_variant.ciphertext_len() {
            return Err(malformed(format!(
                "{kem_variant} ciphertext must be {} bytes, header says {kem_len}",
                kem_variant.ciphertext_len()
            )));
        }
        let nonce = take(&mut rest, cipher.nonce_len(), "nonce")?;
        let tag = take(&mut rest, cipher.tag_len(), "tag")?;

        Ok(Self {
            kem_variant,
            cipher,
            kem_ciphertext: kem_ciphertext.to_vec(),
            nonce: nonce.to_vec(),
            tag: tag.to_vec(),
            body: rest.to_vec(),
        })
    }

    pub(crate) fn check_field_lengths(&self) -> Result<()> {
        let checks = [
            ("KEM ciphertext", self.kem_variant.ciphertext_len(), self.kem_ciphertext.len()),
            ("nonce", self.cipher.nonce_len(), self.nonce.len()),
            ("tag", self.cipher.tag_len(), self.tag.len()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(malformed(format!("{what} is {actual} bytes, expected {expected}")));
            }
        }
        Ok(())
    }
}

fn take<'a>(buf: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8]> {
    if buf.len() < len {
        return Err(malformed(format!(
            "{what} needs {len} bytes, only {} remain",
            buf.len()
        )));
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

fn malformed(msg: String) -> PqfeError {
    PqfeError::MalformedArtifact(msg)
}
