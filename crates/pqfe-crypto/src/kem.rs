//! Key Encapsulation Mechanism (ML-KEM/Kyber)
//!
//! Three security levels, one adapter each. Lengths always come from the
//! provider, so a key of the wrong size is rejected before it reaches
//! the C implementation.

use std::fmt;
use std::str::FromStr;

use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use secrecy::{ExposeSecret, Secret, SecretVec};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{check_len, CryptoError, Result};

/// Supported KEM security levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KemVariant {
    /// Kyber512, NIST level 1
    #[serde(rename = "Kyber512", alias = "kyber512")]
    Level1,
    /// Kyber768, NIST level 3
    #[serde(rename = "Kyber768", alias = "kyber768")]
    Level3,
    /// Kyber1024, NIST level 5
    #[serde(rename = "Kyber1024", alias = "kyber1024")]
    Level5,
}

impl KemVariant {
    pub const ALL: [KemVariant; 3] = [KemVariant::Level1, KemVariant::Level3, KemVariant::Level5];

    /// Identifier byte written into artifacts
    pub fn id(self) -> u8 {
        match self {
            KemVariant::Level1 => 0x01,
            KemVariant::Level3 => 0x03,
            KemVariant::Level5 => 0x05,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.id() == id)
    }

    pub fn scheme(self) -> &'static str {
        match self {
            KemVariant::Level1 => "Kyber512",
            KemVariant::Level3 => "Kyber768",
            KemVariant::Level5 => "Kyber1024",
        }
    }

    pub fn nist_level(self) -> u8 {
        match self {
            KemVariant::Level1 => 1,
            KemVariant::Level3 => 3,
            KemVariant::Level5 => 5,
        }
    }

    /// The provider adapter for this level
    pub fn port(self) -> &'static dyn KeyEncapsulation {
        match self {
            KemVariant::Level1 => &Kyber512,
            KemVariant::Level3 => &Kyber768,
            KemVariant::Level5 => &Kyber1024,
        }
    }

    pub fn public_key_len(self) -> usize {
        self.port().public_key_len()
    }

    pub fn private_key_len(self) -> usize {
        self.port().private_key_len()
    }

    pub fn ciphertext_len(self) -> usize {
        self.port().ciphertext_len()
    }

    pub fn shared_secret_len(self) -> usize {
        self.port().shared_secret_len()
    }
}

impl Default for KemVariant {
    fn default() -> Self {
        KemVariant::Level1
    }
}

impl fmt::Display for KemVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for KemVariant {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kyber512" | "level1" | "1" => Ok(KemVariant::Level1),
            "kyber768" | "level3" | "3" => Ok(KemVariant::Level3),
            "kyber1024" | "level5" | "5" => Ok(KemVariant::Level5),
            _ => Err(CryptoError::Unsupported {
                kind: "KEM variant",
                name: s.to_string(),
            }),
        }
    }
}

/// A KEM key pair. The private half never shows up in `Debug` output.
pub struct KeyPair {
    variant: KemVariant,
    public_key: Vec<u8>,
    private_key: SecretVec<u8>,
}

impl KeyPair {
    /// Assemble a key pair, checking both halves against the variant's lengths
    pub fn from_parts(variant: KemVariant, public_key: Vec<u8>, private_key: Vec<u8>) -> Result<Self> {
        let private_key = Secret::new(private_key);
        check_len("public key", variant.public_key_len(), public_key.len())?;
        check_len(
            "private key",
            variant.private_key_len(),
            private_key.expose_secret().len(),
        )?;
        Ok(Self {
            variant,
            public_key,
            private_key,
        })
    }

    pub fn variant(&self) -> KemVariant {
        self.variant
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn private_key(&self) -> &SecretVec<u8> {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("variant", &self.variant)
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Output of one encapsulation. The shared secret is zeroized on drop.
pub struct Encapsulation {
    pub ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for Encapsulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encapsulation")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("shared_secret", &"[REDACTED]")
            .finish()
    }
}

/// Capability over a KEM provider at one security level
pub trait KeyEncapsulation: Send + Sync {
    fn variant(&self) -> KemVariant;
    fn public_key_len(&self) -> usize;
    fn private_key_len(&self) -> usize;
    fn ciphertext_len(&self) -> usize;
    fn shared_secret_len(&self) -> usize;

    fn generate_keypair(&self) -> Result<KeyPair>;

    /// Fails with `InvalidKey` when `public_key` has the wrong length
    fn encapsulate(&self, public_key: &[u8]) -> Result<Encapsulation>;

    /// Fails with `InvalidKey` on a wrong-length private key and with the
    /// opaque `Decapsulation` error for anything else
    fn decapsulate(&self, private_key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

macro_rules! kyber_adapter {
    ($(#[$doc:meta])* $adapter:ident, $module:ident, $variant:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $adapter;

        impl KeyEncapsulation for $adapter {
            fn variant(&self) -> KemVariant {
                $variant
            }

            fn public_key_len(&self) -> usize {
                pqcrypto_kyber::$module::public_key_bytes()
            }

            fn private_key_len(&self) -> usize {
                pqcrypto_kyber::$module::secret_key_bytes()
            }

            fn ciphertext_len(&self) -> usize {
                pqcrypto_kyber::$module::ciphertext_bytes()
            }

            fn shared_secret_len(&self) -> usize {
                pqcrypto_kyber::$module::shared_secret_bytes()
            }

            fn generate_keypair(&self) -> Result<KeyPair> {
                let (pk, sk) = pqcrypto_kyber::$module::keypair();
                let pair = KeyPair::from_parts($variant, pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
                    .map_err(|_| {
                        CryptoError::Primitive(format!("{} returned a malformed key pair", $variant))
                    })?;
                tracing::debug!(variant = %$variant, "generated KEM key pair");
                Ok(pair)
            }

            fn encapsulate(&self, public_key: &[u8]) -> Result<Encapsulation> {
                check_len("public key", self.public_key_len(), public_key.len())?;
                let pk = pqcrypto_kyber::$module::PublicKey::from_bytes(public_key).map_err(|_| {
                    CryptoError::InvalidKey {
                        kind: "public key",
                        expected: self.public_key_len(),
                        actual: public_key.len(),
                    }
                })?;
                let (ss, ct) = pqcrypto_kyber::$module::encapsulate(&pk);
                let shared_secret = Zeroizing::new(ss.as_bytes().to_vec());
                if shared_secret.len() != self.shared_secret_len() {
                    return Err(CryptoError::Primitive(format!(
                        "{} returned a shared secret of unexpected length",
                        $variant
                    )));
                }
                Ok(Encapsulation {
                    ciphertext: ct.as_bytes().to_vec(),
                    shared_secret,
                })
            }

            fn decapsulate(&self, private_key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
                check_len("private key", self.private_key_len(), private_key.len())?;
                let sk = pqcrypto_kyber::$module::SecretKey::from_bytes(private_key).map_err(|_| {
                    CryptoError::InvalidKey {
                        kind: "private key",
                        expected: self.private_key_len(),
                        actual: private_key.len(),
                    }
                })?;
                let ct = pqcrypto_kyber::$module::Ciphertext::from_bytes(ciphertext)
                    .map_err(|_| CryptoError::Decapsulation)?;
                let ss = pqcrypto_kyber::$module::decapsulate(&ct, &sk);
                let shared_secret = Zeroizing::new(ss.as_bytes().to_vec());
                if shared_secret.len() != self.shared_secret_len() {
                    return Err(CryptoError::Decapsulation);
                }
                Ok(shared_secret)
            }
        }
    };
}

kyber_adapter!(
    /// Kyber512 provider adapter
    Kyber512,
    kyber512,
    KemVariant::Level1
);
kyber_adapter!(
    /// Kyber768 provider adapter
    Kyber768,
    kyber768,
    KemVariant::Level3
);
kyber_adapter!(
    /// Kyber1024 provider adapter
    Kyber1024,
    kyber1024,
    KemVariant::Level5
);
