//! Engine configuration
//!
//! Loaded from `~/.pqfe/config.json` style files or built in code. Every
//! field has a default, so a partial JSON file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pqfe_crypto::{CipherId, KemVariant};

use crate::{PqfeError, Result};

/// 1 GiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 30;

/// Extension appended to encrypted files
pub const ENCRYPTED_SUFFIX: &str = "enc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PqfeConfig {
    pub kem_variant: KemVariant,
    pub cipher: CipherId,
    pub key_directory: PathBuf,
    /// Largest input file accepted, in bytes
    pub max_file_size: u64,
}

impl Default for PqfeConfig {
    fn default() -> Self {
        Self {
            kem_variant: KemVariant::default(),
            cipher: CipherId::default(),
            key_directory: default_key_directory(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl PqfeConfig {
    pub fn new(kem_variant: KemVariant, cipher: CipherId, key_directory: impl Into<PathBuf>) -> Self {
        Self {
            kem_variant,
            cipher,
            key_directory: key_directory.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Read a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PqfeError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PqfeError::Configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_directory.as_os_str().is_empty() {
            return Err(PqfeError::Configuration(
                "key directory must not be empty".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(PqfeError::Configuration(
                "max_file_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `~/.pqfe/keys`, or `./.pqfe/keys` when no home directory is known
pub fn default_key_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pqfe")
        .join("keys")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PqfeConfig::default();
        assert_eq!(config.kem_variant, KemVariant::Level1);
        assert_eq!(config.cipher, CipherId::Aes256Gcm);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(config.key_directory.ends_with(".pqfe/keys"));
    }

    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "kem_variant": "Kyber1024", "cipher": "ChaCha20-Poly1305", "key_directory": "/tmp/k" }"#,
        )
        .unwrap();

        let config = PqfeConfig::from_json_file(&path).unwrap();
        assert_eq!(config.kem_variant, KemVariant::Level5);
        assert_eq!(config.cipher, CipherId::ChaCha20Poly1305);
        assert_eq!(config.key_directory, PathBuf::from("/tmp/k"));
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PqfeConfig::new(KemVariant::Level3, CipherId::Aes256Gcm, "/keys")
            .with_max_file_size(4096);
        let json = serde_json::to_string(&config).unwrap();
        let back: PqfeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "kem_variant": "Kyber9" }"#).unwrap();
        assert!(matches!(
            PqfeConfig::from_json_file(&path),
            Err(PqfeError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PqfeConfig::from_json_file(&dir.path().join("absent.json")),
            Err(PqfeError::FileAccess { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let zero = PqfeConfig::new(KemVariant::Level1, CipherId::Aes256Gcm, "/keys").with_max_file_size(0);
        assert!(zero.validate().is_err());
        let empty = PqfeConfig::new(KemVariant::Level1, CipherId::Aes256Gcm, "");
        assert!(empty.validate().is_err());
    }
}
