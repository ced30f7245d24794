//! Filesystem key manager
//!
//! Layout under the key directory, per variant:
//!   kyber768_public.key   - raw public key bytes
//!   kyber768_private.key  - raw private key bytes, mode 0600
//!
//! Concurrent `generate` calls against one directory are not guarded;
//! callers serialize them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pqfe_crypto::{KemVariant, KeyPair};
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use crate::atomic::{self, PRIVATE_FILE_MODE, PUBLIC_FILE_MODE};
use crate::{KeyStoreError, Result};

/// Key pair storage bound to one directory and one KEM variant
#[derive(Debug, Clone)]
pub struct KeyManager {
    key_directory: PathBuf,
    variant: KemVariant,
}

impl KeyManager {
    /// Open the key directory, creating it (owner-only) if absent
    pub fn open(key_directory: impl Into<PathBuf>, variant: KemVariant) -> Result<Self> {
        let key_directory = key_directory.into();
        create_key_dir(&key_directory).map_err(|source| KeyStoreError::Io {
            path: key_directory.clone(),
            source,
        })?;
        Ok(Self {
            key_directory,
            variant,
        })
    }

    pub fn key_directory(&self) -> &Path {
        &self.key_directory
    }

    pub fn variant(&self) -> KemVariant {
        self.variant
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.key_directory
            .join(format!("{}_public.key", self.scheme_slug()))
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.key_directory
            .join(format!("{}_private.key", self.scheme_slug()))
    }

    fn scheme_slug(&self) -> String {
        self.variant.scheme().to_ascii_lowercase()
    }

    /// Generate a fresh key pair and persist it, replacing any existing pair
    pub fn generate(&self) -> Result<KeyPair> {
        let pair = self.variant.port().generate_keypair()?;
        self.store(&pair)?;
        tracing::info!(
            variant = %self.variant,
            dir = %self.key_directory.display(),
            "generated and stored key pair"
        );
        Ok(pair)
    }

    /// Persist an existing key pair
    ///
    /// Both halves are staged before either is renamed into place. If the
    /// public half cannot be committed, the previous private key is put
    /// back so the stored pair never mixes generations.
    pub fn store(&self, pair: &KeyPair) -> Result<()> {
        if pair.variant() != self.variant {
            return Err(KeyStoreError::VariantMismatch {
                expected: self.variant,
                found: pair.variant(),
            });
        }

        let private_path = self.private_key_path();
        let public_path = self.public_key_path();

        let private = atomic::stage(
            &self.key_directory,
            pair.private_key().expose_secret(),
            PRIVATE_FILE_MODE,
        )
        .map_err(|source| self.io_error(&private_path, source))?;
        let public = atomic::stage(&self.key_directory, pair.public_key(), PUBLIC_FILE_MODE)
            .map_err(|source| self.io_error(&public_path, source))?;

        let backup = match read_optional(&private_path).map_err(|source| self.io_error(&private_path, source))? {
            Some(previous) => Some(
                atomic::stage(&self.key_directory, &previous, PRIVATE_FILE_MODE)
                    .map_err(|source| self.io_error(&private_path, source))?,
            ),
            None => None,
        };

        atomic::commit(private, &private_path)
            .map_err(|source| self.io_error(&private_path, source))?;
        if let Err(source) = atomic::commit(public, &public_path) {
            self.restore_private(backup, &private_path);
            return Err(self.io_error(&public_path, source));
        }
        Ok(())
    }

    fn restore_private(&self, backup: Option<tempfile::NamedTempFile>, private_path: &Path) {
        let restored = match backup {
            Some(staged) => atomic::commit(staged, private_path),
            None => fs::remove_file(private_path),
        };
        if let Err(e) = restored {
            tracing::warn!(
                path = %private_path.display(),
                error = %e,
                "could not roll back private key after a failed store"
            );
        }
    }

    /// Load the stored key pair
    ///
    /// `Ok(None)` means no keys were ever stored for this variant. A
    /// missing half or a wrong-length file is an error, not an absence.
    pub fn load(&self) -> Result<Option<KeyPair>> {
        let public_path = self.public_key_path();
        let private_path = self.private_key_path();

        let public_exists = key_file_exists(&public_path).map_err(|source| self.io_error(&public_path, source))?;
        let private_exists =
            key_file_exists(&private_path).map_err(|source| self.io_error(&private_path, source))?;

        match (public_exists, private_exists) {
            (false, false) => {
                tracing::debug!(variant = %self.variant, "no stored key pair");
                return Ok(None);
            }
            (true, false) => return Err(KeyStoreError::Incomplete { missing: private_path }),
            (false, true) => return Err(KeyStoreError::Incomplete { missing: public_path }),
            (true, true) => {}
        }

        let public = fs::read(&public_path).map_err(|source| self.io_error(&public_path, source))?;
        check_file_len(&public_path, self.variant.public_key_len(), public.len())?;

        warn_if_exposed(&private_path);
        let mut private = Zeroizing::new(
            fs::read(&private_path).map_err(|source| self.io_error(&private_path, source))?,
        );
        check_file_len(&private_path, self.variant.private_key_len(), private.len())?;

        let pair = KeyPair::from_parts(self.variant, public, std::mem::take(&mut *private))?;
        tracing::debug!(variant = %self.variant, "loaded key pair");
        Ok(Some(pair))
    }

    /// Remove both halves. Returns whether anything was deleted.
    pub fn delete(&self) -> Result<bool> {
        let mut deleted = false;
        for path in [self.public_key_path(), self.private_key_path()] {
            match fs::remove_file(&path) {
                Ok(()) => deleted = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(self.io_error(&path, source)),
            }
        }
        if deleted {
            tracing::info!(variant = %self.variant, "deleted stored key pair");
        }
        Ok(deleted)
    }

    fn io_error(&self, path: &Path, source: io::Error) -> KeyStoreError {
        KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// Only NotFound counts as absent; any other failure is a storage error
fn key_file_exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Zeroizing<Vec<u8>>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn check_file_len(path: &Path, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KeyStoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("expected {expected} bytes, found {actual}"),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn create_key_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_key_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn warn_if_exposed(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        if meta.permissions().mode() & 0o077 != 0 {
            tracing::warn!(path = %path.display(), "private key file is readable by other users");
        }
    }
}

#[cfg(not(unix))]
fn warn_if_exposed(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_and_load() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path().join("keys"), KemVariant::Level1).unwrap();

        let pair = manager.generate().unwrap();
        let loaded = manager.load().unwrap().expect("keys were stored");

        assert_eq!(loaded.variant(), KemVariant::Level1);
        assert_eq!(loaded.public_key(), pair.public_key());
        assert_eq!(
            loaded.private_key().expose_secret(),
            pair.private_key().expose_secret()
        );
    }

    #[test]
    fn test_load_empty_directory_is_none() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level3).unwrap();
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn test_open_is_idempotent() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("nested").join("keys");
        KeyManager::open(&dir, KemVariant::Level1).unwrap();
        KeyManager::open(&dir, KemVariant::Level1).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_truncated_key_is_corrupt() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level1).unwrap();
        manager.generate().unwrap();

        let private = fs::read(manager.private_key_path()).unwrap();
        fs::write(manager.private_key_path(), &private[..private.len() - 1]).unwrap();

        assert!(matches!(manager.load(), Err(KeyStoreError::Corrupt { .. })));
    }

    #[test]
    fn test_missing_half_is_incomplete() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level1).unwrap();
        manager.generate().unwrap();
        fs::remove_file(manager.public_key_path()).unwrap();

        match manager.load() {
            Err(KeyStoreError::Incomplete { missing }) => assert_eq!(missing, manager.public_key_path()),
            other => panic!("expected Incomplete, got {:?}", other.map(|p| p.is_some())),
        }
    }

    #[test]
    fn test_variants_coexist() {
        let tmp = tempdir().unwrap();
        let low = KeyManager::open(tmp.path(), KemVariant::Level1).unwrap();
        let high = KeyManager::open(tmp.path(), KemVariant::Level5).unwrap();

        low.generate().unwrap();
        assert!(high.load().unwrap().is_none());
        high.generate().unwrap();
        assert!(low.load().unwrap().is_some());
    }

    #[test]
    fn test_delete() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level3).unwrap();
        assert!(!manager.delete().unwrap());

        manager.generate().unwrap();
        assert!(manager.delete().unwrap());
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn test_file_names() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level3).unwrap();
        assert!(manager.public_key_path().ends_with("kyber768_public.key"));
        assert!(manager.private_key_path().ends_with("kyber768_private.key"));
    }

    #[test]
    fn test_store_rejects_other_variant() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level1).unwrap();
        let pair = KemVariant::Level5.port().generate_keypair().unwrap();
        assert!(matches!(
            manager.store(&pair),
            Err(KeyStoreError::VariantMismatch { .. })
        ));
        assert!(!manager.public_key_path().exists());
    }

    #[test]
    fn test_key_directory_replaced_by_file_is_io_error() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("keys");
        let manager = KeyManager::open(&dir, KemVariant::Level1).unwrap();
        manager.generate().unwrap();

        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, b"not a directory").unwrap();

        assert!(matches!(manager.load(), Err(KeyStoreError::Io { .. })));
    }

    #[test]
    fn test_failed_public_commit_keeps_previous_private_key() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level1).unwrap();
        manager.generate().unwrap();
        let previous = fs::read(manager.private_key_path()).unwrap();

        // A non-empty directory where the public key goes makes its rename fail
        fs::remove_file(manager.public_key_path()).unwrap();
        fs::create_dir(manager.public_key_path()).unwrap();
        fs::write(manager.public_key_path().join("blocker"), b"x").unwrap();

        assert!(matches!(manager.generate(), Err(KeyStoreError::Io { .. })));
        assert_eq!(fs::read(manager.private_key_path()).unwrap(), previous);

        let leftovers = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_failed_first_store_leaves_no_private_key() {
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level3).unwrap();
        fs::create_dir(manager.public_key_path()).unwrap();
        fs::write(manager.public_key_path().join("blocker"), b"x").unwrap();

        assert!(manager.generate().is_err());
        assert!(!manager.private_key_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path(), KemVariant::Level1).unwrap();
        manager.generate().unwrap();

        let mode = fs::metadata(manager.private_key_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_directory_is_io_error() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempdir().unwrap();
        let manager = KeyManager::open(tmp.path().join("ro"), KemVariant::Level1).unwrap();
        fs::set_permissions(manager.key_directory(), fs::Permissions::from_mode(0o500)).unwrap();

        // root ignores directory permissions
        let probe = manager.key_directory().join("probe");
        if fs::write(&probe, b"x").is_ok() {
            return;
        }

        assert!(matches!(manager.generate(), Err(KeyStoreError::Io { .. })));
        fs::set_permissions(manager.key_directory(), fs::Permissions::from_mode(0o700)).unwrap();
    }
}
