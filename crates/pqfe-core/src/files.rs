//! File input and output around the engine
//!
//! Inputs are size-checked before they are read. Outputs are produced
//! completely in memory and then land through `write_atomic`, so a
//! failed operation never leaves a partial file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use pqfe_keystore::{write_atomic, PRIVATE_FILE_MODE, PUBLIC_FILE_MODE};

use crate::artifact::EncryptedArtifact;
use crate::config::ENCRYPTED_SUFFIX;
use crate::engine::HybridEngine;
use crate::{PqfeError, Result};

/// Where an operation puts its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Write a file. `dir` defaults to the input's directory, `name` to a
    /// name derived from the input's.
    ToFile {
        dir: Option<PathBuf>,
        name: Option<String>,
    },
    /// Return the bytes
    ToMemory,
}

impl OutputMode {
    /// A file next to the input with the default name
    pub fn beside_input() -> Self {
        OutputMode::ToFile {
            dir: None,
            name: None,
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::beside_input()
    }
}

/// Result of a file operation, or an in-memory input to one
#[derive(Clone)]
pub enum DataRef {
    File(PathBuf),
    Memory(Zeroizing<Vec<u8>>),
}

impl DataRef {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            DataRef::File(path) => Some(path),
            DataRef::Memory(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DataRef::File(_) => None,
            DataRef::Memory(bytes) => Some(bytes.as_slice()),
        }
    }
}

impl From<Vec<u8>> for DataRef {
    fn from(bytes: Vec<u8>) -> Self {
        DataRef::Memory(Zeroizing::new(bytes))
    }
}

impl From<PathBuf> for DataRef {
    fn from(path: PathBuf) -> Self {
        DataRef::File(path)
    }
}

// Memory contents may be plaintext
impl fmt::Debug for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRef::File(path) => f.debug_tuple("File").field(path).finish(),
            DataRef::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

pub(crate) fn encrypt_file(
    engine: &HybridEngine,
    path: &Path,
    public_key: &[u8],
    max_file_size: u64,
    output: &OutputMode,
) -> Result<DataRef> {
    let plaintext = read_limited(path, max_file_size)?;
    let encoded = engine.encrypt_to_bytes(&plaintext, public_key)?;

    match output {
        OutputMode::ToMemory => Ok(DataRef::from(encoded)),
        OutputMode::ToFile { dir, name } => {
            let target = resolve_output(Some(path), dir.as_deref(), name.as_deref(), encrypted_name)?;
            write_output(&target, &encoded, PUBLIC_FILE_MODE)?;
            tracing::info!(
                input = %path.display(),
                output = %target.display(),
                kem = %engine.kem_variant(),
                cipher = %engine.cipher(),
                "encrypted file"
            );
            Ok(DataRef::File(target))
        }
    }
}

pub(crate) fn decrypt_file(
    engine: &HybridEngine,
    input: &DataRef,
    private_key: &[u8],
    max_file_size: u64,
    output: &OutputMode,
) -> Result<DataRef> {
    let limit = max_file_size.saturating_add(EncryptedArtifact::max_overhead() as u64);
    let plaintext = match input {
        DataRef::File(path) => engine.decrypt_bytes(&read_limited(path, limit)?, private_key)?,
        DataRef::Memory(bytes) => engine.decrypt_bytes(bytes, private_key)?,
    };

    match output {
        OutputMode::ToMemory => Ok(DataRef::Memory(plaintext)),
        OutputMode::ToFile { dir, name } => {
            let target = resolve_output(input.as_path(), dir.as_deref(), name.as_deref(), decrypted_name)?;
            write_output(&target, &plaintext, PRIVATE_FILE_MODE)?;
            tracing::info!(output = %target.display(), "decrypted file");
            Ok(DataRef::File(target))
        }
    }
}

/// Read a whole file, refusing anything over `limit` bytes
pub(crate) fn read_limited(path: &Path, limit: u64) -> Result<Zeroizing<Vec<u8>>> {
    let access = |source| PqfeError::FileAccess {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(access)?.len();
    if size > limit {
        return Err(PqfeError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    Ok(Zeroizing::new(fs::read(path).map_err(access)?))
}

fn write_output(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    write_atomic(path, contents, mode).map_err(|source| PqfeError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_output(
    source: Option<&Path>,
    dir: Option<&Path>,
    name: Option<&str>,
    default_name: fn(&str) -> String,
) -> Result<PathBuf> {
    let source_name = source
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());

    let name = match (name, source_name) {
        (Some(name), _) => name.to_string(),
        (None, Some(source_name)) => default_name(&source_name),
        (None, None) => {
            return Err(PqfeError::Configuration(
                "an output name is required when the input has no file name".to_string(),
            ))
        }
    };
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') {
        return Err(PqfeError::Configuration(format!(
            "invalid output file name {name:?}"
        )));
    }

    let dir = match (dir, source) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(source)) => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        (None, None) => PathBuf::from("."),
    };
    Ok(dir.join(name))
}

fn encrypted_name(input: &str) -> String {
    format!("{input}.{ENCRYPTED_SUFFIX}")
}

fn decrypted_name(input: &str) -> String {
    match input.strip_suffix(&format!(".{ENCRYPTED_SUFFIX}")) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{input}.dec"),
    }
}
