//! Facade file operations against a real directory

use std::fs;
use std::path::Path;

use pqfe_core::{CipherId, DataRef, KemVariant, OutputMode, Pqfe, PqfeConfig, PqfeError};
use secrecy::ExposeSecret;
use tempfile::tempdir;

fn setup(root: &Path, kem: KemVariant, cipher: CipherId) -> Pqfe {
    Pqfe::new(PqfeConfig::new(kem, cipher, root.join("keys"))).unwrap()
}

#[test]
fn file_roundtrip_with_default_names() {
    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level3, CipherId::ChaCha20Poly1305);
    let pair = pqfe.generate_keys().unwrap();

    let input = tmp.path().join("notes.txt");
    fs::write(&input, b"This is a test file.").unwrap();

    let encrypted = pqfe
        .encrypt_file(&input, pair.public_key(), &OutputMode::beside_input())
        .unwrap();
    let encrypted_path = encrypted.as_path().unwrap().to_path_buf();
    assert_eq!(encrypted_path, tmp.path().join("notes.txt.enc"));

    fs::remove_file(&input).unwrap();
    let decrypted = pqfe
        .decrypt_file(&encrypted, pair.private_key().expose_secret(), &OutputMode::beside_input())
        .unwrap();
    assert_eq!(decrypted.as_path(), Some(input.as_path()));
    assert_eq!(fs::read(&input).unwrap(), b"This is a test file.");
}

#[test]
fn to_file_and_to_memory_agree() {
    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level1, CipherId::Aes256Gcm);
    let pair = pqfe.generate_keys().unwrap();
    let private_key = pair.private_key().expose_secret();

    let input = tmp.path().join("data.bin");
    let content: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
    fs::write(&input, &content).unwrap();

    let in_memory = pqfe
        .encrypt_file(&input, pair.public_key(), &OutputMode::ToMemory)
        .unwrap();
    let on_disk = pqfe
        .encrypt_file(
            &input,
            pair.public_key(),
            &OutputMode::ToFile {
                dir: Some(tmp.path().join("out")),
                name: Some("data.pqfe".to_string()),
            },
        )
        .unwrap();
    assert_eq!(on_disk.as_path(), Some(tmp.path().join("out/data.pqfe").as_path()));

    let from_memory = pqfe
        .decrypt_file(&in_memory, private_key, &OutputMode::ToMemory)
        .unwrap();
    let from_disk = pqfe
        .decrypt_file(&on_disk, private_key, &OutputMode::ToMemory)
        .unwrap();
    assert_eq!(from_memory.as_bytes(), Some(&content[..]));
    assert_eq!(from_disk.as_bytes(), Some(&content[..]));

    let written = pqfe
        .decrypt_file(
            &in_memory,
            private_key,
            &OutputMode::ToFile {
                dir: Some(tmp.path().to_path_buf()),
                name: Some("restored.bin".to_string()),
            },
        )
        .unwrap();
    assert_eq!(fs::read(written.as_path().unwrap()).unwrap(), content);
}

#[test]
fn memory_input_to_file_needs_a_name() {
    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level1, CipherId::Aes256Gcm);
    let pair = pqfe.generate_keys().unwrap();

    let artifact = pqfe.encrypt_data(b"abc", pair.public_key()).unwrap();
    let input = DataRef::from(artifact.to_bytes().unwrap());
    assert!(matches!(
        pqfe.decrypt_file(
            &input,
            pair.private_key().expose_secret(),
            &OutputMode::ToFile {
                dir: Some(tmp.path().to_path_buf()),
                name: None,
            },
        ),
        Err(PqfeError::Configuration(_))
    ));
}

#[test]
fn failed_decrypt_leaves_no_output() {
    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level1, CipherId::Aes256Gcm);
    let pair = pqfe.generate_keys().unwrap();

    let input = tmp.path().join("secret.txt");
    fs::write(&input, b"top secret").unwrap();
    let encrypted = pqfe
        .encrypt_file(&input, pair.public_key(), &OutputMode::beside_input())
        .unwrap();
    fs::remove_file(&input).unwrap();

    let path = encrypted.as_path().unwrap();
    let mut bytes = fs::read(path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(path, &bytes).unwrap();

    let result = pqfe.decrypt_file(
        &encrypted,
        pair.private_key().expose_secret(),
        &OutputMode::beside_input(),
    );
    assert!(matches!(result, Err(PqfeError::Authentication)));
    assert!(!input.exists());

    let leftovers: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn oversized_input_is_rejected_before_encryption() {
    let tmp = tempdir().unwrap();
    let config = PqfeConfig::new(KemVariant::Level1, CipherId::Aes256Gcm, tmp.path().join("keys"))
        .with_max_file_size(1024);
    let pqfe = Pqfe::new(config).unwrap();
    let pair = pqfe.generate_keys().unwrap();

    let input = tmp.path().join("big.bin");
    fs::write(&input, vec![0u8; 1025]).unwrap();

    assert!(matches!(
        pqfe.encrypt_file(&input, pair.public_key(), &OutputMode::beside_input()),
        Err(PqfeError::FileTooLarge {
            size: 1025,
            limit: 1024,
            ..
        })
    ));
    assert!(!tmp.path().join("big.bin.enc").exists());
}

#[test]
fn missing_input_is_file_access_error() {
    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level1, CipherId::Aes256Gcm);
    let pair = pqfe.generate_keys().unwrap();

    assert!(matches!(
        pqfe.encrypt_file(
            &tmp.path().join("nope.txt"),
            pair.public_key(),
            &OutputMode::ToMemory
        ),
        Err(PqfeError::FileAccess { .. })
    ));
}

#[test]
fn keys_survive_reopen() {
    let tmp = tempdir().unwrap();
    let public_key = {
        let pqfe = setup(tmp.path(), KemVariant::Level5, CipherId::Aes256Gcm);
        pqfe.generate_keys().unwrap().public_key().to_vec()
    };

    let reopened = setup(tmp.path(), KemVariant::Level5, CipherId::Aes256Gcm);
    let loaded = reopened.require_keys().unwrap();
    assert_eq!(loaded.public_key(), &public_key[..]);
}

#[test]
fn corrupt_key_file_is_storage_error() {
    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level1, CipherId::Aes256Gcm);
    pqfe.generate_keys().unwrap();
    fs::write(pqfe.key_manager().public_key_path(), b"short").unwrap();

    assert!(matches!(pqfe.load_keys(), Err(PqfeError::Storage(_))));
}

#[cfg(unix)]
#[test]
fn private_key_and_plaintext_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let pqfe = setup(tmp.path(), KemVariant::Level1, CipherId::Aes256Gcm);
    let pair = pqfe.generate_keys().unwrap();

    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&pqfe.key_manager().private_key_path()), 0o600);

    let input = tmp.path().join("a.txt");
    fs::write(&input, b"a").unwrap();
    let encrypted = pqfe
        .encrypt_file(&input, pair.public_key(), &OutputMode::beside_input())
        .unwrap();
    let decrypted = pqfe
        .decrypt_file(
            &encrypted,
            pair.private_key().expose_secret(),
            &OutputMode::ToFile {
                dir: None,
                name: Some("a.out".to_string()),
            },
        )
        .unwrap();
    assert_eq!(mode(decrypted.as_path().unwrap()), 0o600);
}
