// SPDX-FileCopyrightText: 2026 Envx Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for key files, containers and the Envx facade.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use envx_vault::kdf::{Argon2Params, ScryptParams};
use envx_vault::{
    Container, Envx, EnvxError, ErrorKind, FileKeyStore, KdfAlgorithm, KdfMetadata, KdfSettings,
    KeyMode, KeyStore, SecretSet, decrypt_all, decrypt_with_password, encrypt_all,
};
use proptest::prelude::*;
use secrecy::SecretString;
use tempfile::tempdir;

fn fast_kdf(algorithm: KdfAlgorithm) -> KdfSettings {
    KdfSettings {
        algorithm,
        argon2: Argon2Params {
            memory_kb: 1024,
            iterations: 1,
            parallelism: 1,
        },
        scrypt: ScryptParams {
            n: 1 << 10,
            ..ScryptParams::default()
        },
    }
}

fn sample() -> SecretSet {
    [("API_KEY", "sk-1234"), ("DEBUG", "true")]
        .into_iter()
        .collect()
}

/// Encrypt `sample()` under a fresh key file and return the facade plus JSON.
fn encrypted_sample(dir: &std::path::Path) -> (Envx, serde_json::Value) {
    let envx = Envx::open(dir.join(".envx.key"));
    let kdf = envx.init(&KeyMode::Random).unwrap();
    let container = envx.encrypt(&sample(), &kdf).unwrap();
    (envx, serde_json::to_value(&container).unwrap())
}

fn flip_first_byte(encoded: &str) -> String {
    let mut raw = STANDARD.decode(encoded).unwrap();
    raw[0] ^= 0x01;
    STANDARD.encode(raw)
}

#[test]
fn file_backed_roundtrip() {
    let dir = tempdir().unwrap();
    let envx = Envx::open(dir.path().join(".envx.key"));
    let kdf = envx.init(&KeyMode::Random).unwrap();

    let container = envx.encrypt(&sample(), &kdf).unwrap();
    let path = dir.path().join(".env.envx");
    container.write_atomic(&path).unwrap();

    let read_back = Container::read(&path).unwrap();
    let secrets = envx.decrypt(&read_back).unwrap();
    assert_eq!(secrets.get("API_KEY"), Some("sk-1234"));
    assert_eq!(secrets.get("DEBUG"), Some("true"));
}

#[test]
fn key_file_is_raw_32_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".envx.key");
    Envx::open(&path).init(&KeyMode::Random).unwrap();
    assert_eq!(std::fs::read(&path).unwrap().len(), 32);
}

#[test]
fn second_init_does_not_clobber() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".envx.key");
    let envx = Envx::open(&path);
    envx.init(&KeyMode::Random).unwrap();
    let before = std::fs::read(&path).unwrap();

    let err = envx.init(&KeyMode::Random).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileExists);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn sixteen_byte_key_file_is_rejected() {
    let dir = tempdir().unwrap();
    let (_, json) = encrypted_sample(dir.path());

    let short = dir.path().join("short.key");
    std::fs::write(&short, [0u8; 16]).unwrap();
    let err = Envx::open(&short)
        .decrypt_bytes(json.to_string().as_bytes())
        .unwrap_err();
    assert!(matches!(
        err,
        EnvxError::InvalidKeyLength {
            expected: 32,
            actual: 16
        }
    ));
}

#[test]
fn missing_key_file() {
    let dir = tempdir().unwrap();
    let envx = Envx::open(dir.path().join("absent.key"));
    let err = envx.encrypt(&sample(), &KdfMetadata::None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
}

#[test]
fn wrong_key_fails_generically() {
    let dir = tempdir().unwrap();
    let (_, json) = encrypted_sample(dir.path());

    let other = Envx::open(dir.path().join("other.key"));
    other.init(&KeyMode::Random).unwrap();
    let err = other.decrypt_bytes(json.to_string().as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
    assert_eq!(err.to_string(), "decryption failed: wrong key or corrupted data");
}

#[test]
fn flipped_tag_byte_fails_whole_container() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    let tampered = flip_first_byte(json["values"]["DEBUG"].as_str().unwrap());
    json["values"]["DEBUG"] = tampered.into();

    let err = envx.decrypt_bytes(json.to_string().as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
}

#[test]
fn flipped_ciphertext_byte_fails() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    let mut raw = STANDARD
        .decode(json["values"]["API_KEY"].as_str().unwrap())
        .unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0x80;
    json["values"]["API_KEY"] = STANDARD.encode(raw).into();

    assert!(envx.decrypt_bytes(json.to_string().as_bytes()).is_err());
}

#[test]
fn flipped_nonce_byte_fails() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    let tampered = flip_first_byte(json["nonce_map"]["API_KEY"].as_str().unwrap());
    json["nonce_map"]["API_KEY"] = tampered.into();

    assert!(envx.decrypt_bytes(json.to_string().as_bytes()).is_err());
}

#[test]
fn swapped_values_fail_authentication() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    let a = json["values"]["API_KEY"].clone();
    let b = json["values"]["DEBUG"].clone();
    json["values"]["API_KEY"] = b;
    json["values"]["DEBUG"] = a;

    assert!(envx.decrypt_bytes(json.to_string().as_bytes()).is_err());
}

#[test]
fn tampered_container_still_verifies_structurally() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    let tampered = flip_first_byte(json["values"]["DEBUG"].as_str().unwrap());
    json["values"]["DEBUG"] = tampered.into();
    let bytes = json.to_string();

    let structural = envx_vault::verify(bytes.as_bytes());
    assert!(structural.structural);
    assert_eq!(structural.authenticated, None);

    let full = envx.verify_authentic(bytes.as_bytes()).unwrap();
    assert!(full.structural);
    assert_eq!(full.authenticated, Some(false));
    assert!(!full.valid);
}

#[test]
fn future_version_is_rejected_before_decrypting() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    json["version"] = 2.into();

    let err = envx.decrypt_bytes(json.to_string().as_bytes()).unwrap_err();
    assert!(matches!(err, EnvxError::UnsupportedVersion { found: 2, .. }));
}

#[test]
fn mismatched_key_sets_are_rejected() {
    let dir = tempdir().unwrap();
    let (envx, mut json) = encrypted_sample(dir.path());
    json["nonce_map"]
        .as_object_mut()
        .unwrap()
        .remove("API_KEY");

    let err = envx.decrypt_bytes(json.to_string().as_bytes()).unwrap_err();
    assert!(matches!(err, EnvxError::KeySetMismatch { ref name, .. } if name == "API_KEY"));
}

#[test]
fn password_roundtrip_for_both_algorithms() {
    for algorithm in [KdfAlgorithm::Argon2id, KdfAlgorithm::Scrypt] {
        let dir = tempdir().unwrap();
        let envx = Envx::open(dir.path().join(".envx.key")).with_kdf_settings(fast_kdf(algorithm));
        let kdf = envx
            .init(&KeyMode::Password(SecretString::from("correct horse battery".to_string())))
            .unwrap();
        assert_eq!(kdf.type_name(), algorithm.as_str());

        let container = envx.encrypt(&sample(), &kdf).unwrap();
        let bytes = container.to_json_pretty().unwrap();
        let parsed = envx_vault::container::parse(bytes.as_bytes()).unwrap();

        let password = SecretString::from("correct horse battery".to_string());
        let by_password = decrypt_with_password(&parsed, &password).unwrap();
        let by_key = envx.decrypt(&parsed).unwrap();
        assert_eq!(by_password, sample());
        assert_eq!(by_key, sample());
    }
}

#[test]
fn rotation_through_key_files() {
    let dir = tempdir().unwrap();
    let (old, json) = encrypted_sample(dir.path());
    let container = envx_vault::container::parse(json.to_string().as_bytes()).unwrap();

    let new_store = FileKeyStore::new(dir.path().join("new.key"));
    let rotated = old
        .rotate_key(&container, &new_store, &KeyMode::Random)
        .unwrap();
    assert!(new_store.exists().unwrap());

    let new = Envx::new(new_store);
    assert_eq!(new.decrypt(&rotated).unwrap(), sample());
    assert!(old.decrypt(&rotated).is_err());
}

#[test]
fn rotation_refuses_existing_key_file() {
    let dir = tempdir().unwrap();
    let (old, json) = encrypted_sample(dir.path());
    let container = envx_vault::container::parse(json.to_string().as_bytes()).unwrap();

    let taken = dir.path().join("taken.key");
    std::fs::write(&taken, [1u8; 32]).unwrap();
    let err = old
        .rotate_key(&container, &FileKeyStore::new(&taken), &KeyMode::Random)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileExists);
    assert_eq!(std::fs::read(&taken).unwrap(), vec![1u8; 32]);
}

fn secret_sets() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[A-Za-z_][A-Za-z0-9_]{0,15}", any::<String>()), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_secret_set_roundtrips(entries in secret_sets()) {
        let secrets: SecretSet = entries.into_iter().collect();
        let key = [0x5Au8; 32];
        let encrypted = encrypt_all(&secrets, &key).unwrap();
        prop_assert_eq!(encrypted.values.len(), secrets.len());

        let container = Container::from_encrypted(KdfMetadata::None, encrypted, None).unwrap();
        let json = container.to_json_pretty().unwrap();
        let parsed = envx_vault::container::parse(json.as_bytes()).unwrap();
        let decrypted = decrypt_all(parsed.values(), parsed.nonce_map(), &key).unwrap();
        prop_assert_eq!(decrypted, secrets);
    }

    #[test]
    fn any_single_bit_flip_in_a_value_is_rejected(
        value in ".{0,64}",
        byte in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let secrets: SecretSet = [("SECRET", value)].into_iter().collect();
        let key = [0x11u8; 32];
        let mut encrypted = encrypt_all(&secrets, &key).unwrap();

        let mut raw = STANDARD.decode(&encrypted.values["SECRET"]).unwrap();
        let idx = byte.index(raw.len());
        raw[idx] ^= 1 << bit;
        encrypted.values.insert("SECRET".to_string(), STANDARD.encode(raw));

        prop_assert!(decrypt_all(&encrypted.values, &encrypted.nonce_map, &key).is_err());
    }
}

#[test]
fn multiline_and_unicode_values_roundtrip() {
    let secrets: SecretSet = [
        ("CERT", "-----BEGIN-----\nline two\r\nline three\n-----END-----"),
        ("GREETING", "héllo wörld ✓ 日本"),
        ("EMPTY", ""),
    ]
    .into_iter()
    .collect();
    let key = [3u8; 32];
    let encrypted = encrypt_all(&secrets, &key).unwrap();
    let decrypted = decrypt_all(&encrypted.values, &encrypted.nonce_map, &key).unwrap();
    assert_eq!(decrypted, secrets);
}
