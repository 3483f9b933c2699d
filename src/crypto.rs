// src/crypto.rs

//! Passphrase hashing and table-file encryption
//!
//! This module handles all cryptographic operations:
//! - Salted iterated SHA-256 for the stored passphrase digest
//! - AES key derivation from that digest
//! - The AES-256-CBC envelope wrapped around every table file
//! - Whole-store key rotation when the passphrase changes

use crate::error::{Error, Result};
use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length in bytes of the IV prefixed to every table file
pub const IV_LEN: usize = 16;

/// Installation constant mixed into the stored passphrase digest
pub const STORE_SALT: &str = "q1l0_store_salt";

/// Installation constant mixed into the AES key derivation
pub const KEY_SALT: &str = "q1l0_key_salt";

/// Number of hashing rounds applied to produce a digest
const HASH_ROUNDS: u32 = 10;

/// SHA-256 of `input`, as a 64-char lowercase hex digest
fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Salted iterated hash of `input`
///
/// Round 1 hashes `salt || input || salt`; even rounds hash
/// `salt || previous`, odd rounds hash `previous || salt`, for ten rounds
/// total. Intermediate values are the 64-char hex digests themselves.
pub fn salted_hash(input: &str, salt: &str) -> String {
    let mut current = sha256_hex(&format!("{}{}{}", salt, input, salt));
    for round in 2..=HASH_ROUNDS {
        current = if round % 2 == 0 {
            sha256_hex(&format!("{}{}", salt, current))
        } else {
            sha256_hex(&format!("{}{}", current, salt))
        };
    }
    current
}

/// Derive the 32-byte AES key from the stored passphrase digest
///
/// Takes the key-salt hash of the store-salt digest and keeps its first 32
/// bytes (NUL-padded if ever shorter). Computed once at startup and carried
/// in the session.
pub fn derive_key(store_hash: &str) -> [u8; 32] {
    let key_hash = salted_hash(store_hash, KEY_SALT);
    let mut key = [0u8; 32];
    for (slot, byte) in key.iter_mut().zip(key_hash.bytes()) {
        *slot = byte;
    }
    key
}

/// Encrypt a table's plaintext into its on-disk envelope
///
/// A fresh random 16-byte IV is generated per call; the result is
/// `IV || AES-256-CBC ciphertext` with PKCS#7 padding.
pub fn encrypt(key: &[u8; 32], plaintext: &str) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext =
        Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut envelope = iv.to_vec();
    envelope.extend_from_slice(&ciphertext);
    envelope
}

/// Decrypt an on-disk envelope back into the table's plaintext
///
/// The first 16 bytes are the IV; the remainder is the ciphertext.
pub fn decrypt(key: &[u8; 32], envelope: &[u8]) -> Result<String> {
    if envelope.len() < IV_LEN {
        return Err(Error::Crypto(
            "table file too short to contain an IV".to_string(),
        ));
    }
    let (iv, ciphertext) = envelope.split_at(IV_LEN);
    let iv: [u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| Error::Crypto("malformed IV".to_string()))?;

    let plaintext = Aes256CbcDec::new(key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::Crypto("decryption failed (wrong key or corrupted file)".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::Crypto("decrypted table is not valid UTF-8".to_string()))
}

/// Re-encrypt every table file under `root` from `old_key` to `new_key`
///
/// Walks every database directory and rewrites each `.bin` file with a fresh
/// IV under the new key. Files that fail to decrypt are skipped with a
/// warning; rotation continues over the rest of the store.
pub fn rotate_keys(root: &Path, old_key: &[u8; 32], new_key: &[u8; 32]) -> Result<()> {
    for db_entry in std::fs::read_dir(root)? {
        let db_entry = db_entry?;
        if !db_entry.file_type()?.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(db_entry.path())? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("bin") {
                continue;
            }
            let envelope = std::fs::read(&path)?;
            let plaintext = match decrypt(old_key, &envelope) {
                Ok(text) => text,
                Err(err) => {
                    warn!("Skipping {} during key rotation: {}", path.display(), err);
                    continue;
                }
            };
            crate::storage::write_file_atomic(&path, &encrypt(new_key, &plaintext))?;
            debug!("Rotated {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salted_hash_is_deterministic() {
        let a = salted_hash("hunter2", STORE_SALT);
        let b = salted_hash("hunter2", STORE_SALT);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_salted_hash_depends_on_salt() {
        assert_ne!(
            salted_hash("hunter2", STORE_SALT),
            salted_hash("hunter2", KEY_SALT)
        );
    }

    #[test]
    fn test_derive_key_is_ascii_hex_prefix() {
        let digest = salted_hash("hunter2", STORE_SALT);
        let key = derive_key(&digest);
        // The key is the first 32 bytes of a hex string, so every byte is
        // an ASCII hex character.
        assert!(key.iter().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = derive_key(&salted_hash("pw", STORE_SALT));
        let plaintext = "id(INT)(PRIMARY),name(VARCHAR)\n1,Ada\n";
        let envelope = encrypt(&key, plaintext);
        assert!(envelope.len() > IV_LEN);
        assert_eq!(decrypt(&key, &envelope).unwrap(), plaintext);
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let key = derive_key(&salted_hash("pw", STORE_SALT));
        let a = encrypt(&key, "same text");
        let b = encrypt(&key, "same text");
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = derive_key(&salted_hash("pw", STORE_SALT));
        let other = derive_key(&salted_hash("not-pw", STORE_SALT));
        let envelope = encrypt(&key, "secret");
        // CBC padding makes a wrong key overwhelmingly likely to error;
        // on the off chance padding survives, the text still must differ.
        match decrypt(&other, &envelope) {
            Err(Error::Crypto(_)) => {}
            Ok(text) => assert_ne!(text, "secret"),
            Err(err) => panic!("unexpected error kind: {}", err),
        }
    }

    #[test]
    fn test_truncated_envelope_is_rejected() {
        let key = derive_key(&salted_hash("pw", STORE_SALT));
        let result = decrypt(&key, &[0u8; 7]);
        assert!(matches!(result, Err(Error::Crypto(_))));
    }

    #[test]
    fn test_rotate_keys_reencrypts_tables() {
        let root = tempfile::tempdir().unwrap();
        let db_dir = root.path().join("demo");
        std::fs::create_dir(&db_dir).unwrap();

        let old_key = derive_key(&salted_hash("old", STORE_SALT));
        let new_key = derive_key(&salted_hash("new", STORE_SALT));
        let plaintext = "id(INT)(PRIMARY)\n1\n2\n";
        std::fs::write(db_dir.join("k.bin"), encrypt(&old_key, plaintext)).unwrap();

        rotate_keys(root.path(), &old_key, &new_key).unwrap();

        let rotated = std::fs::read(db_dir.join("k.bin")).unwrap();
        assert_eq!(decrypt(&new_key, &rotated).unwrap(), plaintext);
        assert!(decrypt(&old_key, &rotated).is_err());
    }
}
