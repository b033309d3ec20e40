//! Stateless cryptographic primitives.
//!
//! Thin wrappers over RustCrypto crates so that the rest of the core never
//! touches cipher or MAC types directly. Backend failures surface as
//! `VaultError::CryptoPrimitiveUnavailable`.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Result, VaultError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES-256 key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// AES block / IV length in bytes.
pub const IV_LENGTH: usize = 16;

/// Fill a fresh buffer from the OS CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf)?;
    Ok(buf)
}

/// Fill `buf` from the OS CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    getrandom::getrandom(buf)
        .map_err(|e| VaultError::CryptoPrimitiveUnavailable(format!("RNG failure: {}", e)))
}

/// Random value in `min..=max`.
pub fn random_range(min: usize, max: usize) -> Result<usize> {
    if max <= min {
        return Ok(min);
    }
    let mut raw = [0u8; 8];
    fill_random(&mut raw)?;
    let span = (max - min + 1) as u64;
    Ok(min + (u64::from_le_bytes(raw) % span) as usize)
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// HMAC-SHA256 of `message` under `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| VaultError::CryptoPrimitiveUnavailable("HMAC init failed".to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time check of `tag` against HMAC-SHA256(key, message).
pub fn hmac_sha256_verify(key: &[u8], message: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| VaultError::CryptoPrimitiveUnavailable("HMAC init failed".to_string()))?;
    mac.update(message);
    Ok(mac.verify_slice(tag).is_ok())
}

/// PBKDF2-HMAC-SHA256 into `out`; the output length sets the derived key size.
pub fn pbkdf2_sha256(passphrase: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, out);
}

/// AES-256-CBC with PKCS7 padding.
pub fn aes256_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv).map_err(|e| {
        VaultError::CryptoPrimitiveUnavailable(format!("AES-CBC init failed: {}", e))
    })?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// AES-256-CBC decrypt; any length or padding problem is `DecryptionFailure`.
pub fn aes256_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| VaultError::DecryptionFailure)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| VaultError::DecryptionFailure)
}

pub fn b64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn b64_decode(data: &str) -> Option<Vec<u8>> {
    STANDARD.decode(data).ok()
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn format_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso8601() -> String {
    format_iso8601(Utc::now())
}
