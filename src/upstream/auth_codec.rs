//! Per-request message authentication for the upstream process endpoint.
//!
//! The signed record is `{"staticData", "requestId", "blazeId"}` serialized as
//! compact JSON in exactly that field order. It is XOR-ed against a 16-byte MD5
//! keystream of `random ‖ KEYSTREAM_SECRET` (repeated cyclically), prefixed with
//! the random bytes, and signed with `MD5(SIGNING_SECRET ‖ authData)`.

use base64::{Engine, engine::general_purpose::STANDARD};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::constants::auth::{
    AUTH_TYPE, KEYSTREAM_SECRET, RANDOM_PREFIX_LEN, SIGNING_SECRET, STATIC_MARKER,
};
use crate::error::AppError;

/// Authentication triple attached to every authenticated envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAuth {
    pub auth_data: String,
    pub auth_code: String,
    pub auth_type: u32,
}

/// The record that gets encrypted into `authData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    #[serde(rename = "staticData")]
    pub static_data: String,
    #[serde(rename = "requestId")]
    pub request_id: u32,
    #[serde(rename = "blazeId")]
    pub blaze_id: i64,
}

/// Computes the auth triple with fresh random bytes.
pub fn compute(account_id: i64, request_counter: u32) -> Result<MessageAuth, AppError> {
    let random: [u8; RANDOM_PREFIX_LEN] = rand::random();
    compute_with_random(random, account_id, request_counter)
}

/// Deterministic form of [`compute`] for a caller-supplied random prefix.
pub fn compute_with_random(
    random: [u8; RANDOM_PREFIX_LEN],
    account_id: i64,
    request_counter: u32,
) -> Result<MessageAuth, AppError> {
    let record = AuthRecord {
        static_data: STATIC_MARKER.to_string(),
        request_id: request_counter,
        blaze_id: account_id,
    };
    let plain = serde_json::to_vec(&record)?;
    let keystream = derive_keystream(&random);

    let mut auth_data = Vec::with_capacity(RANDOM_PREFIX_LEN + plain.len());
    auth_data.extend_from_slice(&random);
    auth_data.extend(apply_keystream(&plain, &keystream));

    Ok(MessageAuth {
        auth_code: sign_bytes(&auth_data),
        auth_data: STANDARD.encode(&auth_data),
        auth_type: AUTH_TYPE,
    })
}

/// Recomputes `authCode` for a captured base64 `authData`.
pub fn sign_auth_data(auth_data: &str) -> Result<String, AppError> {
    let bytes = decode_base64(auth_data)?;
    Ok(sign_bytes(&bytes))
}

/// Reverses the keystream and returns the record carried by `authData`.
pub fn decode_auth_data(auth_data: &str) -> Result<AuthRecord, AppError> {
    let bytes = decode_base64(auth_data)?;
    if bytes.len() <= RANDOM_PREFIX_LEN {
        return Err(AppError::account_error(
            "Auth data is shorter than its random prefix",
            Some(auth_data.to_string()),
        ));
    }
    let (random, cipher) = bytes.split_at(RANDOM_PREFIX_LEN);
    let keystream = derive_keystream(random);
    let plain = apply_keystream(cipher, &keystream);
    Ok(serde_json::from_slice(&plain)?)
}

fn derive_keystream(random: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(random);
    hasher.update(KEYSTREAM_SECRET);
    let digest = hasher.finalize();
    let mut keystream = [0u8; 16];
    keystream.copy_from_slice(&digest);
    keystream
}

fn apply_keystream(input: &[u8], keystream: &[u8; 16]) -> Vec<u8> {
    input
        .iter()
        .zip(keystream.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

fn sign_bytes(auth_data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(SIGNING_SECRET);
    hasher.update(auth_data);
    STANDARD.encode(hasher.finalize())
}

fn decode_base64(value: &str) -> Result<Vec<u8>, AppError> {
    STANDARD.decode(value).map_err(|e| {
        AppError::account_error(
            format!("Auth data is not valid base64: {e}"),
            Some(value.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOM: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

    #[test]
    fn test_compute_is_deterministic_for_fixed_random() {
        let first = compute_with_random(RANDOM, 1_000_123_456, 7).unwrap();
        let second = compute_with_random(RANDOM, 1_000_123_456, 7).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.auth_type, 17_039_361);
    }

    #[test]
    fn test_auth_code_recomputes_from_captured_auth_data() {
        let auth = compute_with_random(RANDOM, 42, 3).unwrap();
        assert_eq!(sign_auth_data(&auth.auth_data).unwrap(), auth.auth_code);
    }

    #[test]
    fn test_auth_data_layout() {
        let auth = compute_with_random(RANDOM, 42, 3).unwrap();
        let bytes = STANDARD.decode(&auth.auth_data).unwrap();

        let plain = br#"{"staticData":"05e6a7ead5584ab4","requestId":3,"blazeId":42}"#;
        assert_eq!(&bytes[..4], &RANDOM);
        assert_eq!(bytes.len(), 4 + plain.len());

        // First ciphertext byte is the first plaintext byte XOR keystream[0]
        let keystream = derive_keystream(&RANDOM);
        assert_eq!(bytes[4], plain[0] ^ keystream[0]);
        // Keystream wraps after 16 bytes
        assert_eq!(bytes[4 + 16], plain[16] ^ keystream[0]);
    }

    #[test]
    fn test_decode_recovers_record() {
        let auth = compute_with_random(RANDOM, 987_654_321, 12).unwrap();
        let record = decode_auth_data(&auth.auth_data).unwrap();
        assert_eq!(record.static_data, STATIC_MARKER);
        assert_eq!(record.request_id, 12);
        assert_eq!(record.blaze_id, 987_654_321);
    }

    #[test]
    fn test_different_random_changes_output() {
        let a = compute_with_random(RANDOM, 42, 3).unwrap();
        let b = compute_with_random([1, 2, 3, 4], 42, 3).unwrap();
        assert_ne!(a.auth_data, b.auth_data);
        assert_ne!(a.auth_code, b.auth_code);
    }

    #[test]
    fn test_tampered_auth_data_changes_signature() {
        let auth = compute_with_random(RANDOM, 42, 3).unwrap();
        let mut bytes = STANDARD.decode(&auth.auth_data).unwrap();
        bytes[6] ^= 0x01;
        let tampered = STANDARD.encode(&bytes);
        assert_ne!(sign_auth_data(&tampered).unwrap(), auth.auth_code);
    }

    #[test]
    fn test_invalid_base64_is_account_error() {
        let error = decode_auth_data("not base64!!").unwrap_err();
        assert!(error.is_account_error());
    }
}
