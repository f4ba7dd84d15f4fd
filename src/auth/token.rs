use rand::RngCore;
use sha2::{Digest, Sha256};

/// Raw key size in bytes; the hex-encoded key is twice as long.
const TOKEN_BYTES: usize = 20;

pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Generate a new opaque bearer key. Returns `(raw_key, sha256_hex)`; only the
/// hash is ever persisted.
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let key = hex::encode(bytes);
    let hash = hash_token(&key);
    (key, hash)
}

/// Compute SHA-256 hash of a raw token string, returned as lowercase hex.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn is_well_formed(key: &str) -> bool {
    key.len() == TOKEN_LENGTH && key.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Pull the key out of an `Authorization` header value. Both `Token <key>`
/// and `Bearer <key>` are accepted.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let key = key.trim();
    is_well_formed(key).then_some(key)
}
