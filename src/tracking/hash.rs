//! PII normalization and hashing per Meta's customer-information matching
//! rules: lowercase, trimmed, whitespace-stripped SHA-256, lowercase hex.

use sha2::{Digest, Sha256};

/// Hashes a user-data field. Returns `None` for missing, empty or
/// whitespace-only input; callers treat `None` as "field omitted".
pub fn hash_field(value: Option<&str>) -> Option<String> {
    let normalized: String = value?
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if normalized.is_empty() {
        return None;
    }
    Some(hex::encode(Sha256::digest(normalized.as_bytes())))
}

/// Hashes a phone number: every non-digit is stripped before hashing, so
/// "+54 9 11 1234-5678" and "5491112345678" match.
pub fn hash_phone(value: Option<&str>) -> Option<String> {
    let digits: String = value?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(hex::encode(Sha256::digest(digits.as_bytes())))
}
