//! Storage key generation and recovery.
//!
//! Keys have the shape `<epoch-millis>-<32 hex chars>.<ext>` and are the last
//! path segment of the public URL the media store hands out, which is how a
//! draft's `media_url` is mapped back to its object.

use chrono::Utc;

/// Number of random bytes mixed into every generated key.
pub const RANDOM_SUFFIX_BYTES: usize = 16;

/// Generate a fresh storage key for an uploaded file called `original`.
pub fn generate_storage_key(original: &str) -> String {
    let random: [u8; RANDOM_SUFFIX_BYTES] = rand::random();
    storage_key_from_parts(Utc::now().timestamp_millis(), &random, original)
}

/// Build a storage key from an explicit timestamp and random suffix.
pub fn storage_key_from_parts(
    epoch_millis: i64,
    random: &[u8; RANDOM_SUFFIX_BYTES],
    original: &str,
) -> String {
    format!(
        "{}-{}.{}",
        epoch_millis,
        hex::encode(random),
        file_extension(original)
    )
}

/// Extension of `original`: everything after the last `.`, restricted to
/// ASCII alphanumerics. Empty when the name has no dot.
pub fn file_extension(original: &str) -> String {
    original
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Recover the storage key from a public media URL.
///
/// Drops any query string or fragment, then takes the final path segment.
pub fn key_from_url(url: &str) -> Option<&str> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    match path.rsplit('/').next() {
        Some(key) if !key.is_empty() => Some(key),
        _ => None,
    }
}
