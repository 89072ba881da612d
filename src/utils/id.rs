use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Hashes a string using Blake3 (16 bytes) and encodes it with base64url (no padding).
/// Returns a stable, compact identifier (~22 characters).
pub fn hash_id(input: &str) -> String {
    let hash = blake3::hash(input.as_bytes());
    let truncated = &hash.as_bytes()[..16];
    URL_SAFE_NO_PAD.encode(truncated)
}

/// Full Blake3 digest of a file's contents, hex encoded.
pub fn file_checksum(path: &camino::Utf8Path) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file = std::fs::File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
