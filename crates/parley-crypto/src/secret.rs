use sha2::{Digest, Sha256};

/// Derive the conversation secret for a pair of users.
///
/// The two usernames are ordered lexicographically before hashing, so both
/// participants compute the identical secret no matter which side they pass
/// first. The result is the lowercase hex SHA-256 of `"{first}-{second}"`.
pub fn derive_shared_secret(user_a: &str, user_b: &str) -> String {
    let (first, second) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };

    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(b"-");
    hasher.update(second.as_bytes());
    hex::encode(hasher.finalize())
}
