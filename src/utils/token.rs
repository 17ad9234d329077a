use rand::RngCore;

/// Generates `len_bytes` of cryptographically random data, hex-encoded.
/// The result is an opaque bearer credential; validity is purely "this value
/// exists on a row in the right state", with no structure or signature.
pub fn generate_step2_token(len_bytes: usize) -> String {
    let mut buf = vec![0u8; len_bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_hex_of_requested_width() {
        let token = generate_step2_token(32);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn consecutive_tokens_differ() {
        assert_ne!(generate_step2_token(16), generate_step2_token(16));
    }
}
