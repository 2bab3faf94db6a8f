use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// A freshly minted reset token. `plain` goes out by email; only `hash` is stored.
pub struct ResetToken {
    pub plain: String,
    pub hash: String,
}

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let plain: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        let hash = hash_token(&plain);
        Self { plain, hash }
    }
}

pub fn hash_token(plain: &str) -> String {
    format!("{:x}", Sha256::digest(plain.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_is_hex_and_hashed() {
        let token = ResetToken::generate();
        assert_eq!(token.plain.len(), 64);
        assert!(token.plain.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token.hash.len(), 64);
        assert_ne!(token.plain, token.hash);
        assert_eq!(hash_token(&token.plain), token.hash);
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = ResetToken::generate();
        let b = ResetToken::generate();
        assert_ne!(a.plain, b.plain);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
