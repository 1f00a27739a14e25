use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use zeroize::Zeroize;

/// A PBKDF2-derived AES-256 key. Wrapped in `Secret` so it is wiped on drop
/// and never shows up in debug output.
pub struct DerivedKey(Secret<[u8; 32]>);

impl DerivedKey {
    /// PBKDF2-HMAC-SHA256 with the envelope ID as salt, dkLen = 32.
    pub fn derive(password: &[u8], id: &[u8], iterations: u32) -> Self {
        let mut dk = [0u8; 32];
        pbkdf2_hmac::<Sha256>(password, id, iterations, &mut dk);
        let key = DerivedKey(Secret::new(dk));
        dk.zeroize();
        key
    }

    pub(crate) fn expose(&self) -> &[u8; 32] {
        self.0.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn matches_rfc_style_vector() {
        // PBKDF2-HMAC-SHA256("password", "salt", c=1, dkLen=32).
        let key = DerivedKey::derive(b"password", b"salt", 1);
        assert_eq!(
            key.expose(),
            &hex!("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b")
        );
    }

    #[test]
    fn iteration_count_changes_key() {
        let one = DerivedKey::derive(b"pw", b"abc", 1000);
        let two = DerivedKey::derive(b"pw", b"abc", 1001);
        assert_ne!(one.expose(), two.expose());
    }

    #[test]
    fn salt_changes_key() {
        let one = DerivedKey::derive(b"pw", b"abc", 100);
        let two = DerivedKey::derive(b"pw", b"abd", 100);
        assert_ne!(one.expose(), two.expose());
    }
}
