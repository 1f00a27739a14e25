use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Authenticator for the Hidden style: SHA-256 of the working payload. The
/// first `auth_size` bytes travel inside the padded (and therefore
/// encrypted) region.
pub(crate) fn hidden_tag(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Authenticator for the Exposed style: SHA-256 over
/// `version(1) || iv || data || key`, appended after the ciphertext in
/// clear. The derived key is part of the preimage.
pub(crate) fn exposed_tag(version: u8, iv: &[u8], data: &[u8], key: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(iv);
    hasher.update(data);
    hasher.update(key);
    hasher.finalize().into()
}

/// Constant-time comparison for truncated authenticators.
pub(crate) fn tags_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
