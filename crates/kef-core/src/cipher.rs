//! AES-256 façade for the envelope codec. All operations run in place over
//! caller-provided buffers; modes are selected by the version catalog.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyIvInit, StreamCipher};
use aes::Aes256;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroize;

use crate::auth::tags_match;
use crate::error::KefError;

type CbcEnc = cbc::Encryptor<Aes256>;
type CbcDec = cbc::Decryptor<Aes256>;
type Ctr = ctr::Ctr32BE<Aes256>;

const BLOCK: usize = 16;

fn block_cipher(key: &[u8; 32]) -> Aes256 {
    use aes::cipher::KeyInit;
    Aes256::new(key.into())
}

pub(crate) fn ecb_encrypt(key: &[u8; 32], buf: &mut [u8]) -> Result<(), KefError> {
    if buf.len() % BLOCK != 0 {
        return Err(KefError::Crypto);
    }
    let cipher = block_cipher(key);
    for chunk in buf.chunks_exact_mut(BLOCK) {
        cipher.encrypt_block(aes::Block::from_mut_slice(chunk));
    }
    Ok(())
}

pub(crate) fn ecb_decrypt(key: &[u8; 32], buf: &mut [u8]) -> Result<(), KefError> {
    if buf.len() % BLOCK != 0 {
        return Err(KefError::Crypto);
    }
    let cipher = block_cipher(key);
    for chunk in buf.chunks_exact_mut(BLOCK) {
        cipher.decrypt_block(aes::Block::from_mut_slice(chunk));
    }
    Ok(())
}

pub(crate) fn cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], buf: &mut [u8]) -> Result<(), KefError> {
    let len = buf.len();
    CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|_| KefError::Crypto)?;
    Ok(())
}

pub(crate) fn cbc_decrypt(key: &[u8; 32], iv: &[u8; 16], buf: &mut [u8]) -> Result<(), KefError> {
    CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| KefError::Crypto)?;
    Ok(())
}

/// XOR the AES-CTR keystream over `buf`. The 12-byte nonce is extended with
/// a 32-bit big-endian block counter starting at `counter`.
pub(crate) fn ctr_apply(key: &[u8; 32], nonce: &[u8; 12], counter: u32, buf: &mut [u8]) {
    let mut iv = [0u8; 16];
    iv[..12].copy_from_slice(nonce);
    iv[12..].copy_from_slice(&counter.to_be_bytes());
    Ctr::new(key.into(), (&iv).into()).apply_keystream(buf);
}

/// GCM encrypt in place with empty AAD; returns the full 16-byte tag, which
/// the envelope layer truncates to the catalog's `auth_size`.
pub(crate) fn gcm_seal(key: &[u8; 32], nonce: &[u8; 12], buf: &mut [u8]) -> Result<[u8; 16], KefError> {
    use aes_gcm::aead::KeyInit;
    let cipher = Aes256Gcm::new(key.into());
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), &[], buf)
        .map_err(|_| KefError::Crypto)?;
    Ok(tag.into())
}

/// GCM decrypt against a truncated tag. The ciphertext is unwound with the
/// GCM counter stream (block counter 2), then the full tag is recomputed
/// over the recovered plaintext and compared to `tag` in constant time. On
/// mismatch the buffer is wiped before returning `Auth`.
pub(crate) fn gcm_open(key: &[u8; 32], nonce: &[u8; 12], buf: &mut [u8], tag: &[u8]) -> Result<(), KefError> {
    ctr_apply(key, nonce, 2, buf);
    let mut scratch = buf.to_vec();
    let full = gcm_seal(key, nonce, &mut scratch)?;
    scratch.zeroize();
    if !tags_match(&full[..tag.len().min(full.len())], tag) {
        buf.zeroize();
        return Err(KefError::Auth);
    }
    Ok(())
}
