//! KEF: the versioned envelope format protecting signing-device secrets at
//! rest. An envelope binds an identifier, a version row from the static
//! catalog, a PBKDF2 work factor, and the AES-256 ciphertext with its
//! authenticator into one self-describing byte string.
//!
//! Every call is self-contained over caller-provided buffers; there is no
//! shared mutable state and no retry logic. Key material and intermediate
//! plaintext are wiped on every exit path.

pub mod envelope;
pub mod store;
pub mod version;

mod auth;
mod cipher;
mod error;
mod kdf;

use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

pub use envelope::{decode_iterations, encode_iterations, is_envelope, parse_header, ParsedHeader};
pub use error::KefError;
pub use kdf::DerivedKey;
pub use store::{EnvelopeStore, MemoryStore};
pub use version::{AuthKind, Mode, Padding, VersionInfo, VERSIONS};

/// Encrypt `plaintext` into a fresh envelope using the platform CSPRNG.
pub fn encrypt(
    id: &[u8],
    version: u8,
    password: &[u8],
    iterations: u32,
    plaintext: &[u8],
) -> Result<Vec<u8>, KefError> {
    encrypt_with_rng(&mut OsRng, id, version, password, iterations, plaintext)
}

/// Encrypt with an injected randomness source. Hosts without an OS entropy
/// pool route their hardware RNG through this entry point.
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    id: &[u8],
    version: u8,
    password: &[u8],
    iterations: u32,
    plaintext: &[u8],
) -> Result<Vec<u8>, KefError> {
    if id.is_empty() || id.len() > 255 || plaintext.is_empty() || iterations == 0 {
        return Err(KefError::InvalidArg);
    }
    let info =
        version::VersionInfo::lookup(version).ok_or(KefError::UnsupportedVersion(version))?;

    // 1) Stored iteration form first; the decoded (effective) count feeds
    //    the KDF so the envelope is self-consistent.
    let stored = envelope::encode_iterations(iterations)?;
    let key = DerivedKey::derive(password, id, envelope::decode_iterations(stored));

    // 2) Fresh IV of the row's width.
    let mut iv = [0u8; 16];
    rng.fill_bytes(&mut iv[..info.iv_size]);
    let mut nonce = [0u8; 12];
    if info.iv_size == 12 {
        nonce.copy_from_slice(&iv[..12]);
    }

    // 3) Optional compression of the working buffer.
    let mut working = Zeroizing::new(plaintext.to_vec());
    if info.compress {
        let packed = kef_flate::deflate_raw(&working, kef_flate::DEFAULT_WBITS)
            .map_err(|_| KefError::Compress)?;
        working = Zeroizing::new(packed);
    }

    // 4) Hidden authenticator rides inside the padded region.
    if info.auth == AuthKind::Hidden {
        let mut tag = auth::hidden_tag(&working);
        working.extend_from_slice(&tag[..info.auth_size]);
        tag.zeroize();
    }

    // 5) Padding per the version row.
    pad(&mut working, info.padding);

    // 6) ECB leaks equality of blocks; refuse such payloads outright.
    if info.mode == Mode::Ecb && has_duplicate_blocks(&working) {
        return Err(KefError::DuplicateBlocks);
    }

    // 7) Encrypt. GCM also produces the cleartext trailer.
    let mut trailer: Option<Vec<u8>> = None;
    match info.mode {
        Mode::Ecb => cipher::ecb_encrypt(key.expose(), &mut working)?,
        Mode::Cbc => cipher::cbc_encrypt(key.expose(), &iv, &mut working)?,
        Mode::Ctr => cipher::ctr_apply(key.expose(), &nonce, 0, &mut working),
        Mode::Gcm => {
            let tag = cipher::gcm_seal(key.expose(), &nonce, &mut working)?;
            trailer = Some(tag[..info.auth_size].to_vec());
        }
    }

    // 8) Exposed authenticator over the pre-compression data.
    if info.auth == AuthKind::Exposed {
        let tag = auth::exposed_tag(version, &iv[..info.iv_size], plaintext, key.expose());
        trailer = Some(tag[..info.auth_size].to_vec());
    }

    // 9) Assemble the envelope.
    let mut out = Vec::with_capacity(
        5 + id.len() + info.iv_size + working.len() + info.trailer_size(),
    );
    out.push(id.len() as u8);
    out.extend_from_slice(id);
    out.push(version);
    out.extend_from_slice(&stored);
    out.extend_from_slice(&iv[..info.iv_size]);
    out.extend_from_slice(&working);
    if let Some(tag) = trailer {
        out.extend_from_slice(&tag);
    }
    Ok(out)
}

/// Open an envelope with the given password, returning the plaintext as a
/// fresh owned buffer.
pub fn decrypt(envelope_bytes: &[u8], password: &[u8]) -> Result<Vec<u8>, KefError> {
    // 1) Header and section offsets. Sizes are checked before anything is
    //    allocated or derived.
    let header = envelope::parse_header(envelope_bytes)?;
    let info = version::VersionInfo::lookup(header.version)
        .ok_or(KefError::UnsupportedVersion(header.version))?;
    let tail = &envelope_bytes[header.body..];
    if tail.len() < info.iv_size + info.min_ciphertext() + info.trailer_size() {
        return Err(KefError::EnvelopeTooShort);
    }
    let iv = &tail[..info.iv_size];
    let ct_end = tail.len() - info.trailer_size();
    let ciphertext = &tail[info.iv_size..ct_end];
    let trailer = &tail[ct_end..];
    if matches!(info.mode, Mode::Ecb | Mode::Cbc) && ciphertext.len() % 16 != 0 {
        return Err(KefError::InvalidArg);
    }

    // 2) Key from the password and the envelope's own ID and work factor.
    let key = DerivedKey::derive(password, header.id, header.iterations);

    // 3) Raw decrypt into a scratch buffer. GCM verifies its tag here.
    let mut data = Zeroizing::new(ciphertext.to_vec());
    let mut nonce = [0u8; 12];
    if info.iv_size == 12 {
        nonce.copy_from_slice(iv);
    }
    let mut iv16 = [0u8; 16];
    if info.iv_size == 16 {
        iv16.copy_from_slice(iv);
    }
    match info.mode {
        Mode::Ecb => cipher::ecb_decrypt(key.expose(), &mut data)?,
        Mode::Cbc => cipher::cbc_decrypt(key.expose(), &iv16, &mut data)?,
        Mode::Ctr => cipher::ctr_apply(key.expose(), &nonce, 0, &mut data),
        Mode::Gcm => cipher::gcm_open(key.expose(), &nonce, &mut data, trailer)?,
    }

    // 4) Undo padding and check the authenticator.
    let payload = match (info.padding, info.auth) {
        (Padding::None, AuthKind::Gcm) => data,
        (Padding::NulZero, AuthKind::Hidden) => strip_nul_hidden(&data, info.auth_size)?,
        (Padding::NulZero, AuthKind::Exposed) => {
            strip_nul_exposed(&data, info.auth_size, header.version, iv, trailer, &key)?
        }
        (Padding::Pkcs7, AuthKind::Hidden) => {
            let inner = pkcs7_unpad(&data)?;
            split_hidden(inner, info.auth_size)?
        }
        (Padding::None, AuthKind::Hidden) => split_hidden(&data, info.auth_size)?,
        // The catalog admits no other combination.
        _ => return Err(KefError::Crypto),
    };

    // 5) Optional decompression.
    if info.compress {
        kef_flate::inflate_raw_alloc(&payload).map_err(|e| match e {
            kef_flate::FlateError::Mem => KefError::Alloc,
            _ => KefError::Decompress,
        })
    } else {
        Ok(payload.to_vec())
    }
}

/// Apply the version row's padding to the working buffer.
fn pad(buf: &mut Vec<u8>, padding: Padding) {
    match padding {
        Padding::NulZero => {
            if buf.is_empty() {
                buf.resize(16, 0);
            } else if buf.len() % 16 != 0 {
                let target = (buf.len() / 16 + 1) * 16;
                buf.resize(target, 0);
            }
        }
        Padding::Pkcs7 => {
            let n = 16 - buf.len() % 16;
            buf.resize(buf.len() + n, n as u8);
        }
        Padding::None => {}
    }
}

fn has_duplicate_blocks(buf: &[u8]) -> bool {
    let mut seen = std::collections::HashSet::new();
    buf.chunks_exact(16).any(|block| !seen.insert(block))
}

/// Hidden auth under zero padding: strip trailing zeros, then restore up to
/// `auth_size` of them until a candidate's trailing hash matches.
fn strip_nul_hidden(data: &[u8], auth_size: usize) -> Result<Zeroizing<Vec<u8>>, KefError> {
    let stripped = data.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    for restored in 0..=auth_size {
        let len = stripped + restored;
        if len > data.len() {
            break;
        }
        if len < auth_size {
            continue;
        }
        let (payload, tag) = data[..len].split_at(len - auth_size);
        if auth::tags_match(&auth::hidden_tag(payload)[..auth_size], tag) {
            return Ok(Zeroizing::new(payload.to_vec()));
        }
    }
    Err(KefError::Auth)
}

/// Exposed auth under zero padding: candidates regrow stripped zeros until
/// the trailer formula over (version, iv, candidate, key) matches.
fn strip_nul_exposed(
    data: &[u8],
    auth_size: usize,
    version: u8,
    iv: &[u8],
    trailer: &[u8],
    key: &DerivedKey,
) -> Result<Zeroizing<Vec<u8>>, KefError> {
    let stripped = data.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    for restored in 0..=auth_size {
        let len = stripped + restored;
        if len > data.len() {
            break;
        }
        let candidate = &data[..len];
        if auth::tags_match(&auth::exposed_tag(version, iv, candidate, key.expose())[..auth_size], trailer)
        {
            return Ok(Zeroizing::new(candidate.to_vec()));
        }
    }
    Err(KefError::Auth)
}

/// Split a hidden authenticator off the end and verify it.
fn split_hidden(data: &[u8], auth_size: usize) -> Result<Zeroizing<Vec<u8>>, KefError> {
    if data.len() < auth_size {
        return Err(KefError::Auth);
    }
    let (payload, tag) = data.split_at(data.len() - auth_size);
    if auth::tags_match(&auth::hidden_tag(payload)[..auth_size], tag) {
        Ok(Zeroizing::new(payload.to_vec()))
    } else {
        Err(KefError::Auth)
    }
}

fn pkcs7_unpad(data: &[u8]) -> Result<&[u8], KefError> {
    let n = *data.last().ok_or(KefError::Auth)? as usize;
    if n == 0 || n > 16 || n > data.len() {
        return Err(KefError::Auth);
    }
    if !data[data.len() - n..].iter().all(|&b| b == n as u8) {
        return Err(KefError::Auth);
    }
    Ok(&data[..data.len() - n])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_padding_shapes() {
        let mut buf = Vec::new();
        pad(&mut buf, Padding::NulZero);
        assert_eq!(buf, vec![0u8; 16]);

        let mut buf = vec![1u8; 16];
        pad(&mut buf, Padding::NulZero);
        assert_eq!(buf.len(), 16);

        let mut buf = vec![1u8; 17];
        pad(&mut buf, Padding::NulZero);
        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[17..], &[0u8; 15]);
    }

    #[test]
    fn pkcs7_padding_always_extends() {
        let mut buf = vec![1u8; 16];
        pad(&mut buf, Padding::Pkcs7);
        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[16..], &[16u8; 16]);
        assert_eq!(pkcs7_unpad(&buf).unwrap().len(), 16);

        let mut buf = vec![1u8; 13];
        pad(&mut buf, Padding::Pkcs7);
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[13..], &[3u8; 3]);
        assert_eq!(pkcs7_unpad(&buf).unwrap(), &[1u8; 13]);
    }

    #[test]
    fn pkcs7_unpad_rejects_garbage() {
        assert_eq!(pkcs7_unpad(&[]), Err(KefError::Auth));
        assert_eq!(pkcs7_unpad(&[1, 1, 0]), Err(KefError::Auth));
        assert_eq!(pkcs7_unpad(&[1, 2, 3, 17]), Err(KefError::Auth));
        assert_eq!(pkcs7_unpad(&[9, 9, 3, 3]), Err(KefError::Auth));
    }

    #[test]
    fn duplicate_block_detection() {
        let mut buf = vec![7u8; 32];
        assert!(has_duplicate_blocks(&buf));
        buf[17] = 8;
        assert!(!has_duplicate_blocks(&buf));
        assert!(!has_duplicate_blocks(&[0u8; 16]));
    }
}
