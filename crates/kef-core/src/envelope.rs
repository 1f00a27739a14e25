//! The envelope byte layout and its header codec:
//!
//! `len_id(1) || id(len_id) || version(1) || iterations(3, BE, encoded) ||
//!  iv(iv_size) || ciphertext || exposed_auth?`

use crate::error::KefError;
use crate::version::VersionInfo;

/// Fixed header bytes before the IV: length prefix, at least one ID byte,
/// version, three iteration bytes.
pub const MIN_HEADER: usize = 6;

/// Parsed view of an envelope header. The ID borrows from the input.
#[derive(Debug, Clone, Copy)]
pub struct ParsedHeader<'a> {
    pub id: &'a [u8],
    pub version: u8,
    /// Effective PBKDF2 iteration count (already decoded).
    pub iterations: u32,
    /// Offset of the IV/ciphertext region.
    pub body: usize,
}

/// Pack an iteration count into the 3-byte stored form. Counts that are a
/// multiple of 10000 (up to 10000 multiples) store the quotient; everything
/// else is stored verbatim and must fit in 24 bits.
pub fn encode_iterations(count: u32) -> Result<[u8; 3], KefError> {
    let stored = if count >= 10_000 && count % 10_000 == 0 && count / 10_000 <= 10_000 {
        count / 10_000
    } else {
        count
    };
    if stored >= 1 << 24 {
        return Err(KefError::InvalidArg);
    }
    let be = stored.to_be_bytes();
    Ok([be[1], be[2], be[3]])
}

/// Expand the 3-byte stored form to the effective iteration count.
pub fn decode_iterations(stored: [u8; 3]) -> u32 {
    let s = u32::from_be_bytes([0, stored[0], stored[1], stored[2]]);
    if s <= 10_000 {
        s * 10_000
    } else {
        s
    }
}

/// Parse the envelope header. Only the framing is validated here; version
/// registration is the caller's concern.
pub fn parse_header(envelope: &[u8]) -> Result<ParsedHeader<'_>, KefError> {
    if envelope.len() < MIN_HEADER {
        return Err(KefError::EnvelopeTooShort);
    }
    let len_id = envelope[0] as usize;
    if len_id == 0 {
        return Err(KefError::InvalidArg);
    }
    if envelope.len() < 1 + len_id + 4 {
        return Err(KefError::EnvelopeTooShort);
    }
    let id = &envelope[1..1 + len_id];
    let version = envelope[1 + len_id];
    let stored = [envelope[2 + len_id], envelope[3 + len_id], envelope[4 + len_id]];
    Ok(ParsedHeader {
        id,
        version,
        iterations: decode_iterations(stored),
        body: 5 + len_id,
    })
}

/// Quick shape test: does `data` look like an envelope this build can open?
/// True when the header parses, the version is registered, and enough bytes
/// remain for the IV, a minimum ciphertext, and any cleartext trailer.
pub fn is_envelope(data: &[u8]) -> bool {
    let Ok(header) = parse_header(data) else {
        return false;
    };
    let Some(info) = VersionInfo::lookup(header.version) else {
        return false;
    };
    data.len() - header.body >= info.iv_size + info.min_ciphertext() + info.trailer_size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_vectors() {
        assert_eq!(encode_iterations(100_000).unwrap(), [0x00, 0x00, 0x0A]);
        assert_eq!(decode_iterations([0x00, 0x00, 0x0A]), 100_000);
        assert_eq!(encode_iterations(7).unwrap(), [0x00, 0x00, 0x07]);
        assert_eq!(decode_iterations([0x00, 0x00, 0x07]), 70_000);
        assert_eq!(encode_iterations(10_000).unwrap(), [0x00, 0x00, 0x01]);
        assert_eq!(decode_iterations([0x00, 0x00, 0x01]), 10_000);
    }

    #[test]
    fn iteration_roundtrip_above_compact_floor() {
        for count in [10_000u32, 10_001, 50_000, 123_456, 16_000_000, (1 << 24) - 1] {
            let stored = encode_iterations(count).unwrap();
            assert_eq!(decode_iterations(stored), count, "count {count}");
        }
    }

    #[test]
    fn iteration_compact_form_is_mandatory() {
        // 100000000 = 10000 * 10000 still packs; one step above cannot.
        assert_eq!(encode_iterations(100_000_000).unwrap(), [0x00, 0x27, 0x10]);
        assert_eq!(encode_iterations(100_010_000), Err(KefError::InvalidArg));
        assert_eq!(encode_iterations(1 << 24), Err(KefError::InvalidArg));
    }

    #[test]
    fn header_parses_minimal_envelope() {
        let env = [1, b'x', 0, 0x00, 0x00, 0x07];
        let header = parse_header(&env).unwrap();
        assert_eq!(header.id, b"x");
        assert_eq!(header.version, 0);
        assert_eq!(header.iterations, 70_000);
        assert_eq!(header.body, 6);
    }

    #[test]
    fn header_rejects_malformed_input() {
        assert!(matches!(parse_header(&[]), Err(KefError::EnvelopeTooShort)));
        assert!(matches!(parse_header(&[3, b'a']), Err(KefError::EnvelopeTooShort)));
        assert!(matches!(parse_header(&[0, 1, 2, 3, 4, 5]), Err(KefError::InvalidArg)));
        // ID length runs past the end of the buffer.
        assert!(matches!(parse_header(&[9, b'a', b'b', 0, 0, 0]), Err(KefError::EnvelopeTooShort)));
    }

    #[test]
    fn shape_test_rejects_short_and_unknown() {
        assert!(!is_envelope(&[]));
        assert!(!is_envelope(&[3, b'a', b'b', b'c', 0x02]));
        // Unknown version 2.
        let env = [1, b'x', 2, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!is_envelope(&env));
        // Version 0 (ECB) wants at least one full block of ciphertext.
        let mut env = vec![1, b'x', 0, 0, 0, 1];
        env.extend_from_slice(&[0u8; 15]);
        assert!(!is_envelope(&env));
        env.push(0);
        assert!(is_envelope(&env));
    }
}
