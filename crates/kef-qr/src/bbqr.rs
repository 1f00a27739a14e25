//! BBQr part codec: `B$` + encoding + file type + two base-36 counters in
//! an 8-character ASCII header, then the payload slice.

use crate::base32;
use crate::error::TransportError;

/// Header length in ASCII characters.
pub const HEADER_LEN: usize = 8;
/// Largest representable part count (`ZZ` in base-36).
pub const MAX_PARTS: u16 = 1295;

/// Payload encoding marker (header character 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Uppercase hex. Accepted on receive only.
    Hex,
    /// RFC 4648 base32 of the raw payload.
    Base32,
    /// Base32 of the raw-DEFLATE-compressed payload.
    Zlib,
}

impl Encoding {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_uppercase() {
            b'H' => Some(Encoding::Hex),
            b'2' => Some(Encoding::Base32),
            b'Z' => Some(Encoding::Zlib),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Encoding::Hex => 'H',
            Encoding::Base32 => '2',
            Encoding::Zlib => 'Z',
        }
    }
}

/// Transported object kind (header character 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Psbt,
    Txn,
    Json,
    Unicode,
}

impl FileType {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte.to_ascii_uppercase() {
            b'P' => Some(FileType::Psbt),
            b'T' => Some(FileType::Txn),
            b'J' => Some(FileType::Json),
            b'U' => Some(FileType::Unicode),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            FileType::Psbt => 'P',
            FileType::Txn => 'T',
            FileType::Json => 'J',
            FileType::Unicode => 'U',
        }
    }
}

fn base36_digit(byte: u8) -> Result<u16, TransportError> {
    match byte.to_ascii_uppercase() {
        b'0'..=b'9' => Ok((byte - b'0') as u16),
        upper @ b'A'..=b'Z' => Ok((upper - b'A') as u16 + 10),
        _ => Err(TransportError::BadBase36),
    }
}

fn base36_pair(hi: u8, lo: u8) -> Result<u16, TransportError> {
    Ok(base36_digit(hi)? * 36 + base36_digit(lo)?)
}

fn base36_string(value: u16) -> [u8; 2] {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    [DIGITS[(value / 36) as usize], DIGITS[(value % 36) as usize]]
}

/// One frame of a transfer. The payload borrows from the scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part<'a> {
    pub encoding: Encoding,
    pub file_type: FileType,
    pub total: u16,
    pub index: u16,
    pub payload: &'a [u8],
}

impl<'a> Part<'a> {
    /// Parse a scanned frame. The header characters are case-folded; the
    /// payload is returned as-is.
    pub fn parse(data: &'a [u8]) -> Result<Self, TransportError> {
        if data.len() < HEADER_LEN || &data[..2] != b"B$" {
            return Err(TransportError::BadHeader);
        }
        let encoding = Encoding::from_byte(data[2]).ok_or(TransportError::BadEncoding)?;
        let file_type = FileType::from_byte(data[3]).ok_or(TransportError::BadFileType)?;
        let total = base36_pair(data[4], data[5])?;
        let index = base36_pair(data[6], data[7])?;
        if total == 0 || index >= total {
            return Err(TransportError::BadHeader);
        }
        Ok(Part { encoding, file_type, total, index, payload: &data[HEADER_LEN..] })
    }
}

/// Decode one assembled payload according to its encoding marker.
pub fn decode_payload(encoding: Encoding, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    match encoding {
        Encoding::Hex => {
            if payload.len() % 2 != 0 {
                return Err(TransportError::BadHex);
            }
            hex::decode(payload).map_err(|_| TransportError::BadHex)
        }
        Encoding::Base32 => Ok(base32::decode(payload)?),
        Encoding::Zlib => {
            let raw = base32::decode(payload)?;
            // Some senders wrap the stream in a zlib header; accept both.
            if kef_flate::looks_like_zlib(&raw) {
                if let Ok(out) = kef_flate::uncompress(&raw) {
                    return Ok(out);
                }
            }
            Ok(kef_flate::inflate_raw_alloc(&raw)?)
        }
    }
}

/// Split `data` into QR frames no longer than `cap` characters each
/// (`cap >= 16`). Compression is attempted first; the smaller rendering
/// wins. Every non-final part carries a multiple of 8 base32 characters so
/// parts decode independently of how they are concatenated.
pub fn encode_parts(
    data: &[u8],
    file_type: FileType,
    cap: usize,
) -> Result<Vec<String>, TransportError> {
    if data.is_empty() || cap < 2 * HEADER_LEN {
        return Err(TransportError::InvalidArg);
    }
    let packed = kef_flate::deflate_raw(data, kef_flate::DEFAULT_WBITS)?;
    let (encoding, body) = if packed.len() < data.len() {
        (Encoding::Zlib, base32::encode(&packed))
    } else {
        (Encoding::Base32, base32::encode(data))
    };

    // Two-step split: estimate the part count against the full budget, then
    // redistribute evenly and round the per-part payload up to the base32
    // block size (never past the budget).
    let avail = cap - HEADER_LEN;
    let estimated_parts = body.len().div_ceil(avail);
    let mut per_part = body.len().div_ceil(estimated_parts);
    per_part = per_part.div_ceil(8) * 8;
    per_part = per_part.min(avail - avail % 8);

    let total = body.len().div_ceil(per_part);
    if total > MAX_PARTS as usize {
        return Err(TransportError::InvalidArg);
    }
    let total_b36 = base36_string(total as u16);
    let mut parts = Vec::with_capacity(total);
    for index in 0..total {
        // The body is pure ASCII, so byte ranges are char ranges.
        let chunk = &body[index * per_part..((index + 1) * per_part).min(body.len())];
        let index_b36 = base36_string(index as u16);
        let mut frame = String::with_capacity(HEADER_LEN + chunk.len());
        frame.push_str("B$");
        frame.push(encoding.as_char());
        frame.push(file_type.as_char());
        frame.push(total_b36[0] as char);
        frame.push(total_b36[1] as char);
        frame.push(index_b36[0] as char);
        frame.push(index_b36[1] as char);
        frame.push_str(chunk);
        parts.push(frame);
    }
    Ok(parts)
}
