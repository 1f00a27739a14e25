//! Base43 over the QR alphanumeric subset `0-9A-Z$*+-./:`, as used by
//! Electrum-style single-frame transaction QR codes. The payload is treated
//! as one big-endian integer; leading zero bytes are carried as leading `0`
//! symbols.

use crate::error::TransportError;

const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ$*+-./:";

fn value(byte: u8) -> Result<u32, TransportError> {
    ALPHABET
        .iter()
        .position(|&c| c == byte)
        .map(|p| p as u32)
        .ok_or(TransportError::BadBase43)
}

/// Encode bytes as base43 text.
pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();
    let mut num = data[zeros..].to_vec();
    let mut digits = Vec::new();
    let mut start = 0;
    while start < num.len() {
        let mut rem: u32 = 0;
        for byte in num[start..].iter_mut() {
            let acc = rem * 256 + *byte as u32;
            *byte = (acc / 43) as u8;
            rem = acc % 43;
        }
        digits.push(rem as u8);
        while start < num.len() && num[start] == 0 {
            start += 1;
        }
    }
    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('0');
    }
    for &digit in digits.iter().rev() {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

/// Decode base43 text back to bytes, restoring leading zero bytes.
pub fn decode(text: &[u8]) -> Result<Vec<u8>, TransportError> {
    let zeros = text.iter().take_while(|&&b| b == b'0').count();
    let mut num: Vec<u8> = Vec::new();
    for &byte in text {
        let mut carry = value(byte)?;
        for limb in num.iter_mut().rev() {
            let acc = *limb as u32 * 43 + carry;
            *limb = (acc & 0xFF) as u8;
            carry = acc >> 8;
        }
        while carry > 0 {
            num.insert(0, (carry & 0xFF) as u8);
            carry >>= 8;
        }
    }
    let mut out = vec![0u8; zeros];
    out.extend_from_slice(&num);
    Ok(out)
}
