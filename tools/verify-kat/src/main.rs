use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct Kat {
    iterations: Vec<IterationKat>,
    base32: Vec<TextBytesKat>,
    base43_roundtrip: Vec<String>,
    adler32: Vec<AdlerKat>,
    deflate: Vec<DeflateKat>,
    envelope: EnvelopeKat,
    bbqr: BbqrKat,
}

#[derive(Deserialize)]
struct IterationKat {
    requested: u32,
    stored_hex: String,
    effective: u32,
}

#[derive(Deserialize)]
struct TextBytesKat {
    text: String,
    bytes_utf8: String,
}

#[derive(Deserialize)]
struct AdlerKat {
    text: String,
    value_hex: String,
}

#[derive(Deserialize)]
struct DeflateKat {
    input_utf8: String,
    raw_hex: String,
}

#[derive(Deserialize)]
struct EnvelopeKat {
    id: String,
    password: String,
    version: u8,
    iterations: u32,
    plaintext_utf8: String,
    first_byte: u8,
    version_offset: usize,
}

#[derive(Deserialize)]
struct BbqrKat {
    payload_hex: String,
    file_type: String,
    cap: usize,
    parts: usize,
}

fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "tools/verify-kat/kat.json".into());
    let data = std::fs::read_to_string(&path)?;
    let kat: Kat = serde_json::from_str(&data)?;

    for vector in &kat.iterations {
        let stored = kef_core::encode_iterations(vector.requested)
            .map_err(|e| anyhow::anyhow!("encode_iterations: {e}"))?;
        if hex::encode(stored) != vector.stored_hex {
            bail!("iteration encoding mismatch for {}", vector.requested);
        }
        if kef_core::decode_iterations(stored) != vector.effective {
            bail!("iteration decoding mismatch for {}", vector.requested);
        }
    }

    for vector in &kat.base32 {
        if kef_qr::base32::decode(vector.text.as_bytes())? != vector.bytes_utf8.as_bytes() {
            bail!("base32 decode mismatch for {}", vector.text);
        }
    }

    for text in &kat.base43_roundtrip {
        let bytes = kef_qr::base43::decode(text.as_bytes())?;
        if kef_qr::base43::encode(&bytes) != *text {
            bail!("base43 roundtrip mismatch for {text}");
        }
    }

    for vector in &kat.adler32 {
        let got = kef_flate::adler32(vector.text.as_bytes());
        if format!("{got:08x}") != vector.value_hex {
            bail!("adler32 mismatch for {}", vector.text);
        }
    }

    for vector in &kat.deflate {
        let packed = kef_flate::deflate_raw(vector.input_utf8.as_bytes(), kef_flate::DEFAULT_WBITS)?;
        if hex::encode(&packed) != vector.raw_hex {
            bail!("deflate mismatch for {}", vector.input_utf8);
        }
        if kef_flate::inflate_raw_alloc(&packed)? != vector.input_utf8.as_bytes() {
            bail!("inflate mismatch for {}", vector.input_utf8);
        }
    }

    let env = &kat.envelope;
    let sealed = kef_core::encrypt(
        env.id.as_bytes(),
        env.version,
        env.password.as_bytes(),
        env.iterations,
        env.plaintext_utf8.as_bytes(),
    )?;
    if sealed[0] != env.first_byte || sealed[env.version_offset] != env.version {
        bail!("envelope header mismatch");
    }
    if !kef_core::is_envelope(&sealed) {
        bail!("envelope failed the shape test");
    }
    if kef_core::decrypt(&sealed, env.password.as_bytes())? != env.plaintext_utf8.as_bytes() {
        bail!("envelope roundtrip mismatch");
    }

    let payload = hex::decode(&kat.bbqr.payload_hex)?;
    let file_type = match kat.bbqr.file_type.as_str() {
        "P" => kef_qr::FileType::Psbt,
        "T" => kef_qr::FileType::Txn,
        "J" => kef_qr::FileType::Json,
        "U" => kef_qr::FileType::Unicode,
        other => bail!("bad file type {other}"),
    };
    let frames = kef_qr::encode_parts(&payload, file_type, kat.bbqr.cap)?;
    if frames.len() != kat.bbqr.parts {
        bail!("bbqr split produced {} parts, expected {}", frames.len(), kat.bbqr.parts);
    }
    let mut asm = kef_qr::Assembler::new();
    for frame in frames.iter().rev() {
        asm.insert_str(frame)?;
    }
    if asm.assemble()? != payload {
        bail!("bbqr reassembly mismatch");
    }

    println!("KAT OK");
    Ok(())
}
