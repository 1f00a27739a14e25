use std::io::{BufRead, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use kef_core::EnvelopeStore;

mod store;
use store::FsStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "KEF: envelope encryption and chunked QR transfers for signing-device secrets")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encrypt a file into a KEF envelope (passphrase from KEF_PASSPHRASE)
    Encrypt {
        #[arg(long)]
        input: String,
        #[arg(long)]
        output: String,
        /// Envelope identifier, also the KDF salt
        #[arg(long)]
        id: String,
        /// Envelope version from the catalog
        #[arg(long, default_value_t = 20)]
        version: u8,
        /// Requested PBKDF2 iteration count
        #[arg(long, default_value_t = 100_000)]
        iterations: u32,
        /// Write base64 text instead of raw bytes (for removable storage)
        #[arg(long)]
        base64: bool,
    },
    /// Decrypt a KEF envelope back to plaintext
    Decrypt {
        #[arg(long)]
        input: String,
        #[arg(long)]
        output: String,
        /// Input is base64 text
        #[arg(long)]
        base64: bool,
    },
    /// Show envelope header fields without decrypting
    Inspect {
        /// Input .kef file
        input: String,
    },
    /// Manage a directory of .kef envelopes
    Vault {
        /// Vault directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[command(subcommand)]
        action: VaultAction,
    },
    /// Split a file into BBQr frames, one per line on stdout
    QrSplit {
        #[arg(long)]
        input: String,
        /// P (PSBT), T (transaction), J (JSON) or U (text)
        #[arg(long, default_value = "P")]
        file_type: String,
        /// Character budget per frame
        #[arg(long, default_value_t = 200)]
        cap: usize,
    },
    /// Reassemble BBQr frames (one per line, any order) into the payload
    QrJoin {
        /// File of frames; "-" reads stdin
        #[arg(long, default_value = "-")]
        input: String,
        #[arg(long)]
        output: String,
    },
    /// Report what kind of secret a scanned payload looks like
    Classify {
        input: String,
    },
}

#[derive(Subcommand, Debug)]
enum VaultAction {
    /// List envelope IDs
    List,
    /// Remove one envelope
    Delete { id: String },
    /// Remove every envelope
    Wipe,
}

fn passphrase() -> Result<Vec<u8>> {
    std::env::var("KEF_PASSPHRASE")
        .map(String::into_bytes)
        .context("set KEF_PASSPHRASE in the environment")
}

fn read_envelope(path: &str, b64: bool) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).with_context(|| format!("cannot read {path}"))?;
    if b64 {
        let text: Vec<u8> = raw.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
        general_purpose::STANDARD.decode(&text).context("invalid base64 envelope")
    } else {
        Ok(raw)
    }
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    let dir = match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).with_context(|| format!("cannot write {path}"))?;
    Ok(())
}

fn parse_file_type(text: &str) -> Result<kef_qr::FileType> {
    match text.to_ascii_uppercase().as_str() {
        "P" => Ok(kef_qr::FileType::Psbt),
        "T" => Ok(kef_qr::FileType::Txn),
        "J" => Ok(kef_qr::FileType::Json),
        "U" => Ok(kef_qr::FileType::Unicode),
        other => bail!("unknown file type '{other}' (expected P, T, J or U)"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Encrypt { input, output, id, version, iterations, base64: b64 } => {
            let plaintext = std::fs::read(&input).with_context(|| format!("cannot read {input}"))?;
            let envelope =
                kef_core::encrypt(id.as_bytes(), version, &passphrase()?, iterations, &plaintext)?;
            if b64 {
                write_output(&output, general_purpose::STANDARD.encode(&envelope).as_bytes())?;
            } else {
                write_output(&output, &envelope)?;
            }
            eprintln!("sealed {} -> {} ({} bytes)", input, output, envelope.len());
        }
        Cmd::Decrypt { input, output, base64: b64 } => {
            let envelope = read_envelope(&input, b64)?;
            let plaintext = kef_core::decrypt(&envelope, &passphrase()?)?;
            write_output(&output, &plaintext)?;
            eprintln!("opened {} -> {} ({} bytes)", input, output, plaintext.len());
        }
        Cmd::Inspect { input } => {
            let envelope = std::fs::read(&input)?;
            let header = kef_core::parse_header(&envelope)?;
            let info = kef_core::VersionInfo::lookup(header.version)
                .with_context(|| format!("unregistered version {}", header.version))?;
            println!("File: {}", input);
            println!("ID: {} ({})", String::from_utf8_lossy(header.id), hex::encode(header.id));
            println!("Version: {} ({})", header.version, info.as_str());
            println!("KDF: PBKDF2-HMAC-SHA256, {} iterations", header.iterations);
            println!("IV size: {}", info.iv_size);
            println!("Compressed: {}", if info.compress { "yes" } else { "no" });
            println!("Auth: {:?} ({} bytes)", info.auth, info.auth_size);
            let body = envelope.len() - header.body;
            let ciphertext = body.saturating_sub(info.iv_size + info.trailer_size());
            println!("Body: {} bytes ({} ciphertext)", body, ciphertext);
            println!("Well-formed: {}", kef_core::is_envelope(&envelope));
        }
        Cmd::Vault { dir, action } => {
            let mut vault = FsStore::open(dir)?;
            match action {
                VaultAction::List => {
                    for id in vault.list()? {
                        println!("{id}");
                    }
                }
                VaultAction::Delete { id } => {
                    if vault.delete(&id)? {
                        println!("deleted {id}");
                    } else {
                        bail!("no envelope named '{id}'");
                    }
                }
                VaultAction::Wipe => {
                    vault.wipe()?;
                    println!("vault wiped");
                }
            }
        }
        Cmd::QrSplit { input, file_type, cap } => {
            let data = std::fs::read(&input).with_context(|| format!("cannot read {input}"))?;
            let parts = kef_qr::encode_parts(&data, parse_file_type(&file_type)?, cap)?;
            eprintln!("{} frames of <= {} chars", parts.len(), cap);
            for part in parts {
                println!("{part}");
            }
        }
        Cmd::QrJoin { input, output } => {
            let mut text = String::new();
            if input == "-" {
                std::io::stdin().read_to_string(&mut text)?;
            } else {
                text = std::fs::read_to_string(&input)?;
            }
            let mut asm = kef_qr::Assembler::new();
            for line in text.as_bytes().lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                asm.insert_str(line.trim())?;
            }
            if !asm.is_complete() {
                bail!("transfer incomplete; missing indices {:?}", asm.missing());
            }
            let payload = asm.assemble()?;
            write_output(&output, &payload)?;
            eprintln!("assembled {} bytes -> {}", payload.len(), output);
        }
        Cmd::Classify { input } => {
            let data = std::fs::read(&input)?;
            let hint = match kef_qr::classify(&data) {
                kef_qr::ScanHint::CompactEntropy => "compact entropy",
                kef_qr::ScanHint::SeedQr => "seedqr digit run",
                kef_qr::ScanHint::Mnemonic => "plain mnemonic",
                kef_qr::ScanHint::Unknown => "unknown",
            };
            println!("{hint}");
        }
    }
    Ok(())
}
