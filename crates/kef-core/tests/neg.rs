use kef_core::{decrypt, encrypt_with_rng, is_envelope, KefError, VERSIONS};
use rand_core::{CryptoRng, RngCore};

struct PatternRng(u8);

impl RngCore for PatternRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            *byte = self.0;
            self.0 = self.0.wrapping_add(1);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for PatternRng {}

fn sample(version: u8) -> Vec<u8> {
    encrypt_with_rng(
        &mut PatternRng(version),
        b"neg",
        version,
        b"hunter2",
        10_001,
        b"a secret worth protecting",
    )
    .unwrap()
}

#[test]
fn precondition_failures() {
    let mut rng = PatternRng(0);
    assert_eq!(
        encrypt_with_rng(&mut rng, b"", 0, b"pw", 10_001, b"x"),
        Err(KefError::InvalidArg)
    );
    assert_eq!(
        encrypt_with_rng(&mut rng, &[b'i'; 256], 0, b"pw", 10_001, b"x"),
        Err(KefError::InvalidArg)
    );
    assert_eq!(
        encrypt_with_rng(&mut rng, b"id", 0, b"pw", 10_001, b""),
        Err(KefError::InvalidArg)
    );
    assert_eq!(
        encrypt_with_rng(&mut rng, b"id", 0, b"pw", 0, b"x"),
        Err(KefError::InvalidArg)
    );
    assert_eq!(
        encrypt_with_rng(&mut rng, b"id", 2, b"pw", 10_001, b"x"),
        Err(KefError::UnsupportedVersion(2))
    );
}

#[test]
fn unknown_version_rejected_on_decrypt() {
    let mut env = sample(0);
    env[4] = 2;
    assert_eq!(decrypt(&env, b"hunter2"), Err(KefError::UnsupportedVersion(2)));
}

#[test]
fn truncation_is_detected_before_key_derivation() {
    let env = sample(20);
    for keep in 0..6 {
        assert_eq!(decrypt(&env[..keep], b"hunter2"), Err(KefError::EnvelopeTooShort));
    }
    // Cut into the IV region: too short for nonce + ciphertext + tag.
    let header = kef_core::parse_header(&env).unwrap();
    assert_eq!(
        decrypt(&env[..header.body + 10], b"hunter2"),
        Err(KefError::EnvelopeTooShort)
    );
}

#[test]
fn every_ciphertext_byte_flip_fails_auth() {
    for version in [0u8, 5, 10, 11, 15, 20] {
        let env = sample(version);
        let header = kef_core::parse_header(&env).unwrap();
        let info = kef_core::VersionInfo::lookup(version).unwrap();
        let body = header.body + info.iv_size;
        for pos in body..env.len() {
            let mut bad = env.clone();
            bad[pos] ^= 0x40;
            let got = decrypt(&bad, b"hunter2");
            assert!(
                matches!(got, Err(KefError::Auth)),
                "version {version} flip at {pos}: {got:?}"
            );
        }
    }
}

#[test]
fn compressed_version_flips_never_yield_plaintext() {
    let env = sample(21);
    let header = kef_core::parse_header(&env).unwrap();
    for pos in header.body + 12..env.len() {
        let mut bad = env.clone();
        bad[pos] ^= 0x01;
        assert!(decrypt(&bad, b"hunter2").is_err(), "flip at {pos}");
    }
}

#[test]
fn iv_tamper_fails_auth() {
    for version in [1u8, 10, 15, 20] {
        let env = sample(version);
        let header = kef_core::parse_header(&env).unwrap();
        let mut bad = env.clone();
        bad[header.body] ^= 0x80;
        assert!(
            matches!(decrypt(&bad, b"hunter2"), Err(KefError::Auth)),
            "version {version}"
        );
    }
}

#[test]
fn id_tamper_changes_the_salt() {
    let mut env = sample(11);
    env[1] = b'N';
    assert_eq!(decrypt(&env, b"hunter2"), Err(KefError::Auth));
}

#[test]
fn ecb_duplicate_blocks_refused() {
    // Version 5 carries the payload without a hidden hash, so two equal
    // 16-byte blocks survive padding verbatim.
    let plaintext = [0x42u8; 32];
    assert_eq!(
        encrypt_with_rng(&mut PatternRng(9), b"dup", 5, b"pw", 10_001, &plaintext),
        Err(KefError::DuplicateBlocks)
    );
}

#[test]
fn ragged_block_ciphertext_rejected() {
    let mut env = sample(11);
    // Grow the ciphertext region by one byte.
    env.insert(env.len() - 4, 0xAA);
    assert_eq!(decrypt(&env, b"hunter2"), Err(KefError::InvalidArg));
}

#[test]
fn envelopes_are_not_interchangeable_across_versions() {
    let plaintext = b"a secret worth protecting".to_vec();
    for info in &VERSIONS {
        let env = sample(info.version);
        assert!(is_envelope(&env));
        // Rewriting the version field must never recover the plaintext.
        for other in &VERSIONS {
            if other.version == info.version {
                continue;
            }
            let mut bad = env.clone();
            bad[4] = other.version;
            assert_ne!(
                decrypt(&bad, b"hunter2"),
                Ok(plaintext.clone()),
                "{} as {}",
                info.version,
                other.version
            );
        }
    }
}
