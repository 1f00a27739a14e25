use thiserror::Error;

/// Failure modes of the envelope codec. Nothing is retried internally; every
/// error surfaces to the caller with sensitive buffers already wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KefError {
    #[error("invalid argument")]
    InvalidArg,
    #[error("unrecognized envelope version {0}")]
    UnsupportedVersion(u8),
    #[error("allocation limit exceeded")]
    Alloc,
    #[error("cipher failure")]
    Crypto,
    #[error("authentication failed")]
    Auth,
    #[error("compression failed")]
    Compress,
    #[error("decompression failed")]
    Decompress,
    #[error("envelope too short")]
    EnvelopeTooShort,
    #[error("plaintext produces repeated cipher blocks under ECB")]
    DuplicateBlocks,
}
