use kef_flate::FlateError;
use thiserror::Error;

/// Failure modes of the base32 codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Base32Error {
    #[error("byte {0:#04x} is not in the base32 alphabet")]
    InvalidByte(u8),
    #[error("misplaced padding character")]
    BadPadding,
}

/// Failure modes of the QR transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid argument")]
    InvalidArg,
    #[error("malformed part header")]
    BadHeader,
    #[error("unknown payload encoding")]
    BadEncoding,
    #[error("unknown file type")]
    BadFileType,
    #[error("invalid base-36 counter field")]
    BadBase36,
    #[error("part does not belong to this transfer")]
    Inconsistent,
    #[error("part index {0} was already collected")]
    DuplicateIndex(u16),
    #[error("transfer is missing parts")]
    Incomplete,
    #[error("invalid hex payload")]
    BadHex,
    #[error("invalid base43 payload")]
    BadBase43,
    #[error("{0}")]
    Base32(#[from] Base32Error),
    #[error("payload decompression failed: {0}")]
    Flate(#[from] FlateError),
}
