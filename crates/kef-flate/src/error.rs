use thiserror::Error;

/// Failure modes of the DEFLATE codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlateError {
    /// The stream violates RFC 1951/1950 framing or Huffman coding.
    #[error("corrupt deflate stream")]
    Data,
    /// The output did not fit the caller's buffer budget.
    #[error("output buffer exhausted")]
    Buf,
    /// The expansion ceiling was reached before the stream ended.
    #[error("decompressed data exceeds the allocation ceiling")]
    Mem,
}
