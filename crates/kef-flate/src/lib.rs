//! Raw DEFLATE (RFC 1951) and zlib (RFC 1950) codecs.
//!
//! The decompressor handles all three block types (stored, fixed Huffman,
//! dynamic Huffman). The compressor emits a single fixed-Huffman block with
//! longest-match LZ77 over a configurable history window, which is what the
//! QR transport and envelope layers expect on the wire.

mod deflate;
mod error;
mod inflate;
mod zlib;

pub use deflate::{deflate_raw, DEFAULT_WBITS, MAX_WBITS, MIN_WBITS};
pub use error::FlateError;
pub use inflate::{inflate_raw_alloc, inflate_raw_into, MAX_INFLATE};
pub use zlib::{adler32, compress, looks_like_zlib, uncompress};
