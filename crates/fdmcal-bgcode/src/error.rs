//! Error types for the binary container.

use thiserror::Error;

/// Errors from writing or reading a binary G-code container.
#[derive(Error, Debug)]
pub enum BgcodeError {
    /// A writer step was called out of sequence.
    #[error("writer out of order: expected {expected}, got {found}")]
    OutOfOrder {
        /// Step the writer was waiting for.
        expected: &'static str,
        /// Step that was attempted.
        found: &'static str,
    },

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// The data does not start with the container magic.
    #[error("not a binary G-code file: bad magic {0:?}")]
    BadMagic([u8; 4]),

    /// Unsupported container version.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    /// The data ended inside a header or block.
    #[error("truncated data at offset {offset}: {what}")]
    Truncated {
        /// Byte offset of the structure being read.
        offset: usize,
        /// What was being read.
        what: &'static str,
    },

    /// Unknown compression tag in a block header.
    #[error("unknown compression type {value} at offset {offset}")]
    UnknownCompression {
        /// Raw tag.
        value: u16,
        /// Block offset.
        offset: usize,
    },

    /// A block failed its checksum.
    #[error("CRC32 mismatch in {block} block at offset {offset}: computed {computed:#010x}, stored {stored:#010x}")]
    ChecksumMismatch {
        /// Block kind.
        block: &'static str,
        /// Block offset.
        offset: usize,
        /// Recomputed checksum.
        computed: u32,
        /// Checksum found in the file.
        stored: u32,
    },

    /// A G-code block uses an encoding this reader cannot decode.
    #[error("unsupported G-code encoding {0}")]
    UnsupportedEncoding(u16),

    /// The container holds no G-code block.
    #[error("no G-code block found")]
    NoGcode,

    /// Decoded text is not UTF-8.
    #[error("invalid UTF-8 in block payload: {0}")]
    Utf8(String),

    /// A payload is too large for the 32-bit size fields.
    #[error("payload too large: {0} bytes")]
    TooLarge(usize),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, BgcodeError>;
