//! Block framing shared by the writer and the reader.
//!
//! Every block is laid out as
//!
//! ```text
//! type u16 | compression u16 | uncompressed_size u32 | [compressed_size u32]
//! parameters
//! payload
//! crc32 u32   (over header, parameters and payload)
//! ```
//!
//! All integers are little-endian. The compressed size is present only when
//! the compression tag is not `None`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{BgcodeError, Result};

/// File magic.
pub const MAGIC: [u8; 4] = *b"GCDE";
/// Container version written by this crate.
pub const VERSION: u32 = 1;
/// Checksum type tag for CRC32.
pub const CHECKSUM_CRC32: u16 = 1;
/// Length of the file header (magic, version, checksum type).
pub const FILE_HEADER_LEN: usize = 10;
/// Length of the trailing checksum.
pub const CHECKSUM_LEN: usize = 4;
/// Parameter tag for INI metadata and raw G-code text.
pub const ENCODING_INI: u16 = 0;
/// DEFLATE level used for compressed payloads.
pub const DEFLATE_LEVEL: u32 = 6;

/// Block type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// File-level metadata.
    FileMetadata,
    /// G-code payload.
    GCode,
    /// Slicer metadata.
    SlicerMetadata,
    /// Printer metadata.
    PrinterMetadata,
    /// Print metadata.
    PrintMetadata,
    /// Thumbnail image.
    Thumbnail,
}

impl BlockType {
    /// Wire value.
    pub fn to_u16(self) -> u16 {
        match self {
            BlockType::FileMetadata => 0,
            BlockType::GCode => 1,
            BlockType::SlicerMetadata => 2,
            BlockType::PrinterMetadata => 3,
            BlockType::PrintMetadata => 4,
            BlockType::Thumbnail => 5,
        }
    }

    /// Parse a wire value.
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => BlockType::FileMetadata,
            1 => BlockType::GCode,
            2 => BlockType::SlicerMetadata,
            3 => BlockType::PrinterMetadata,
            4 => BlockType::PrintMetadata,
            5 => BlockType::Thumbnail,
            _ => return None,
        })
    }

    /// Length of the parameter section for this block type.
    pub fn params_len(self) -> usize {
        match self {
            // format, width, height
            BlockType::Thumbnail => 6,
            _ => 2,
        }
    }

    /// Display name.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::FileMetadata => "file metadata",
            BlockType::GCode => "G-code",
            BlockType::SlicerMetadata => "slicer metadata",
            BlockType::PrinterMetadata => "printer metadata",
            BlockType::PrintMetadata => "print metadata",
            BlockType::Thumbnail => "thumbnail",
        }
    }
}

/// Payload compression tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Stored as-is.
    None,
    /// zlib-wrapped DEFLATE.
    #[default]
    Deflate,
    /// Heatshrink, window 11, lookahead 4. Recognised but not decoded.
    Heatshrink11,
    /// Heatshrink, window 12, lookahead 4. Recognised but not decoded.
    Heatshrink12,
}

impl Compression {
    /// Wire value.
    pub fn to_u16(self) -> u16 {
        match self {
            Compression::None => 0,
            Compression::Deflate => 1,
            Compression::Heatshrink11 => 2,
            Compression::Heatshrink12 => 3,
        }
    }

    /// Parse a wire value.
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Compression::None,
            1 => Compression::Deflate,
            2 => Compression::Heatshrink11,
            3 => Compression::Heatshrink12,
            _ => return None,
        })
    }
}

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Raw block type tag.
    pub block_type: u16,
    /// Payload compression.
    pub compression: Compression,
    /// Payload size before compression.
    pub uncompressed_size: u32,
    /// Payload size as stored.
    pub compressed_size: u32,
}

impl BlockHeader {
    /// Encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        if self.compression == Compression::None {
            8
        } else {
            12
        }
    }

    /// Append the header bytes to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.block_type.to_le_bytes());
        out.extend_from_slice(&self.compression.to_u16().to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        if self.compression != Compression::None {
            out.extend_from_slice(&self.compressed_size.to_le_bytes());
        }
    }

    /// Decode a header starting at `offset`.
    pub fn decode(data: &[u8], offset: usize) -> Result<Self> {
        let block_type = read_u16(data, offset, "block header")?;
        let tag = read_u16(data, offset + 2, "block header")?;
        let uncompressed_size = read_u32(data, offset + 4, "block header")?;
        let compression = Compression::from_u16(tag)
            .ok_or(BgcodeError::UnknownCompression { value: tag, offset })?;
        let compressed_size = if compression == Compression::None {
            uncompressed_size
        } else {
            read_u32(data, offset + 8, "block header")?
        };
        Ok(Self {
            block_type,
            compression,
            uncompressed_size,
            compressed_size,
        })
    }
}

/// CRC32 over a sequence of byte slices.
pub fn crc32(parts: &[&[u8]]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

/// zlib-wrapped DEFLATE at [`DEFLATE_LEVEL`].
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::new(DEFLATE_LEVEL));
    encoder
        .write_all(data)
        .map_err(|e| BgcodeError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| BgcodeError::Compression(e.to_string()))
}

/// Inverse of [`deflate`].
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| BgcodeError::Compression(e.to_string()))?;
    Ok(out)
}

fn size_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| BgcodeError::TooLarge(len))
}

/// Frame one block: header, parameters, payload and checksum.
///
/// Only `None` and `Deflate` can be written.
pub fn encode_block(
    block_type: BlockType,
    params: &[u8],
    data: &[u8],
    compression: Compression,
) -> Result<Vec<u8>> {
    let payload = match compression {
        Compression::None => data.to_vec(),
        Compression::Deflate => deflate(data)?,
        other => {
            return Err(BgcodeError::Compression(format!(
                "cannot write {other:?} payloads"
            )))
        }
    };
    let header = BlockHeader {
        block_type: block_type.to_u16(),
        compression,
        uncompressed_size: size_u32(data.len())?,
        compressed_size: size_u32(payload.len())?,
    };

    let mut out =
        Vec::with_capacity(header.encoded_len() + params.len() + payload.len() + CHECKSUM_LEN);
    header.encode(&mut out);
    out.extend_from_slice(params);
    out.extend_from_slice(&payload);
    let checksum = crc32(&[out.as_slice()]);
    out.extend_from_slice(&checksum.to_le_bytes());
    Ok(out)
}

/// The 10-byte file header.
pub fn file_header() -> Vec<u8> {
    let mut out = Vec::with_capacity(FILE_HEADER_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&CHECKSUM_CRC32.to_le_bytes());
    out
}

pub(crate) fn read_u16(data: &[u8], offset: usize, what: &'static str) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(BgcodeError::Truncated { offset, what })
}

pub(crate) fn read_u32(data: &[u8], offset: usize, what: &'static str) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(BgcodeError::Truncated { offset, what })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_header() {
        let h = file_header();
        assert_eq!(h, b"GCDE\x01\x00\x00\x00\x01\x00");
        assert_eq!(h.len(), FILE_HEADER_LEN);
    }

    #[test]
    fn test_uncompressed_block_layout() {
        let block = encode_block(
            BlockType::PrinterMetadata,
            &ENCODING_INI.to_le_bytes(),
            b"a=1\n",
            Compression::None,
        )
        .unwrap();
        // 8 header + 2 params + 4 payload + 4 crc
        assert_eq!(block.len(), 18);
        assert_eq!(&block[0..2], &[3, 0]);
        assert_eq!(&block[2..4], &[0, 0]);
        assert_eq!(&block[4..8], &[4, 0, 0, 0]);
        assert_eq!(&block[10..14], b"a=1\n");
        let stored = u32::from_le_bytes([block[14], block[15], block[16], block[17]]);
        assert_eq!(stored, crc32(&[&block[..14]]));
    }

    #[test]
    fn test_deflate_block_header() {
        let text = "G1 X1 Y1\n".repeat(100);
        let block = encode_block(
            BlockType::GCode,
            &ENCODING_INI.to_le_bytes(),
            text.as_bytes(),
            Compression::Deflate,
        )
        .unwrap();
        let header = BlockHeader::decode(&block, 0).unwrap();
        assert_eq!(header.block_type, 1);
        assert_eq!(header.compression, Compression::Deflate);
        assert_eq!(header.uncompressed_size as usize, text.len());
        assert_eq!(header.encoded_len(), 12);
        assert!((header.compressed_size as usize) < text.len());
        // zlib stream header
        assert_eq!(block[14], 0x78);
    }

    #[test]
    fn test_deflate_inflate() {
        let data = b"M900 K0.02\nG1 X10 E0.5\n".repeat(20);
        assert_eq!(inflate(&deflate(&data).unwrap()).unwrap(), data);
        assert!(inflate(b"not zlib").is_err());
    }

    #[test]
    fn test_crc_parts() {
        assert_eq!(crc32(&[&b"123"[..], &b"456789"[..]]), crc32(&[&b"123456789"[..]]));
        // standard check value
        assert_eq!(crc32(&[&b"123456789"[..]]), 0xCBF4_3926);
    }

    #[test]
    fn test_heatshrink_not_writable() {
        let err = encode_block(BlockType::GCode, &[0, 0], b"x", Compression::Heatshrink11);
        assert!(matches!(err, Err(BgcodeError::Compression(_))));
    }

    #[test]
    fn test_tags() {
        for v in 0..6 {
            assert_eq!(BlockType::from_u16(v).unwrap().to_u16(), v);
        }
        assert!(BlockType::from_u16(6).is_none());
        assert_eq!(BlockType::Thumbnail.params_len(), 6);
        assert_eq!(BlockType::GCode.params_len(), 2);
        assert!(Compression::from_u16(4).is_none());
    }

    #[test]
    fn test_truncated_header() {
        let err = BlockHeader::decode(&[1, 0, 1, 0, 5, 0, 0, 0, 1], 0);
        assert!(matches!(err, Err(BgcodeError::Truncated { .. })));
    }
}
