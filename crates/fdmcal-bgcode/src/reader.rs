//! Container reader and verifier.
//!
//! Structural damage (bad magic, truncation, unknown compression) fails the
//! whole parse. A checksum mismatch only marks the affected block invalid;
//! the walk continues because block sizes come from the header.

use tracing::warn;

use crate::block::{
    crc32, inflate, read_u16, read_u32, BlockHeader, BlockType, Compression, CHECKSUM_LEN,
    ENCODING_INI, FILE_HEADER_LEN, MAGIC, VERSION,
};
use crate::error::{BgcodeError, Result};
use crate::writer::Metadata;

/// One block as found in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Byte offset of the block header.
    pub offset: usize,
    /// Decoded header.
    pub header: BlockHeader,
    /// Parameter bytes.
    pub params: Vec<u8>,
    /// Payload as stored.
    pub payload: Vec<u8>,
    /// Checksum stored after the payload.
    pub stored_crc: u32,
    /// Checksum recomputed over header, parameters and payload.
    pub computed_crc: u32,
}

impl Block {
    /// Known block type, if the tag is recognised.
    pub fn block_type(&self) -> Option<BlockType> {
        BlockType::from_u16(self.header.block_type)
    }

    /// Whether the stored checksum matches.
    pub fn is_valid(&self) -> bool {
        self.stored_crc == self.computed_crc
    }

    fn name(&self) -> &'static str {
        self.block_type().map_or("unknown", BlockType::as_str)
    }

    fn verify(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(BgcodeError::ChecksumMismatch {
                block: self.name(),
                offset: self.offset,
                computed: self.computed_crc,
                stored: self.stored_crc,
            })
        }
    }

    /// Payload after decompression. The checksum is verified first.
    pub fn decoded_payload(&self) -> Result<Vec<u8>> {
        self.verify()?;
        match self.header.compression {
            Compression::None => Ok(self.payload.clone()),
            Compression::Deflate => inflate(&self.payload),
            other => Err(BgcodeError::Compression(format!(
                "{other:?} payloads are not supported"
            ))),
        }
    }

    /// Payload as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        let encoding = read_u16(&self.params, 0, "block parameters")?;
        if encoding != ENCODING_INI {
            return Err(BgcodeError::UnsupportedEncoding(encoding));
        }
        String::from_utf8(self.decoded_payload()?).map_err(|e| BgcodeError::Utf8(e.to_string()))
    }
}

/// A parsed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgcodeFile {
    /// Container version.
    pub version: u32,
    /// Checksum type tag.
    pub checksum_type: u16,
    /// Blocks in file order.
    pub blocks: Vec<Block>,
}

impl BgcodeFile {
    /// Walk every block in `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HEADER_LEN {
            return Err(BgcodeError::Truncated {
                offset: 0,
                what: "file header",
            });
        }
        let magic = [data[0], data[1], data[2], data[3]];
        if magic != MAGIC {
            return Err(BgcodeError::BadMagic(magic));
        }
        let version = read_u32(data, 4, "file header")?;
        if version != VERSION {
            return Err(BgcodeError::UnsupportedVersion(version));
        }
        let checksum_type = read_u16(data, 8, "file header")?;

        let mut blocks = Vec::new();
        let mut pos = FILE_HEADER_LEN;
        while pos < data.len() {
            let block = read_block(data, pos)?;
            if !block.is_valid() {
                warn!(
                    block = block.name(),
                    offset = pos,
                    computed = block.computed_crc,
                    stored = block.stored_crc,
                    "block checksum mismatch"
                );
            }
            pos += block.header.encoded_len() + block.params.len() + block.payload.len() + CHECKSUM_LEN;
            blocks.push(block);
        }

        Ok(Self {
            version,
            checksum_type,
            blocks,
        })
    }

    /// Whether every block passed its checksum.
    pub fn is_valid(&self) -> bool {
        self.blocks.iter().all(Block::is_valid)
    }

    /// Blocks that failed their checksum.
    pub fn invalid_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.is_valid())
    }

    fn first(&self, block_type: BlockType) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.block_type() == Some(block_type))
    }

    /// Decoded metadata of the first block of `block_type`.
    pub fn metadata(&self, block_type: BlockType) -> Result<Option<Metadata>> {
        self.first(block_type)
            .map(|b| b.text().map(|t| Metadata::from_ini(&t)))
            .transpose()
    }

    /// Concatenated text of all G-code blocks.
    ///
    /// Fails if any G-code block is corrupt.
    pub fn gcode(&self) -> Result<String> {
        let mut found = false;
        let mut text = String::new();
        for block in self
            .blocks
            .iter()
            .filter(|b| b.block_type() == Some(BlockType::GCode))
        {
            found = true;
            text.push_str(&block.text()?);
        }
        if found {
            Ok(text)
        } else {
            Err(BgcodeError::NoGcode)
        }
    }
}

fn read_block(data: &[u8], offset: usize) -> Result<Block> {
    let header = BlockHeader::decode(data, offset)?;
    let params_len = BlockType::from_u16(header.block_type).map_or(2, BlockType::params_len);
    let params_start = offset + header.encoded_len();
    let payload_start = params_start + params_len;
    let payload_end = payload_start + header.compressed_size as usize;
    let stored_crc = read_u32(data, payload_end, "block payload")?;
    let computed_crc = crc32(&[&data[offset..payload_end]]);
    Ok(Block {
        offset,
        header,
        params: data[params_start..payload_start].to_vec(),
        payload: data[payload_start..payload_end].to_vec(),
        stored_crc,
        computed_crc,
    })
}

/// Extract the G-code text from container bytes.
pub fn to_ascii(data: &[u8]) -> Result<String> {
    BgcodeFile::parse(data)?.gcode()
}
