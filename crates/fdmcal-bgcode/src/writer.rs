//! Binary container writer.
//!
//! The writer has a single path: file header, printer metadata, print
//! metadata, G-code, done. Each step must be taken once and in that order;
//! anything else is a [`BgcodeError::OutOfOrder`].

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::block::{encode_block, file_header, BlockType, Compression, ENCODING_INI};
use crate::error::{BgcodeError, Result};

/// Ordered `key=value` metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Append an entry.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.push((key.into(), value.to_string()));
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// INI text, one `key=value` line per entry.
    pub fn to_ini(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }

    /// Parse INI text; lines without `=` are ignored.
    pub fn from_ini(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }
}

/// Writer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing written yet.
    FileHeader,
    /// Waiting for printer metadata.
    PrinterMetadata,
    /// Waiting for print metadata.
    PrintMetadata,
    /// Waiting for the G-code block.
    GCode,
    /// Complete.
    Done,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::FileHeader => "file header",
            Stage::PrinterMetadata => "printer metadata",
            Stage::PrintMetadata => "print metadata",
            Stage::GCode => "G-code",
            Stage::Done => "finish",
        }
    }

    fn next(self) -> Self {
        match self {
            Stage::FileHeader => Stage::PrinterMetadata,
            Stage::PrinterMetadata => Stage::PrintMetadata,
            Stage::PrintMetadata => Stage::GCode,
            Stage::GCode | Stage::Done => Stage::Done,
        }
    }
}

/// Staged in-memory container writer.
#[derive(Debug)]
pub struct BgcodeWriter {
    buffer: Vec<u8>,
    stage: Stage,
    compression: Compression,
}

impl Default for BgcodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BgcodeWriter {
    /// Writer that DEFLATE-compresses the G-code block.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            stage: Stage::FileHeader,
            compression: Compression::Deflate,
        }
    }

    /// Choose the G-code block compression (`None` or `Deflate`).
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn check_stage(&self, step: Stage) -> Result<()> {
        if self.stage != step {
            return Err(BgcodeError::OutOfOrder {
                expected: self.stage.as_str(),
                found: step.as_str(),
            });
        }
        Ok(())
    }

    /// Append an encoded step. The stage only moves once the bytes are in.
    fn commit(&mut self, step: Stage, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.stage = step.next();
    }

    /// Write the file header.
    pub fn write_header(&mut self) -> Result<&mut Self> {
        self.check_stage(Stage::FileHeader)?;
        self.commit(Stage::FileHeader, &file_header());
        Ok(self)
    }

    /// Write the printer metadata block.
    pub fn write_printer_metadata(&mut self, metadata: &Metadata) -> Result<&mut Self> {
        self.check_stage(Stage::PrinterMetadata)?;
        let block = metadata_block(BlockType::PrinterMetadata, metadata)?;
        self.commit(Stage::PrinterMetadata, &block);
        Ok(self)
    }

    /// Write the print metadata block.
    pub fn write_print_metadata(&mut self, metadata: &Metadata) -> Result<&mut Self> {
        self.check_stage(Stage::PrintMetadata)?;
        let block = metadata_block(BlockType::PrintMetadata, metadata)?;
        self.commit(Stage::PrintMetadata, &block);
        Ok(self)
    }

    /// Write the G-code block.
    pub fn write_gcode(&mut self, gcode: &str) -> Result<&mut Self> {
        self.check_stage(Stage::GCode)?;
        let block = encode_block(
            BlockType::GCode,
            &ENCODING_INI.to_le_bytes(),
            gcode.as_bytes(),
            self.compression,
        )?;
        debug!(
            text_bytes = gcode.len(),
            block_bytes = block.len(),
            compression = ?self.compression,
            "G-code block encoded"
        );
        self.commit(Stage::GCode, &block);
        Ok(self)
    }

    /// Take the finished container.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.stage != Stage::Done {
            return Err(BgcodeError::OutOfOrder {
                expected: self.stage.as_str(),
                found: Stage::Done.as_str(),
            });
        }
        Ok(self.buffer)
    }
}

fn metadata_block(block_type: BlockType, metadata: &Metadata) -> Result<Vec<u8>> {
    let block = encode_block(
        block_type,
        &ENCODING_INI.to_le_bytes(),
        metadata.to_ini().as_bytes(),
        Compression::None,
    )?;
    debug!(block = block_type.as_str(), bytes = block.len(), "metadata block encoded");
    Ok(block)
}

/// A finished command stream plus its metadata, ready to serialise.
#[derive(Debug, Clone, Default)]
pub struct Container {
    /// Printer metadata entries.
    pub printer: Metadata,
    /// Print metadata entries.
    pub print: Metadata,
    /// G-code text.
    pub gcode: String,
    /// Compression of the G-code block.
    pub compression: Compression,
}

impl Container {
    /// Container around `gcode` with empty metadata.
    pub fn new(gcode: impl Into<String>) -> Self {
        Self {
            gcode: gcode.into(),
            ..Default::default()
        }
    }

    /// Serialise to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = BgcodeWriter::new().with_compression(self.compression);
        writer
            .write_header()?
            .write_printer_metadata(&self.printer)?
            .write_print_metadata(&self.print)?
            .write_gcode(&self.gcode)?;
        writer.finish()
    }

    /// Serialise into `out`, returning the byte count.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<usize> {
        let bytes = self.to_bytes()?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(bytes.len())
    }

    /// Write to `path` atomically, returning the byte count.
    ///
    /// The bytes go to a temporary file in the same directory which is
    /// renamed over `path` only once fully written.
    pub fn write_file(&self, path: &Path) -> Result<usize> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        Ok(bytes.len())
    }
}

/// Write `bytes` to `path` through a temporary sibling file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| BgcodeError::IoError(e.error))?;
    debug!(path = %path.display(), bytes = bytes.len(), "container written");
    Ok(())
}
