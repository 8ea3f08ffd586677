#![warn(missing_docs)]

//! Binary G-code container for fdmcal.
//!
//! This crate provides:
//! - Block framing with per-block CRC32
//! - A staged writer (header, printer metadata, print metadata, G-code)
//! - Atomic file output
//! - A reader that verifies every block and decodes the G-code text
//!
//! # Example
//!
//! ```ignore
//! use fdmcal_bgcode::{BgcodeFile, Container, Metadata};
//!
//! let mut container = Container::new(gcode_text);
//! container.printer = Metadata::new().with("printer_model", "COREONE");
//! container.write_file("pa.bgcode".as_ref())?;
//!
//! let file = BgcodeFile::parse(&std::fs::read("pa.bgcode")?)?;
//! assert!(file.is_valid());
//! ```

pub mod block;
pub mod error;
pub mod reader;
pub mod writer;

pub use block::{BlockHeader, BlockType, Compression};
pub use error::{BgcodeError, Result};
pub use reader::{to_ascii, BgcodeFile, Block};
pub use writer::{write_atomic, BgcodeWriter, Container, Metadata, Stage};
