//! Single-file dataset archive.
//!
//! ```text
//! [superblock][CBOR manifest][chunk table][column chunks...][tail]
//! ```
//!
//! One chunk per column, raw little-endian 8-byte words, zstd compressed when
//! that saves at least `min_gain`. The tail carries blake3 sums of the
//! manifest, the chunk table and the stored data.

pub mod chunktab;
pub mod codec;
pub mod manifest;
pub mod reader;
pub mod superblock;
pub mod tail;
pub mod writer;

pub use reader::{ArchiveSummary, VerifyReport, inspect, load_dataset, verify};
pub use writer::{SaveOptions, save_dataset};
