//! Streaming ZIP decoding.
//!
//! ## Architecture
//!
//! An archive is read front to back, one record at a time, without ever
//! seeking:
//!
//! - [`structures`]: record layouts, signatures and entry metadata
//! - `parser`, `extra`, `time`: local file headers and their extra fields
//! - `bounded`, `pipeline`: per-entry stack of bounded view, decompressor
//!   and CRC check
//! - `registry`: compression method table and pooled inflate state
//! - `directory`: skipping the central directory at the end of an archive
//! - [`ZipStreamReader`]: the state machine tying them together
//! - [`ZipExtractor`]: writing entries out as they stream past
//!
//! ## Streaming caveats
//!
//! The central directory is authoritative in the format but arrives last.
//! Everything here is taken from local headers instead, which is what makes
//! reading a pipe possible, and also why entries written with a data
//! descriptor only learn their CRC and sizes once they have been read.
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - Only STORED and DEFLATE are built in; other methods can be registered

mod bounded;
mod directory;
mod extra;
mod extractor;
mod parser;
mod pipeline;
mod registry;
mod stream;
pub mod structures;
mod time;

pub use extractor::{
    Action, ExtractOptions, ExtractSummary, Overwrite, ZipExtractor, glob_match, has_glob_chars,
    sanitize_name,
};
pub use parser::{classify_name, detect_utf8};
pub use registry::{
    DEFLATE, DecompressReader, Decompressor, DecompressorRegistry, Deflate, InflaterPool, STORE,
    Store,
};
pub use stream::{Remainder, StreamState, ZipStreamReader};
pub use structures::{CompressionMethod, DataDescriptor, EntryMetadata, TimeSource};
