//! # sunzip
//!
//! A streaming ZIP decoder for inputs that can only be read forward: pipes,
//! sockets, stdin, or the body of an HTTP response.
//!
//! Ordinary ZIP readers start from the central directory at the end of the
//! file. This crate walks the local file headers instead, decoding each
//! entry as it arrives, and leaves whatever follows the archive unread so it
//! can be handed to the caller or parsed as another archive.
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, with CRC32 and size verification
//! - Entries whose sizes arrive in a trailing data descriptor
//! - ZIP64 sizes and descriptors
//! - NTFS, Unix and extended-timestamp modification times
//! - Junk before an archive, concatenated archives and trailing data
//! - Pluggable decompressors per compression method
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use sunzip::ZipStreamReader;
//!
//! fn main() -> anyhow::Result<()> {
//!     let input = std::fs::File::open("archive.zip")?;
//!     let mut archive = ZipStreamReader::new(input);
//!
//!     while let Some(entry) = archive.next_entry()? {
//!         let mut data = Vec::new();
//!         archive.read_to_end(&mut data)?;
//!         println!("{} ({} bytes, modified {})", entry.name(), data.len(), entry.modified);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Result, ZipError};
pub use io::{BufferedSource, HttpStreamReader, LocalFileReader};
pub use zip::{
    Action, CompressionMethod, DataDescriptor, DecompressReader, Decompressor,
    DecompressorRegistry, Deflate, EntryMetadata, ExtractOptions, ExtractSummary, InflaterPool,
    Overwrite, Remainder, Store, StreamState, TimeSource, ZipExtractor, ZipStreamReader,
    glob_match,
};
