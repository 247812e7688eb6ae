//! Forward-only archive reader.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Read};
use std::rc::Rc;
use std::sync::Arc;

use log::debug;

use crate::error::{Result, ZipError};
use crate::io::BufferedSource;

use super::bounded::SharedSource;
use super::directory::skip_central_directory;
use super::parser::read_local_header;
use super::pipeline::Pipeline;
use super::registry::{Decompressor, DecompressorRegistry};
use super::structures::{
    CDFH_SIGNATURE, EOCD_SIGNATURE, EntryMetadata, LFH_SIGNATURE, ZIP64_EOCD_SIGNATURE, signature,
};

/// Signatures a central directory can open with. An archive without
/// entries has no directory headers and starts at an end record.
fn is_directory_start(sig: u32) -> bool {
    matches!(sig, CDFH_SIGNATURE | ZIP64_EOCD_SIGNATURE | EOCD_SIGNATURE)
}

/// Where a [`ZipStreamReader`] is between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Before the first entry, or after a failed `next_entry`.
    Idle,
    /// An entry's data can be read.
    EntryOpen,
    /// The central directory was consumed. `next_entry` starts on whatever
    /// archive follows.
    ArchiveEnded,
}

/// Sequential reader over a ZIP archive arriving on a non-seekable input.
///
/// Call [`next_entry`](Self::next_entry) to move to each entry (including
/// the first), then read the entry's decompressed bytes through
/// [`Read`]. Moving on drains whatever of the previous entry was left
/// unread. Bytes after the archive are available from
/// [`remainder`](Self::remainder).
///
/// ```no_run
/// use std::io::Read;
/// use sunzip::ZipStreamReader;
///
/// # fn main() -> sunzip::Result<()> {
/// let mut archive = ZipStreamReader::new(std::io::stdin());
/// while let Some(entry) = archive.next_entry()? {
///     let mut data = Vec::new();
///     archive.read_to_end(&mut data)?;
///     println!("{}: {} bytes", entry.name(), data.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ZipStreamReader<'a> {
    source: SharedSource<'a>,
    registry: Arc<DecompressorRegistry>,
    overrides: HashMap<u16, Arc<dyn Decompressor>>,
    state: StreamState,
    entry: Option<EntryMetadata>,
    pipeline: Option<Pipeline<'a>>,
}

impl<'a> ZipStreamReader<'a> {
    /// Reads from `input` using the process-wide decompressor registry.
    pub fn new<R: Read + 'a>(input: R) -> Self {
        Self::with_registry(input, DecompressorRegistry::global())
    }

    pub fn with_registry<R: Read + 'a>(input: R, registry: Arc<DecompressorRegistry>) -> Self {
        Self {
            source: Rc::new(RefCell::new(BufferedSource::new(input))),
            registry,
            overrides: HashMap::new(),
            state: StreamState::Idle,
            entry: None,
            pipeline: None,
        }
    }

    /// Adds or replaces a decompressor for this reader only. Overrides are
    /// consulted before the registry.
    pub fn register_decompressor(&mut self, method: u16, decompressor: Arc<dyn Decompressor>) {
        self.overrides.insert(method, decompressor);
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Metadata of the open entry. CRC and sizes carried by a data
    /// descriptor are filled in once the entry has been read to its end.
    pub fn entry(&self) -> Option<&EntryMetadata> {
        self.entry.as_ref()
    }

    /// Advances to the next entry.
    ///
    /// Returns `Ok(None)` once the central directory has been consumed.
    /// Calling it again after that starts on an archive concatenated
    /// directly after the first. Bytes that are neither a local header nor
    /// a central directory are skipped one at a time, so junk in front of an
    /// archive is tolerated. Running out of input before any signature is a
    /// [`ZipError::Io`] with kind `UnexpectedEof`.
    pub fn next_entry(&mut self) -> Result<Option<EntryMetadata>> {
        self.state = StreamState::Idle;
        if let Some(mut pipeline) = self.pipeline.take() {
            let drained = pipeline.drain();
            self.apply_resolution(&pipeline);
            pipeline.close()?;
            drained?;
        }
        self.entry = None;

        let mut skipped = 0u64;
        loop {
            let sig = signature(self.source.borrow_mut().peek(4)?);
            match sig {
                LFH_SIGNATURE => {
                    if skipped > 0 {
                        debug!("skipped {} bytes before local header", skipped);
                    }
                    let entry = read_local_header(&mut self.source.borrow_mut())?;
                    let decompressor = self
                        .decompressor(entry.method)
                        .ok_or(ZipError::UnsupportedMethod(entry.method))?;
                    self.pipeline = Some(Pipeline::open(
                        self.source.clone(),
                        &entry,
                        decompressor.as_ref(),
                    ));
                    self.entry = Some(entry.clone());
                    self.state = StreamState::EntryOpen;
                    return Ok(Some(entry));
                }
                sig if is_directory_start(sig) => {
                    if skipped > 0 {
                        debug!("skipped {} bytes before central directory", skipped);
                    }
                    skip_central_directory(&mut self.source.borrow_mut())?;
                    self.state = StreamState::ArchiveEnded;
                    return Ok(None);
                }
                _ => {
                    self.source.borrow_mut().discard(1)?;
                    skipped += 1;
                }
            }
        }
    }

    /// Raw bytes not yet consumed: trailing data after the archive, or a
    /// following archive. Reading it while an entry is open steals that
    /// entry's bytes.
    pub fn remainder(&mut self) -> Remainder<'_, 'a> {
        Remainder {
            source: &self.source,
        }
    }

    /// Whether the next bytes start an entry or a central directory (or the
    /// end record of an empty archive), i.e.
    /// whether `next_entry` would succeed without skipping anything.
    pub fn archive_follows(&mut self) -> Result<bool> {
        let mut source = self.source.borrow_mut();
        let head = source.peek_up_to(4)?;
        Ok(head.len() == 4 && {
            let sig = signature(head);
            sig == LFH_SIGNATURE || is_directory_start(sig)
        })
    }

    /// Whether the input has been read to its end.
    pub fn at_end_of_input(&mut self) -> Result<bool> {
        Ok(self.source.borrow_mut().is_exhausted()?)
    }

    fn decompressor(&self, method: u16) -> Option<Arc<dyn Decompressor>> {
        self.overrides
            .get(&method)
            .cloned()
            .or_else(|| self.registry.get(method))
    }

    fn apply_resolution(&mut self, pipeline: &Pipeline<'_>) {
        if let (Some(entry), Some(descriptor)) = (self.entry.as_mut(), pipeline.resolved()) {
            entry.resolve_from_descriptor(descriptor);
        }
    }
}

impl Read for ZipStreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(ZipError::NoOpenEntry.into());
        };
        let was_finished = pipeline.is_finished();
        let n = pipeline.read(buf)?;
        if n == 0 && !was_finished && pipeline.is_finished() {
            if let (Some(entry), Some(descriptor)) = (self.entry.as_mut(), pipeline.resolved()) {
                entry.resolve_from_descriptor(descriptor);
            }
        }
        Ok(n)
    }
}

/// Unconsumed bytes of a [`ZipStreamReader`]'s input.
pub struct Remainder<'r, 'a> {
    source: &'r SharedSource<'a>,
}

impl Read for Remainder<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.borrow_mut().read(buf)
    }
}
