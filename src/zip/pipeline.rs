//! Per-entry decode pipeline.
//!
//! Three stages, each owning the one below it:
//!
//! ```text
//! CRC32 accumulator -> decompressor -> bounded view -> buffered source
//! ```
//!
//! The CRC stage only ever hashes bytes handed to the caller. For entries
//! with a data descriptor it also settles where the entry ends (see
//! `bounded`), and the resolved descriptor is handed to the controller once
//! the entry has been read to its end.

use std::io::{self, Read};

use crc32fast::Hasher;
use log::{debug, trace};

use crate::error::ZipError;

use super::bounded::{Bound, SharedSource, ViewHandle, bounded_view};
use super::registry::{DecompressReader, Decompressor};
use super::structures::{DataDescriptor, EntryMetadata};

pub struct Pipeline<'a> {
    decoder: Box<dyn DecompressReader + 'a>,
    view: ViewHandle<'a>,
    hasher: Hasher,
    produced: u64,
    expected_crc: u32,
    expected_size: u64,
    finished: bool,
    resolved: Option<DataDescriptor>,
}

impl<'a> Pipeline<'a> {
    /// Stacks the stages for `entry` over `source`.
    pub fn open(
        source: SharedSource<'a>,
        entry: &EntryMetadata,
        decompressor: &dyn Decompressor,
    ) -> Self {
        let bound = if entry.has_data_descriptor() {
            Bound::Descriptor { zip64: entry.zip64 }
        } else {
            Bound::Fixed(entry.compressed_size)
        };
        let (view, handle) = bounded_view(source, bound);
        Self {
            decoder: decompressor.new_reader(Box::new(view)),
            view: handle,
            hasher: Hasher::new(),
            produced: 0,
            expected_crc: entry.crc32,
            expected_size: entry.uncompressed_size,
            finished: false,
            resolved: None,
        }
    }

    /// The entry has been read to its end and verified.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Descriptor accepted as the end of the entry, once finished.
    pub fn resolved(&self) -> Option<&DataDescriptor> {
        self.resolved.as_ref()
    }

    /// Reads the rest of the entry, discarding it.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }

    /// Releases the decompressor.
    pub fn close(&mut self) -> io::Result<()> {
        self.decoder.close()
    }

    /// Called when the decompressor runs dry. Returns `false` if a
    /// descriptor candidate was turned down and reading should go on.
    fn settle(&mut self) -> io::Result<bool> {
        let actual = self.hasher.clone().finalize();
        match self.view.bound() {
            Bound::Fixed(_) => {
                self.view.discard_rest()?;
                if self.produced != self.expected_size {
                    return Err(ZipError::SizeMismatch {
                        expected: self.expected_size,
                        actual: self.produced,
                    }
                    .into());
                }
                if self.expected_crc != 0 && actual != self.expected_crc {
                    return Err(ZipError::Checksum {
                        expected: self.expected_crc,
                        actual,
                    }
                    .into());
                }
            }
            Bound::Descriptor { .. } => match self.view.candidate()? {
                Some(descriptor) if descriptor.crc32 == actual => {
                    self.view.accept(&descriptor)?;
                    debug!(
                        "data descriptor accepted after {} compressed bytes",
                        descriptor.compressed_size
                    );
                    self.resolved = Some(descriptor);
                }
                Some(descriptor) => {
                    trace!(
                        "descriptor candidate at {} turned down: crc {:#010x} != {:#010x}",
                        self.view.consumed(),
                        descriptor.crc32,
                        actual
                    );
                    self.view.reject();
                    return Ok(false);
                }
                None => return Err(ZipError::Format("data descriptor not found").into()),
            },
        }
        self.finished = true;
        Ok(true)
    }
}

impl Read for Pipeline<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.decoder.read(buf)?;
            if n > 0 {
                self.hasher.update(&buf[..n]);
                self.produced += n as u64;
                return Ok(n);
            }
            if self.settle()? {
                return Ok(0);
            }
        }
    }
}
