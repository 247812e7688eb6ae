//! Views that expose exactly one entry's compressed bytes.
//!
//! With sizes known up front the view is a plain length limit. With a
//! trailing data descriptor nothing says where the data ends, so the view
//! looks ahead for a descriptor whose compressed size equals the number of
//! bytes handed out so far and pauses there. The pipeline then compares the
//! descriptor's CRC with what it has decoded and either accepts the
//! boundary or tells the view to carry on past it.
//!
//! Compressed content could in principle contain bytes that match both
//! checks before the real boundary. The format cannot rule that out, and
//! the match is kept exact so existing producers keep working.

use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, Read};
use std::rc::Rc;

use log::trace;

use crate::io::{BufferedSource, MAX_READ};

use super::structures::{DataDescriptor, DescriptorLayout};

pub type SharedSource<'a> = Rc<RefCell<BufferedSource<'a>>>;

/// How the end of the entry's compressed data is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Declared compressed size.
    Fixed(u64),
    /// Trailing data descriptor, with 8-byte sizes if `zip64`.
    Descriptor { zip64: bool },
}

#[derive(Debug, Default)]
struct Progress {
    consumed: Cell<u64>,
    /// Boundary candidate the pipeline turned down.
    rejected: Cell<Option<u64>>,
}

/// Buffered reader over the entry's compressed bytes, handed to the
/// decompressor.
///
/// Bytes are copied out of the shared source for the decompressor to look
/// at, but only leave the source once they are consumed.
pub struct SourceView<'a> {
    source: SharedSource<'a>,
    progress: Rc<Progress>,
    bound: Bound,
    staged: Vec<u8>,
    staged_pos: usize,
}

/// The pipeline's side of a [`SourceView`].
pub struct ViewHandle<'a> {
    source: SharedSource<'a>,
    progress: Rc<Progress>,
    bound: Bound,
}

/// Creates a view and its handle over `source`.
pub fn bounded_view<'a>(
    source: SharedSource<'a>,
    bound: Bound,
) -> (SourceView<'a>, ViewHandle<'a>) {
    let progress = Rc::new(Progress::default());
    let view = SourceView {
        source: source.clone(),
        progress: progress.clone(),
        bound,
        staged: Vec::with_capacity(MAX_READ),
        staged_pos: 0,
    };
    let handle = ViewHandle {
        source,
        progress,
        bound,
    };
    (view, handle)
}

impl SourceView<'_> {
    /// Bytes that may be handed out before the next stop.
    fn next_run(&self) -> io::Result<usize> {
        let consumed = self.progress.consumed.get();
        match self.bound {
            Bound::Fixed(total) => Ok((total - consumed).min(MAX_READ as u64) as usize),
            Bound::Descriptor { zip64 } => {
                let start = if self.progress.rejected.get() == Some(consumed) {
                    1
                } else {
                    0
                };
                let wanted = MAX_READ + DescriptorLayout::MAX_LEN;
                let mut source = self.source.borrow_mut();
                let window = source.peek_up_to(wanted)?;
                let at_eof = window.len() < wanted;
                let run = if at_eof {
                    window.len()
                } else {
                    MAX_READ
                };

                for k in start..=run {
                    let offset = consumed + k as u64;
                    if let Some(descriptor) = match_descriptor(&window[k..], offset, zip64) {
                        trace!(
                            "descriptor candidate after {} bytes (crc {:#010x})",
                            offset,
                            descriptor.crc32
                        );
                        return Ok(k);
                    }
                }
                if at_eof {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "input ended before the data descriptor",
                    ));
                }
                Ok(run)
            }
        }
    }
}

impl Read for SourceView<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for SourceView<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.staged_pos == self.staged.len() {
            self.staged.clear();
            self.staged_pos = 0;
            let run = self.next_run()?;
            if run > 0 {
                let mut source = self.source.borrow_mut();
                let bytes = source.peek_up_to(run)?;
                if bytes.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "input ended inside entry data",
                    ));
                }
                self.staged.extend_from_slice(bytes);
            }
        }
        Ok(&self.staged[self.staged_pos..])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.staged.len() - self.staged_pos);
        self.staged_pos += amt;
        self.source.borrow_mut().consume(amt);
        self.progress
            .consumed
            .set(self.progress.consumed.get() + amt as u64);
    }
}

impl ViewHandle<'_> {
    pub fn bound(&self) -> Bound {
        self.bound
    }

    /// Compressed bytes the decompressor has consumed.
    pub fn consumed(&self) -> u64 {
        self.progress.consumed.get()
    }

    /// The descriptor sitting at the current position, if its compressed
    /// size matches the bytes consumed so far and it was not turned down.
    pub fn candidate(&self) -> io::Result<Option<DataDescriptor>> {
        let Bound::Descriptor { zip64 } = self.bound else {
            return Ok(None);
        };
        let consumed = self.consumed();
        if self.progress.rejected.get() == Some(consumed) {
            return Ok(None);
        }
        let mut source = self.source.borrow_mut();
        let window = source.peek_up_to(DescriptorLayout::MAX_LEN)?;
        Ok(match_descriptor(window, consumed, zip64))
    }

    /// Turns down the candidate at the current position; the view will
    /// hand out bytes past it.
    pub fn reject(&self) {
        self.progress.rejected.set(Some(self.consumed()));
    }

    /// Consumes an accepted descriptor from the source.
    pub fn accept(&self, descriptor: &DataDescriptor) -> io::Result<()> {
        self.source.borrow_mut().discard(descriptor.len as u64)
    }

    /// Discards whatever the decompressor left of a fixed-size entry.
    pub fn discard_rest(&self) -> io::Result<()> {
        if let Bound::Fixed(total) = self.bound {
            let rest = total - self.consumed();
            if rest > 0 {
                trace!("discarding {} unread compressed bytes", rest);
                self.source.borrow_mut().discard(rest)?;
                self.progress.consumed.set(total);
            }
        }
        Ok(())
    }
}

/// Tries every descriptor layout at the start of `bytes`.
fn match_descriptor(bytes: &[u8], compressed_size: u64, zip64: bool) -> Option<DataDescriptor> {
    DescriptorLayout::candidates(zip64)
        .iter()
        .filter_map(|layout| layout.parse(bytes))
        .find(|descriptor| descriptor.compressed_size == compressed_size)
}
