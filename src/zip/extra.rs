//! Extra field records attached to a local file header.
//!
//! IDs 0..31 are reserved for PKWARE; the rest belong to third-party
//! vendors. ZIP never had high precision timestamps or a time zone, so
//! several competing timestamp fields exist and all of them are honoured.
//! Producers are inconsistent about record lengths; a record whose declared
//! size runs past the end of the block ends the walk instead of failing the
//! header.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use log::{debug, trace};

use super::structures::ZIP64_PLACEHOLDER;
use super::time;
use crate::error::{Result, ZipError};

pub const ZIP64_EXTRA_ID: u16 = 0x0001; // Zip64 extended information
pub const NTFS_EXTRA_ID: u16 = 0x000a; // NTFS
pub const UNIX_EXTRA_ID: u16 = 0x000d; // UNIX
pub const EXT_TIME_EXTRA_ID: u16 = 0x5455; // Extended timestamp
pub const INFO_ZIP_UNIX_EXTRA_ID: u16 = 0x5855; // Info-ZIP Unix extension

/// NTFS attribute 1 holds modify, access and create filetimes.
const NTFS_TIMES_TAG: u16 = 0x0001;
const NTFS_TIMES_SIZE: u16 = 24;

/// Cursor over a byte slice that checks the remaining length before every
/// read.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.data.len() {
            return None;
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Some(head)
    }

    pub fn skip(&mut self, n: usize) -> Option<()> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn u16(&mut self) -> Option<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn u32(&mut self) -> Option<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }

    pub fn u64(&mut self) -> Option<u64> {
        self.take(8).map(LittleEndian::read_u64)
    }

    /// Reads a `tag:16, size:16` record header and its payload. `None` when
    /// fewer than four bytes remain or the payload runs out of bounds.
    pub fn record(&mut self) -> Option<(u16, ByteCursor<'a>)> {
        let mut probe = *self;
        let tag = probe.u16()?;
        let size = probe.u16()? as usize;
        let payload = probe.take(size)?;
        *self = probe;
        Some((tag, ByteCursor::new(payload)))
    }
}

/// What the extra block contributed to an entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtraInfo {
    pub compressed_size: Option<u64>,
    pub uncompressed_size: Option<u64>,
    /// Last modify time found in an NTFS, Unix or extended-timestamp record.
    pub modified: Option<DateTime<Utc>>,
    pub zip64: bool,
}

/// Walks the extra block of a local header.
///
/// `compressed_size` and `uncompressed_size` are the 32-bit header values;
/// only fields still holding the ZIP64 placeholder are read from a ZIP64
/// record, uncompressed size first.
pub fn parse_extra(
    extra: &[u8],
    compressed_size: u32,
    uncompressed_size: u32,
) -> Result<ExtraInfo> {
    let mut info = ExtraInfo::default();
    let mut need_usize = uncompressed_size == ZIP64_PLACEHOLDER;
    let mut need_csize = compressed_size == ZIP64_PLACEHOLDER;

    let mut cursor = ByteCursor::new(extra);
    while cursor.remaining() >= 4 {
        let Some((tag, mut field)) = cursor.record() else {
            debug!(
                "extra field record overruns its block, ignoring the last {} bytes",
                cursor.remaining()
            );
            break;
        };
        trace!("extra field {:#06x}, {} bytes", tag, field.remaining());

        match tag {
            ZIP64_EXTRA_ID => {
                info.zip64 = true;
                // The header fields are updated only if they hold the
                // placeholder, in this fixed order.
                if need_usize {
                    need_usize = false;
                    info.uncompressed_size = Some(
                        field
                            .u64()
                            .ok_or(ZipError::Format("zip64 extra field too short"))?,
                    );
                }
                if need_csize {
                    need_csize = false;
                    info.compressed_size = Some(
                        field
                            .u64()
                            .ok_or(ZipError::Format("zip64 extra field too short"))?,
                    );
                }
            }
            NTFS_EXTRA_ID => {
                if let Some(modified) = parse_ntfs(field) {
                    info.modified = Some(modified);
                }
            }
            UNIX_EXTRA_ID | INFO_ZIP_UNIX_EXTRA_ID => {
                // access time, then modify time
                let modified = field.skip(4).and_then(|()| field.u32());
                if let Some(modified) = modified.and_then(time::from_unix) {
                    info.modified = Some(modified);
                }
            }
            EXT_TIME_EXTRA_ID => {
                let Some(flags) = field.u8() else {
                    continue;
                };
                if flags & 1 == 0 {
                    continue; // no modify time
                }
                if let Some(modified) = field.u32().and_then(time::from_unix) {
                    info.modified = Some(modified);
                }
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_ntfs(mut field: ByteCursor<'_>) -> Option<DateTime<Utc>> {
    field.skip(4)?; // reserved
    let mut modified = None;
    while field.remaining() >= 4 {
        let Some((attr_tag, mut attr)) = field.record() else {
            break;
        };
        if attr_tag != NTFS_TIMES_TAG || attr.remaining() != NTFS_TIMES_SIZE as usize {
            continue;
        }
        modified = attr.u64().and_then(time::from_ntfs_ticks);
    }
    modified
}
