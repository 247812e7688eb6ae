//! Local file header parsing.
//!
//! A streaming reader never sees the central directory before the data, so
//! everything about an entry has to come from its local header:
//!
//! 1. The 30 byte fixed part (signature, version, flags, method, DOS
//!    time/date, CRC32, 32-bit sizes, name and extra lengths)
//! 2. The file name and extra field that follow it
//! 3. ZIP64 sizes and extended timestamps from the extra field
//!
//! Entries written with a data descriptor carry zero CRC/sizes here; those
//! are filled in once the entry has been read (see `pipeline`).

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::Cursor;

use crate::error::{Result, ZipError};
use crate::io::BufferedSource;

use super::extra::parse_extra;
use super::structures::*;
use super::time::resolve_modified;

/// Parses one local file header, leaving the source positioned at the
/// entry's data.
pub fn read_local_header(source: &mut BufferedSource<'_>) -> Result<EntryMetadata> {
    let header = source.read_exact_vec(LFH_SIZE)?;
    if signature(&header) != LFH_SIGNATURE {
        return Err(ZipError::Format("invalid local file header signature"));
    }

    // Fixed-size header fields
    let mut cursor = Cursor::new(&header[4..]);
    let version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let method = cursor.read_u16::<LittleEndian>()?;
    let dos_time = cursor.read_u16::<LittleEndian>()?;
    let dos_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let compressed_size32 = cursor.read_u32::<LittleEndian>()?;
    let uncompressed_size32 = cursor.read_u32::<LittleEndian>()?;
    let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;

    // Name and extra field arrive back to back
    let mut name = source.read_exact_vec(file_name_length + extra_field_length)?;
    let extra = name.split_off(file_name_length);

    let non_utf8 = classify_name(&name, flags);

    // Best effort: other writers may not follow the format, in which case
    // the extra content is mostly ignored.
    let info = parse_extra(&extra, compressed_size32, uncompressed_size32)?;
    let (modified, time_source) = resolve_modified(dos_date, dos_time, info.modified);

    let compressed_size = match info.compressed_size {
        Some(size) => size,
        // Sizes carried by a data descriptor are resolved while reading,
        // but the placeholder itself never is.
        None if compressed_size32 == ZIP64_PLACEHOLDER => {
            return Err(ZipError::Format("compressed size deferred without zip64 extra"));
        }
        None => compressed_size32 as u64,
    };
    // An uncompressed size of 2^32-1 without a zip64 extra is plausible in
    // an old zip32 file sharding inputs into the largest possible chunks,
    // so it is taken at face value.
    let uncompressed_size = info.uncompressed_size.unwrap_or(uncompressed_size32 as u64);

    let entry = EntryMetadata {
        name,
        non_utf8,
        version_needed,
        flags,
        method,
        modified,
        time_source,
        dos_time,
        dos_date,
        crc32,
        compressed_size,
        uncompressed_size,
        extra,
        zip64: info.zip64,
    };
    debug!(
        "local header: {} (method {}, flags {:#06x}, {} -> {} bytes)",
        entry.name(),
        entry.method,
        entry.flags,
        entry.compressed_size,
        entry.uncompressed_size
    );
    Ok(entry)
}

/// Decides whether a name is probably not UTF-8.
///
/// The format carries no authoritative encoding tag, so the flag is only
/// trusted when the bytes themselves cannot tell.
pub fn classify_name(name: &[u8], flags: u16) -> bool {
    match detect_utf8(name) {
        // Definitely not UTF-8
        (false, _) => true,
        // Only single-byte characters that every common code page shares
        (true, false) => false,
        // Might be UTF-8, might be GBK or Shift-JIS
        (true, true) => flags & FLAG_UTF8 == 0,
    }
}

/// Reports whether `name` is valid UTF-8, and whether it must be treated as
/// UTF-8 (it is not compatible with CP-437, ASCII or other common encodings).
pub fn detect_utf8(name: &[u8]) -> (bool, bool) {
    let Ok(name) = std::str::from_utf8(name) else {
        return (false, false);
    };
    // 0x7e and 0x5c are excluded since EUC-KR and Shift-JIS replace them
    // with localized currency and overline characters.
    let require = name
        .chars()
        .any(|c| !('\x20'..='\x7d').contains(&c) || c == '\\');
    (true, require)
}
