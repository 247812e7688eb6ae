//! Central directory skipping.
//!
//! The central directory is only useful for random access. A streaming
//! reader has already seen every entry by the time it gets there, so the
//! records are discarded, reading only the length fields needed to step over
//! them. Whatever follows the end record stays in the source for the next
//! archive or for the caller.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::{Result, ZipError};
use crate::io::BufferedSource;

use super::structures::*;

/// Offset of the name/extra/comment length fields in a directory header.
const CDFH_LENGTHS_OFFSET: usize = 28;
/// Offset of the comment length in the end record.
const EOCD_COMMENT_OFFSET: usize = 20;
/// Upper bound on a ZIP64 end record; anything larger is treated as corrupt.
const MAX_ZIP64_EOCD_SIZE: u64 = 0x7FFF_FFFF;

/// Skips from a central directory header through the end of central
/// directory record.
pub fn skip_central_directory(source: &mut BufferedSource<'_>) -> Result<()> {
    let mut headers = 0u64;
    loop {
        let sig = signature(source.peek(4)?);
        match sig {
            CDFH_SIGNATURE => {
                skip_directory_header(source)?;
                headers += 1;
            }
            ZIP64_EOCD_SIGNATURE => skip_zip64_end(source)?,
            ZIP64_LOCATOR_SIGNATURE => source.discard(ZIP64_LOCATOR_SIZE as u64)?,
            EOCD_SIGNATURE => {
                skip_end_record(source)?;
                debug!("skipped central directory with {} headers", headers);
                return Ok(());
            }
            _ => return Err(ZipError::Format("unexpected record in central directory")),
        }
    }
}

fn skip_directory_header(source: &mut BufferedSource<'_>) -> Result<()> {
    let lengths = &source.peek(CDFH_MIN_SIZE)?[CDFH_LENGTHS_OFFSET..];
    let variable = LittleEndian::read_u16(lengths) as u64 // file name
        + LittleEndian::read_u16(&lengths[2..]) as u64 // extra field
        + LittleEndian::read_u16(&lengths[4..]) as u64; // file comment
    source.discard(CDFH_MIN_SIZE as u64 + variable)?;
    Ok(())
}

fn skip_zip64_end(source: &mut BufferedSource<'_>) -> Result<()> {
    let prefix = source.peek(ZIP64_EOCD_PREFIX)?;
    let total = LittleEndian::read_u64(&prefix[4..]).saturating_add(ZIP64_EOCD_PREFIX as u64);
    if total > MAX_ZIP64_EOCD_SIZE {
        return Err(ZipError::Format("zip64 end of central directory too large"));
    }
    source.discard(total)?;
    Ok(())
}

fn skip_end_record(source: &mut BufferedSource<'_>) -> Result<()> {
    let record = source.peek(EOCD_SIZE)?;
    let comment_len = LittleEndian::read_u16(&record[EOCD_COMMENT_OFFSET..]) as u64;
    source.discard(EOCD_SIZE as u64 + comment_len)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_header(name: &[u8], extra: &[u8], comment: &[u8]) -> Vec<u8> {
        let mut out = CDFH_SIGNATURE.to_le_bytes().to_vec();
        out.extend_from_slice(&[0u8; 24]);
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(name);
        out.extend_from_slice(extra);
        out.extend_from_slice(comment);
        out
    }

    fn end_record(comment: &[u8]) -> Vec<u8> {
        let mut out = EOCD_SIGNATURE.to_le_bytes().to_vec();
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(comment);
        out
    }

    #[test]
    fn skips_headers_and_end_record() {
        let mut data = directory_header(b"a.txt", b"\x01\x02", b"first");
        data.extend(directory_header(b"b.txt", b"", b""));
        data.extend(end_record(b"archive comment"));
        data.extend_from_slice(b"TRAILING");

        let mut source = BufferedSource::new(&data[..]);
        skip_central_directory(&mut source).unwrap();
        assert_eq!(source.peek(8).unwrap(), b"TRAILING");
    }

    #[test]
    fn skips_zip64_records() {
        let mut data = directory_header(b"big", b"", b"");
        data.extend_from_slice(&ZIP64_EOCD_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&44u64.to_le_bytes());
        data.extend_from_slice(&[0u8; 44]);
        data.extend_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend(end_record(b""));
        data.extend_from_slice(b"END");

        let mut source = BufferedSource::new(&data[..]);
        skip_central_directory(&mut source).unwrap();
        assert_eq!(source.peek(3).unwrap(), b"END");
    }

    #[test]
    fn oversized_zip64_end_is_rejected() {
        let mut data = ZIP64_EOCD_SIGNATURE.to_le_bytes().to_vec();
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        let mut source = BufferedSource::new(&data[..]);
        assert!(matches!(
            skip_central_directory(&mut source),
            Err(ZipError::Format(_))
        ));
    }

    #[test]
    fn unknown_record_is_a_format_error() {
        let mut data = directory_header(b"a", b"", b"");
        data.extend_from_slice(b"JUNKJUNKJUNK");
        let mut source = BufferedSource::new(&data[..]);
        assert!(matches!(
            skip_central_directory(&mut source),
            Err(ZipError::Format(_))
        ));
    }

    #[test]
    fn truncated_directory_is_a_read_error() {
        let data = directory_header(b"a.txt", b"", b"");
        let mut source = BufferedSource::new(&data[..data.len() - 1]);
        assert!(skip_central_directory(&mut source).unwrap_err().is_end_of_input());
    }
}
