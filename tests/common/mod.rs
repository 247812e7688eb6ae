//! Hand-rolled archive writer for the integration tests.
//!
//! Every record is written byte by byte so tests can produce layouts real
//! writers rarely emit: unsigned descriptors, deferred ZIP64 sizes, junk
//! around archives.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

pub const STORE: u16 = 0;
pub const DEFLATE: u16 = 8;
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
pub const FLAG_UTF8: u16 = 0x0800;

/// 2021-03-14 (years since 1980 = 41)
pub const DOS_DATE: u16 = (41 << 9) | (3 << 5) | 14;
/// 15:09:26
pub const DOS_TIME: u16 = (15 << 11) | (9 << 5) | 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    Signed,
    Unsigned,
}

#[derive(Debug, Clone)]
pub struct TestEntry {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub method: u16,
    pub flags: u16,
    pub descriptor: Option<Descriptor>,
    pub zip64: bool,
    pub extra: Vec<u8>,
    pub dos_date: u16,
    pub dos_time: u16,
    /// Written instead of the real CRC in the local header.
    pub crc_override: Option<u32>,
}

impl TestEntry {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            method: STORE,
            flags: 0,
            descriptor: None,
            zip64: false,
            extra: Vec::new(),
            dos_date: DOS_DATE,
            dos_time: DOS_TIME,
            crc_override: None,
        }
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            method: DEFLATE,
            ..Self::stored(name, data)
        }
    }

    pub fn with_descriptor(mut self, style: Descriptor) -> Self {
        self.flags |= FLAG_DATA_DESCRIPTOR;
        self.descriptor = Some(style);
        self
    }

    pub fn with_zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_raw_name(mut self, name: &[u8]) -> Self {
        self.name = name.to_vec();
        self
    }

    pub fn with_method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn with_dos_time(mut self, dos_date: u16, dos_time: u16) -> Self {
        self.dos_date = dos_date;
        self.dos_time = dos_time;
        self
    }

    pub fn with_extra(mut self, record: Vec<u8>) -> Self {
        self.extra.extend(record);
        self
    }

    pub fn with_bad_crc(mut self) -> Self {
        self.crc_override = Some(crc32fast::hash(&self.data) ^ 0xdead_beef);
        self
    }

    pub fn crc(&self) -> u32 {
        crc32fast::hash(&self.data)
    }

    /// Entry data as stored in the archive.
    pub fn compressed(&self) -> Vec<u8> {
        match self.method {
            DEFLATE => deflate(&self.data),
            _ => self.data.clone(),
        }
    }

    /// Local header, data and descriptor.
    pub fn local_record(&self) -> Vec<u8> {
        let compressed = self.compressed();
        let deferred = self.descriptor.is_some();
        let (crc, csize, usize) = if deferred {
            (0, 0, 0)
        } else {
            (
                self.crc_override.unwrap_or_else(|| self.crc()),
                compressed.len() as u64,
                self.data.len() as u64,
            )
        };

        let mut extra = Vec::new();
        let (csize32, usize32) = if self.zip64 {
            let mut payload = usize.to_le_bytes().to_vec();
            payload.extend_from_slice(&csize.to_le_bytes());
            extra.extend(extra_record(0x0001, &payload));
            (u32::MAX, u32::MAX)
        } else {
            (csize as u32, usize as u32)
        };
        extra.extend_from_slice(&self.extra);

        let mut out = Vec::new();
        out.extend_from_slice(&0x04034b50u32.to_le_bytes());
        out.extend_from_slice(&(if self.zip64 { 45u16 } else { 20 }).to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.dos_time.to_le_bytes());
        out.extend_from_slice(&self.dos_date.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&csize32.to_le_bytes());
        out.extend_from_slice(&usize32.to_le_bytes());
        out.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&extra);
        out.extend_from_slice(&compressed);

        if let Some(style) = self.descriptor {
            if style == Descriptor::Signed {
                out.extend_from_slice(&0x08074b50u32.to_le_bytes());
            }
            out.extend_from_slice(&self.crc_override.unwrap_or_else(|| self.crc()).to_le_bytes());
            if self.zip64 {
                out.extend_from_slice(&(compressed.len() as u64).to_le_bytes());
                out.extend_from_slice(&(self.data.len() as u64).to_le_bytes());
            } else {
                out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
                out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
            }
        }
        out
    }

    fn directory_record(&self, offset: u32) -> Vec<u8> {
        let compressed_len = self.compressed().len() as u32;
        let mut out = Vec::new();
        out.extend_from_slice(&0x02014b50u32.to_le_bytes());
        out.extend_from_slice(&0x031eu16.to_le_bytes()); // made by: unix, 3.0
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.dos_time.to_le_bytes());
        out.extend_from_slice(&self.dos_date.to_le_bytes());
        out.extend_from_slice(&self.crc().to_le_bytes());
        out.extend_from_slice(&compressed_len.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra
        out.extend_from_slice(&7u16.to_le_bytes()); // comment
        out.extend_from_slice(&0u16.to_le_bytes()); // disk
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(b"comment");
        out
    }
}

/// A complete archive: local records, central directory, end record.
pub fn archive(entries: &[TestEntry]) -> Vec<u8> {
    build(entries, false, b"")
}

/// Like [`archive`] with ZIP64 end records in front of the end record.
pub fn zip64_archive(entries: &[TestEntry]) -> Vec<u8> {
    build(entries, true, b"")
}

/// Like [`archive`] with an archive comment.
pub fn commented_archive(entries: &[TestEntry], comment: &[u8]) -> Vec<u8> {
    build(entries, false, comment)
}

fn build(entries: &[TestEntry], zip64_end: bool, comment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    for entry in entries {
        offsets.push(out.len() as u32);
        out.extend(entry.local_record());
    }

    let directory_start = out.len();
    for (entry, offset) in entries.iter().zip(offsets) {
        out.extend(entry.directory_record(offset));
    }
    let directory_size = out.len() - directory_start;

    if zip64_end {
        let zip64_end_start = out.len() as u64;
        out.extend_from_slice(&0x06064b50u32.to_le_bytes());
        out.extend_from_slice(&44u64.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        out.extend_from_slice(&(directory_size as u64).to_le_bytes());
        out.extend_from_slice(&(directory_start as u64).to_le_bytes());

        out.extend_from_slice(&0x07064b50u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&zip64_end_start.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
    }

    out.extend_from_slice(&0x06054b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(directory_size as u32).to_le_bytes());
    out.extend_from_slice(&(directory_start as u32).to_le_bytes());
    out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
    out.extend_from_slice(comment);
    out
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn extra_record(tag: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = tag.to_le_bytes().to_vec();
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Extended timestamp (0x5455) carrying a modify time.
pub fn extended_timestamp(unix: u32) -> Vec<u8> {
    let mut payload = vec![1u8];
    payload.extend_from_slice(&unix.to_le_bytes());
    extra_record(0x5455, &payload)
}

/// NTFS (0x000a) times, all set to `ticks`.
pub fn ntfs_times(ticks: u64) -> Vec<u8> {
    let mut payload = 0u32.to_le_bytes().to_vec();
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&24u16.to_le_bytes());
    for _ in 0..3 {
        payload.extend_from_slice(&ticks.to_le_bytes());
    }
    extra_record(0x000a, &payload)
}

/// Info-ZIP Unix (0x5855) access and modify times.
pub fn info_zip_unix(atime: u32, mtime: u32) -> Vec<u8> {
    let mut payload = atime.to_le_bytes().to_vec();
    payload.extend_from_slice(&mtime.to_le_bytes());
    extra_record(0x5855, &payload)
}

/// Deterministic data that deflate cannot shrink much.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// Reader that hands out at most `chunk` bytes per call.
pub struct Trickle<'a> {
    pub data: &'a [u8],
    pub chunk: usize,
}

impl std::io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
