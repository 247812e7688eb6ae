use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, FixedOffset};

/// Local File Header (LFH) - 30 bytes + name + extra
pub const LFH_SIGNATURE: u32 = 0x04034b50;
pub const LFH_SIZE: usize = 30;

/// Central Directory File Header (CDFH) - 46 bytes + name + extra + comment
pub const CDFH_SIGNATURE: u32 = 0x02014b50;
pub const CDFH_MIN_SIZE: usize = 46;

/// End of Central Directory (EOCD) - 22 bytes + comment
pub const EOCD_SIGNATURE: u32 = 0x06054b50;
pub const EOCD_SIZE: usize = 22;

/// ZIP64 End of Central Directory Locator - 20 bytes
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x07064b50;
pub const ZIP64_LOCATOR_SIZE: usize = 20;

/// ZIP64 End of Central Directory - 12 byte prefix + declared remainder
pub const ZIP64_EOCD_SIGNATURE: u32 = 0x06064b50;
pub const ZIP64_EOCD_PREFIX: usize = 12;

/// Optional signature in front of a data descriptor. De facto standard,
/// required by the macOS Finder.
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;

/// Size fields holding this value are deferred to a ZIP64 extra field or a
/// data descriptor.
pub const ZIP64_PLACEHOLDER: u32 = 0xFFFF_FFFF;

/// General purpose flag: CRC and sizes follow the data in a descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
/// General purpose flag: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// Reads the little-endian signature at the start of `bytes`.
pub fn signature(bytes: &[u8]) -> u32 {
    LittleEndian::read_u32(bytes)
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Where [`EntryMetadata::modified`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Only the MS-DOS date/time fields; the value is expressed in UTC.
    Dos,
    /// An NTFS, Unix or extended-timestamp extra field.
    Extended,
}

/// Metadata of one entry, decoded from its local file header.
///
/// `crc32`, `compressed_size` and `uncompressed_size` are final once they
/// have been resolved, either by a ZIP64 extra field while parsing the
/// header or, for entries with [`FLAG_DATA_DESCRIPTOR`], by the trailing
/// data descriptor once the entry has been read to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub name: Vec<u8>,
    /// The name is probably not UTF-8 (CP-437 or a local code page).
    pub non_utf8: bool,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DateTime<FixedOffset>,
    pub time_source: TimeSource,
    pub dos_time: u16,
    pub dos_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub extra: Vec<u8>,
    /// The header carried a ZIP64 extra field, so a trailing descriptor
    /// uses 8-byte sizes.
    pub zip64: bool,
}

impl EntryMetadata {
    /// Entry name, with invalid UTF-8 replaced.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Directory entries end with '/'
    pub fn is_dir(&self) -> bool {
        self.name.last() == Some(&b'/')
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Whether `modified` came from an extra field rather than the DOS
    /// fields alone.
    pub fn has_extended_timestamp(&self) -> bool {
        self.time_source == TimeSource::Extended
    }

    pub fn compression(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.method)
    }

    /// Takes the CRC and sizes from a trailing data descriptor.
    pub(crate) fn resolve_from_descriptor(&mut self, descriptor: &DataDescriptor) {
        debug_assert!(self.has_data_descriptor());
        self.crc32 = descriptor.crc32;
        self.compressed_size = descriptor.compressed_size;
        self.uncompressed_size = descriptor.uncompressed_size;
    }
}

/// Trailer carrying the CRC and sizes of an entry written with
/// [`FLAG_DATA_DESCRIPTOR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Bytes the descriptor occupies in the stream, signature included.
    pub len: usize,
}

/// One of the four byte layouts a data descriptor can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLayout {
    pub signed: bool,
    pub zip64: bool,
}

impl DescriptorLayout {
    /// Largest descriptor: signature, CRC and two 8-byte sizes.
    pub const MAX_LEN: usize = 24;

    /// Layouts to try for an entry, signed first.
    pub fn candidates(zip64: bool) -> [DescriptorLayout; 2] {
        [
            DescriptorLayout {
                signed: true,
                zip64,
            },
            DescriptorLayout {
                signed: false,
                zip64,
            },
        ]
    }

    pub fn len(&self) -> usize {
        let sizes = if self.zip64 { 16 } else { 8 };
        let sig = if self.signed { 4 } else { 0 };
        sig + 4 + sizes
    }

    /// Decodes a descriptor from the start of `bytes`, or `None` if there
    /// are too few bytes or the signature is missing.
    pub fn parse(&self, bytes: &[u8]) -> Option<DataDescriptor> {
        if bytes.len() < self.len() {
            return None;
        }
        let mut body = bytes;
        if self.signed {
            if signature(body) != DATA_DESCRIPTOR_SIGNATURE {
                return None;
            }
            body = &body[4..];
        }
        let crc32 = LittleEndian::read_u32(body);
        let (compressed_size, uncompressed_size) = if self.zip64 {
            (
                LittleEndian::read_u64(&body[4..]),
                LittleEndian::read_u64(&body[12..]),
            )
        } else {
            (
                LittleEndian::read_u32(&body[4..]) as u64,
                LittleEndian::read_u32(&body[8..]) as u64,
            )
        };
        Some(DataDescriptor {
            crc32,
            compressed_size,
            uncompressed_size,
            len: self.len(),
        })
    }
}
