//! Error types for streaming ZIP decoding.
//!
//! | Category | Variant | Recoverable |
//! |----------|---------|-------------|
//! | Format | [`ZipError::Format`] | no, for the current entry/archive |
//! | Read | [`ZipError::Io`] | no, stream position is undefined |
//! | Method | [`ZipError::UnsupportedMethod`] | the session may fall back to the remainder |
//! | Integrity | [`ZipError::Checksum`], [`ZipError::SizeMismatch`] | no, for the current entry |
//! | Misuse | [`ZipError::DuplicateMethod`], [`ZipError::Closed`], [`ZipError::NoOpenEntry`] | programmer error |
//!
//! Reaching the end of an archive is not an error: [`ZipStreamReader::next_entry`]
//! returns `Ok(None)` for it.
//!
//! [`ZipStreamReader::next_entry`]: crate::ZipStreamReader::next_entry

use std::io;

use thiserror::Error;

/// Error type for streaming ZIP operations.
#[derive(Debug, Error)]
pub enum ZipError {
    /// Bad or missing signature, malformed fixed record, or a deferred size
    /// that was never resolved.
    #[error("invalid zip format: {0}")]
    Format(&'static str),

    /// The underlying input failed or ended in the middle of a record.
    #[error("read error: {0}")]
    Io(#[source] io::Error),

    /// No decompressor is registered for this method id.
    #[error("unsupported compression method: {0}")]
    UnsupportedMethod(u16),

    /// A pooled decoder was used after its pipeline released it.
    #[error("read after close")]
    Closed,

    /// The CRC32 of the delivered bytes does not match the declared value.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    /// A fixed-size entry delivered a different number of bytes than declared.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// A process-wide decompressor was registered twice for the same method.
    #[error("decompressor already registered for method {0}")]
    DuplicateMethod(u16),

    /// `read` was called while no entry is open.
    #[error("no entry is open")]
    NoOpenEntry,
}

impl ZipError {
    /// Whether this is the underlying input running dry before a record
    /// could be recognised.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Unwraps `ZipError`s that travelled through an `io::Read` boundary.
impl From<io::Error> for ZipError {
    fn from(e: io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<ZipError>()) {
            return Self::Io(e);
        }
        let kind = e.kind();
        match e.into_inner().map(|inner| inner.downcast::<ZipError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(inner)) => Self::Io(io::Error::new(kind, inner)),
            None => Self::Io(io::Error::from(kind)),
        }
    }
}

impl From<ZipError> for io::Error {
    fn from(e: ZipError) -> Self {
        match e {
            ZipError::Io(inner) => inner,
            ZipError::Format(_) | ZipError::Checksum { .. } | ZipError::SizeMismatch { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
            other => io::Error::other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ZipError>;
