//! Compression method registry.
//!
//! Method ids map to [`Decompressor`]s. A process-wide registry holds the
//! built-ins (0 = store, 8 = deflate) and anything registered at startup;
//! each [`ZipStreamReader`](crate::ZipStreamReader) may add its own
//! overrides on top, which are consulted first.
//!
//! Inflate state is comparatively expensive to set up, so deflate readers
//! check a `flate2::Decompress` out of a shared free list, reset it, and
//! hand it back when their pipeline closes.

use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use std::sync::Arc;

use flate2::{Decompress, FlushDecompress, Status};
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, ZipError};

/// Method id of stored (uncompressed) entries.
pub const STORE: u16 = 0;
/// Method id of DEFLATE compressed entries.
pub const DEFLATE: u16 = 8;

/// Decompressed view over an entry's compressed bytes.
///
/// `close` releases any pooled state; reads afterwards fail with
/// [`ZipError::Closed`].
pub trait DecompressReader: Read {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds decompressing readers for one compression method.
///
/// Implementations are shared between threads; each reader they return is
/// used by a single session at a time. The input is buffered, and readers
/// should `consume` only the bytes they actually used so the stream stays
/// aligned after the entry.
pub trait Decompressor: Send + Sync {
    fn new_reader<'a>(&self, input: Box<dyn BufRead + 'a>) -> Box<dyn DecompressReader + 'a>;
}

/// Method 0: bytes pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Store;

impl Decompressor for Store {
    fn new_reader<'a>(&self, input: Box<dyn BufRead + 'a>) -> Box<dyn DecompressReader + 'a> {
        Box::new(StoreReader { input })
    }
}

struct StoreReader<'a> {
    input: Box<dyn BufRead + 'a>,
}

impl Read for StoreReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl DecompressReader for StoreReader<'_> {}

/// Free list of raw inflate states.
#[derive(Default)]
pub struct InflaterPool {
    free: Mutex<Vec<Decompress>>,
}

static INFLATER_POOL: Lazy<Arc<InflaterPool>> = Lazy::new(Default::default);

impl InflaterPool {
    /// The pool shared by every built-in deflate decompressor.
    pub fn global() -> Arc<InflaterPool> {
        INFLATER_POOL.clone()
    }

    /// Takes a state off the free list, reset for a new raw deflate stream,
    /// or builds a fresh one.
    pub fn check_out(&self) -> Decompress {
        match self.free.lock().pop() {
            Some(mut state) => {
                state.reset(false);
                state
            }
            None => Decompress::new(false),
        }
    }

    pub fn check_in(&self, state: Decompress) {
        self.free.lock().push(state);
    }

    /// Number of idle states on the free list.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// Method 8: raw DEFLATE backed by an [`InflaterPool`].
#[derive(Clone)]
pub struct Deflate {
    pool: Arc<InflaterPool>,
}

impl Deflate {
    pub fn new(pool: Arc<InflaterPool>) -> Self {
        Self { pool }
    }
}

impl Default for Deflate {
    fn default() -> Self {
        Self::new(InflaterPool::global())
    }
}

impl Decompressor for Deflate {
    fn new_reader<'a>(&self, input: Box<dyn BufRead + 'a>) -> Box<dyn DecompressReader + 'a> {
        Box::new(DeflateReader {
            input,
            state: Some(self.pool.check_out()),
            pool: self.pool.clone(),
            finished: false,
        })
    }
}

struct DeflateReader<'a> {
    input: Box<dyn BufRead + 'a>,
    state: Option<Decompress>,
    pool: Arc<InflaterPool>,
    finished: bool,
}

impl Read for DeflateReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(state) = self.state.as_mut() else {
            return Err(ZipError::Closed.into());
        };
        if self.finished || buf.is_empty() {
            return Ok(0);
        }
        loop {
            let input = self.input.fill_buf()?;
            let eof = input.is_empty();
            let (in_before, out_before) = (state.total_in(), state.total_out());
            let status = state
                .decompress(input, buf, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let consumed = (state.total_in() - in_before) as usize;
            let produced = (state.total_out() - out_before) as usize;
            self.input.consume(consumed);

            match status {
                Status::StreamEnd => {
                    self.finished = true;
                    return Ok(produced);
                }
                // The input may pause at a boundary candidate and resume
                // later, so an empty input is not an error here.
                _ if produced > 0 || eof => return Ok(produced),
                _ if consumed == 0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "deflate stream made no progress",
                    ));
                }
                _ => continue,
            }
        }
    }
}

impl DecompressReader for DeflateReader<'_> {
    fn close(&mut self) -> io::Result<()> {
        if let Some(state) = self.state.take() {
            self.pool.check_in(state);
        }
        Ok(())
    }
}

impl Drop for DeflateReader<'_> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Method id to [`Decompressor`] table.
pub struct DecompressorRegistry {
    methods: RwLock<HashMap<u16, Arc<dyn Decompressor>>>,
}

static GLOBAL_REGISTRY: Lazy<Arc<DecompressorRegistry>> =
    Lazy::new(|| Arc::new(DecompressorRegistry::with_builtins()));

impl DecompressorRegistry {
    /// A registry with no methods at all.
    pub fn empty() -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// A registry holding store and pooled deflate.
    pub fn with_builtins() -> Self {
        let mut methods: HashMap<u16, Arc<dyn Decompressor>> = HashMap::new();
        methods.insert(STORE, Arc::new(Store));
        methods.insert(DEFLATE, Arc::new(Deflate::default()));
        Self {
            methods: RwLock::new(methods),
        }
    }

    /// The process-wide registry, built with the built-ins on first use.
    pub fn global() -> Arc<DecompressorRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Adds a method. Entries are never replaced: registering an id twice is
    /// a programming error reported as [`ZipError::DuplicateMethod`].
    pub fn register(&self, method: u16, decompressor: Arc<dyn Decompressor>) -> Result<()> {
        let mut methods = self.methods.write();
        if methods.contains_key(&method) {
            return Err(ZipError::DuplicateMethod(method));
        }
        debug!("registered decompressor for method {}", method);
        methods.insert(method, decompressor);
        Ok(())
    }

    pub fn get(&self, method: u16) -> Option<Arc<dyn Decompressor>> {
        self.methods.read().get(&method).cloned()
    }

    pub fn contains(&self, method: u16) -> bool {
        self.methods.read().contains_key(&method)
    }
}

impl Default for DecompressorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
