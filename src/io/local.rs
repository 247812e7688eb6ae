use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Sequential reader over a local file or stdin.
pub struct LocalFileReader {
    inner: Box<dyn Read>,
    size: Option<u64>,
}

impl LocalFileReader {
    /// Opens `path`, or stdin when `path` is `-`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new("-") {
            return Ok(Self::stdin());
        }
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let size = file.metadata()?.len();
        Ok(Self {
            inner: Box::new(file),
            size: Some(size),
        })
    }

    pub fn stdin() -> Self {
        Self {
            inner: Box::new(io::stdin().lock()),
            size: None,
        }
    }

    /// Size of the file, if the input is one.
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

impl Read for LocalFileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
