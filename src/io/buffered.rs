use std::io::{self, BufRead, Read};

/// Largest chunk handed to a decompressor in one go.
pub const MAX_READ: usize = 4096;

/// Look-ahead kept past a chunk: the largest data descriptor (24 bytes)
/// plus the signature of the record that follows it.
pub const READ_AHEAD: usize = 28;

/// Capacity of the read-ahead window.
pub const BUFFER_SIZE: usize = MAX_READ + READ_AHEAD;

/// Fixed-size read-ahead window over a forward-only input.
///
/// Every byte taken from the underlying reader passes through this buffer,
/// so whatever has not been consumed yet can always be handed back out
/// through [`Read`]/[`BufRead`].
pub struct BufferedSource<'a> {
    inner: Box<dyn Read + 'a>,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl<'a> BufferedSource<'a> {
    pub fn new<R: Read + 'a>(inner: R) -> Self {
        Self::with_capacity(BUFFER_SIZE, inner)
    }

    pub fn with_capacity<R: Read + 'a>(capacity: usize, inner: R) -> Self {
        Self {
            inner: Box::new(inner),
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes currently buffered and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.filled - self.pos
    }

    /// Returns the next `n` bytes without consuming them.
    ///
    /// Fails with `UnexpectedEof` if the input ends first, and with
    /// `InvalidInput` if `n` exceeds the window.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        let available = self.fill_to(n)?;
        if available < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input ended before the expected record",
            ));
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    /// Like [`peek`](Self::peek) but returns fewer than `n` bytes when the
    /// input ends first.
    pub fn peek_up_to(&mut self, n: usize) -> io::Result<&[u8]> {
        let available = self.fill_to(n)?.min(n);
        Ok(&self.buf[self.pos..self.pos + available])
    }

    /// Consumes and returns exactly `n` bytes.
    pub fn read_exact_vec(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    /// Consumes `n` bytes without copying them out.
    pub fn discard(&mut self, mut n: u64) -> io::Result<()> {
        while n > 0 {
            if self.pos == self.filled && self.fill_to(1)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input ended while skipping",
                ));
            }
            let step = (self.buffered() as u64).min(n) as usize;
            self.pos += step;
            n -= step as u64;
        }
        Ok(())
    }

    /// Whether the input is exhausted and nothing is left in the window.
    pub fn is_exhausted(&mut self) -> io::Result<bool> {
        Ok(self.fill_to(1)? == 0)
    }

    /// Tops the window up until at least `n` bytes are buffered or the input
    /// ends. Returns the number of buffered bytes.
    fn fill_to(&mut self, n: usize) -> io::Result<usize> {
        if n > self.buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "look-ahead larger than the buffer window",
            ));
        }
        if self.buffered() >= n {
            return Ok(self.buffered());
        }
        if self.pos + n > self.buf.len() {
            self.buf.copy_within(self.pos..self.filled, 0);
            self.filled -= self.pos;
            self.pos = 0;
        }
        while self.buffered() < n {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Ok(0) => break,
                Ok(read) => self.filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self.buffered())
    }
}

impl Read for BufferedSource<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        // Large reads with an empty window go straight to the input.
        if self.pos == self.filled && out.len() >= self.buf.len() {
            return self.inner.read(out);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for BufferedSource<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos == self.filled {
            self.fill_to(1)?;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
    }
}
