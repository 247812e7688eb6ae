use log::{debug, info};
use reqwest::blocking::{Client, Response};
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};

/// Body of a single HTTP GET, read as it arrives.
///
/// No Range requests are made, so any server works, but nothing can be
/// re-fetched: a dropped connection is a read error.
pub struct HttpStreamReader {
    response: Response,
    content_length: Option<u64>,
    transferred_bytes: Arc<AtomicU64>,
}

impl HttpStreamReader {
    pub fn new(url: &str) -> Result<Self> {
        // More than one rustls provider is compiled in, so none becomes the
        // process default on its own.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        // No overall timeout: the body may take arbitrarily long to stream.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()?;

        let response = client.get(url).send()?;
        if !response.status().is_success() {
            bail!("HTTP request failed with status: {}", response.status());
        }

        info!("streaming {} ({})", url, response.status());

        Ok(Self {
            content_length: response.content_length(),
            response,
            transferred_bytes: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Length announced by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Shared counter that keeps updating after the reader has been boxed.
    pub fn transfer_counter(&self) -> Arc<AtomicU64> {
        self.transferred_bytes.clone()
    }
}

impl Read for HttpStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.response.read(buf)?;
        if n == 0 {
            debug!("response body complete after {} bytes", self.transferred_bytes());
        }
        self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}
