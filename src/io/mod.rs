//! Forward-only inputs.
//!
//! Everything the decoder reads goes through a [`BufferedSource`]. The
//! other types here only produce the raw byte stream: a local file, stdin,
//! or the body of a single HTTP GET.

mod buffered;
mod http;
mod local;

pub use buffered::{BUFFER_SIZE, BufferedSource, MAX_READ, READ_AHEAD};
pub use http::HttpStreamReader;
pub use local::LocalFileReader;

/// Whether `location` names a remote archive.
pub fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
