//! Multipart form data.
//!
//! Outgoing forms are streamed: [`Form::into_stream`] spawns a producer
//! task that writes parts into a bounded channel read by
//! [`MultipartStream`], so file content is never buffered as a whole.
//! Inbound multipart bodies are parsed by [`parse`].
//!
//! # Example
//!
//! ```
//! use fieldbind_core::multipart::{Form, Part};
//! use fieldbind_core::{Upload, UploadSource};
//!
//! let form = Form::with_boundary("b")
//!     .part(Part::text("name", "John Doe"))
//!     .part(Part::file("avatar", 0, Upload::new(UploadSource::Bytes("...".into()))));
//!
//! assert_eq!(form.content_type(), "multipart/form-data; boundary=b");
//! assert_eq!(form.parts()[1].filename(), Some("avatar_0"));
//! ```

mod parse;
mod stream;

use bytes::{BufMut, Bytes, BytesMut};

pub use self::parse::{ParsedMultipart, boundary_of, parse};
pub use self::stream::MultipartStream;
use crate::Upload;
use crate::cancel::CancelSignal;

/// Streaming settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Fixed boundary; generated per form when unset.
    pub boundary: Option<String>,
    /// Read size for file content.
    pub chunk_size: usize,
    /// Capacity of the channel between producer and stream.
    pub channel_capacity: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            boundary: None,
            chunk_size: 32 * 1024,
            channel_capacity: 8,
        }
    }
}

/// Content of a part.
#[derive(Debug, Clone)]
pub enum PartContent {
    /// A form value.
    Text(String),
    /// A file, read while streaming.
    File(Upload),
}

/// A single part in a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    content: PartContent,
}

impl Part {
    /// A form value part.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            content: PartContent::Text(value.into()),
        }
    }

    /// A file part for the `index`-th upload under `name`.
    ///
    /// The filename is normalized with [`normalize_filename`]; the content
    /// type is the declared one, else guessed from the filename.
    #[must_use]
    pub fn file(name: impl Into<String>, index: usize, upload: Upload) -> Self {
        let name = name.into();
        let filename = normalize_filename(&name, upload.filename().unwrap_or_default(), index);
        let content_type = upload
            .content_type()
            .map_or_else(|| guess_content_type(&filename), ToString::to_string);
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            content: PartContent::File(upload),
        }
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the part content.
    #[must_use]
    pub const fn content(&self) -> &PartContent {
        &self.content
    }

    /// Encode the boundary line and part headers.
    fn head(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\n");

        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quotes(&self.name).as_bytes());
        buf.put_slice(b"\"");
        if let Some(filename) = &self.filename {
            buf.put_slice(b"; filename=\"");
            buf.put_slice(escape_quotes(filename).as_bytes());
            buf.put_slice(b"\"");
        }
        buf.put_slice(b"\r\n");

        if let Some(content_type) = &self.content_type {
            buf.put_slice(b"Content-Type: ");
            buf.put_slice(content_type.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");
        buf.freeze()
    }
}

/// Name of the `index`-th upload under `key`.
///
/// An empty filename becomes `<key>_<index>`; otherwise the base name of
/// the declared filename is used.
#[must_use]
pub fn normalize_filename(key: &str, filename: &str, index: usize) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    if base.is_empty() {
        format!("{key}_{index}")
    } else {
        base.to_string()
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Guess the content type from a filename extension.
pub(crate) fn guess_content_type(filename: &str) -> String {
    let extension = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        // Text
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",
        // Archives
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" | "gzip" => "application/gzip",
        // Audio/Video
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// A multipart form: ordered parts plus a boundary.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create an empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create an empty form with a fixed boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `Content-Type` header value: `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Start streaming the form on the current Tokio runtime.
    ///
    /// The producer checks `cancel` before each write and while waiting on
    /// file content; once triggered, the stream ends with
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    #[must_use]
    pub fn into_stream(
        self,
        handle: &tokio::runtime::Handle,
        cancel: CancelSignal,
        config: &MultipartConfig,
    ) -> MultipartStream {
        stream::spawn(self, handle, cancel, config)
    }
}

/// Generate a boundary string.
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----FieldbindBoundary{timestamp:x}")
}
