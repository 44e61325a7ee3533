//! File uploads.
//!
//! [`Upload`] is what an encoder hands to the request builder; it names a
//! content source that is only opened when the multipart body streams.
//! [`ReceivedFile`] is one file part of an inbound multipart request.
//! [`File`] is the built-in file type and plays both roles.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

use crate::bindable::Bindable;
use crate::codec::{FileMarshal, FileUnmarshal};
use crate::{Error, Result, TypeDescriptor};

/// A boxed async reader.
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// A reader that can be taken exactly once.
#[derive(Clone)]
pub struct SharedReader(Arc<Mutex<Option<BoxedReader>>>);

impl SharedReader {
    /// Wrap a reader.
    #[must_use]
    pub fn new(reader: impl AsyncRead + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::pin(reader)))))
    }

    /// Take the reader; `None` once it was taken.
    pub async fn take(&self) -> Option<BoxedReader> {
        self.0.lock().await.take()
    }
}

impl fmt::Debug for SharedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedReader")
    }
}

/// Where upload content comes from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// In-memory content.
    Bytes(Bytes),
    /// A file on the local file system.
    Path(PathBuf),
    /// A one-shot stream.
    Reader(SharedReader),
}

/// A file contribution to an outgoing multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    source: UploadSource,
}

impl Upload {
    /// An upload from a source.
    #[must_use]
    pub const fn new(source: UploadSource) -> Self {
        Self {
            filename: None,
            content_type: None,
            source,
        }
    }

    /// Set the filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared filename.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Content source.
    #[must_use]
    pub const fn source(&self) -> &UploadSource {
        &self.source
    }

    /// Read the whole content.
    pub async fn read_all(&self) -> Result<Bytes> {
        match &self.source {
            UploadSource::Bytes(bytes) => Ok(bytes.clone()),
            UploadSource::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            UploadSource::Reader(reader) => {
                let mut reader = reader
                    .take()
                    .await
                    .ok_or_else(|| Error::invalid("upload stream already consumed"))?;
                let mut content = Vec::new();
                reader.read_to_end(&mut content).await?;
                Ok(Bytes::from(content))
            }
        }
    }
}

/// A file part received in a multipart request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceivedFile {
    filename: String,
    content_type: Option<String>,
    headers: HeaderMap,
    content: Bytes,
}

impl ReceivedFile {
    /// Create a received file.
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            headers: HeaderMap::new(),
            content: content.into(),
        }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the part headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Client-side filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Content type of the part.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Part headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Content size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Content.
    #[must_use]
    pub const fn content(&self) -> &Bytes {
        &self.content
    }
}

/// The built-in file type.
///
/// Decoding stores the received part. For encoding, create it with
/// [`File::from_path`], [`File::from_bytes`] or [`File::from_reader`]; a
/// received file can also be forwarded as is.
#[derive(Debug, Clone, Default)]
pub struct File {
    received: Option<ReceivedFile>,
    upload: Option<Upload>,
}

impl File {
    /// Upload a local file.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let upload = Upload::new(UploadSource::Path(path.clone()))
            .with_filename(path.to_string_lossy().into_owned());
        Self {
            received: None,
            upload: Some(upload),
        }
    }

    /// Upload in-memory content.
    #[must_use]
    pub fn from_bytes(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let upload = Upload::new(UploadSource::Bytes(content.into())).with_filename(filename);
        Self {
            received: None,
            upload: Some(upload),
        }
    }

    /// Upload a stream; the stream is consumed by the first request sent.
    #[must_use]
    pub fn from_reader(reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            received: None,
            upload: Some(Upload::new(UploadSource::Reader(SharedReader::new(reader)))),
        }
    }

    /// Set the content type of the upload.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.upload = self
            .upload
            .map(|upload| upload.with_content_type(content_type));
        self
    }

    /// Returns `true` if created for an upload.
    #[must_use]
    pub const fn is_upload(&self) -> bool {
        self.upload.is_some()
    }

    /// Filename of the upload or of the received part.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match (&self.upload, &self.received) {
            (Some(upload), _) => upload.filename(),
            (None, Some(received)) => Some(received.filename()),
            (None, None) => None,
        }
    }

    /// The received part, on the decoding side.
    #[must_use]
    pub const fn received(&self) -> Option<&ReceivedFile> {
        self.received.as_ref()
    }

    /// Read the whole content.
    pub async fn read_all(&self) -> Result<Bytes> {
        self.marshal_file()?.read_all().await
    }
}

impl FileMarshal for File {
    fn marshal_file(&self) -> Result<Upload> {
        if let Some(upload) = &self.upload {
            return Ok(upload.clone());
        }
        let received = self
            .received
            .as_ref()
            .ok_or_else(|| Error::invalid("invalid upload: no filename or reader"))?;
        let mut upload = Upload::new(UploadSource::Bytes(received.content().clone()))
            .with_filename(received.filename());
        if let Some(content_type) = received.content_type() {
            upload = upload.with_content_type(content_type);
        }
        Ok(upload)
    }
}

impl FileUnmarshal for File {
    fn unmarshal_file(&mut self, file: &ReceivedFile) -> Result<()> {
        self.received = Some(file.clone());
        self.upload = None;
        Ok(())
    }
}

impl Bindable for File {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar::<Self>()
    }

    fn descriptor(&self) -> TypeDescriptor {
        Self::describe()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn is_zero(&self) -> bool {
        self.received.is_none() && self.upload.is_none()
    }
}
