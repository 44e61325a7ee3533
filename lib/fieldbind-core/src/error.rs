//! Error types for fieldbind.

use derive_more::{Display, Error, From};

/// Main error type for codec resolution, field access and request assembly.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// No string codec can be resolved for the type.
    #[display("unsupported type: {type_name}")]
    #[from(skip)]
    UnsupportedType {
        /// Rust type name.
        type_name: &'static str,
    },

    /// The type is not registered as a file type.
    #[display("unsupported file type: {type_name}")]
    #[from(skip)]
    UnsupportedFileType {
        /// Rust type name.
        type_name: &'static str,
    },

    /// A codec bound to one type was applied to a value of another type.
    #[display("type mismatch: codec for {expected} applied to {actual}")]
    #[from(skip)]
    TypeMismatch {
        /// Type the codec was registered for.
        expected: &'static str,
        /// Type of the targeted value.
        actual: &'static str,
    },

    /// A value handed to a field setter is not assignable to the field.
    #[display("cannot assign {value_type} to field of type {field_type}")]
    #[from(skip)]
    FieldTypeMismatch {
        /// Declared field type.
        field_type: &'static str,
        /// Type of the supplied value.
        value_type: &'static str,
    },

    /// A codec failed to parse an input.
    #[display("invalid {type_name} {input:?}: {message}")]
    #[from(skip)]
    Parse {
        /// Target type name.
        type_name: &'static str,
        /// Raw input.
        input: String,
        /// Parser message.
        message: String,
    },

    /// An element of a sequence failed.
    #[display("at index {index}: {source}")]
    #[from(skip)]
    AtIndex {
        /// Zero-based element index.
        index: usize,
        /// Element error.
        source: Box<Error>,
    },

    /// A fixed-size sequence received the wrong number of values.
    #[display("expected {expected} values, got {actual}")]
    #[from(skip)]
    Length {
        /// Fixed length of the target.
        expected: usize,
        /// Number of provided values.
        actual: usize,
    },

    /// An optional container holds no value.
    #[display("invalid value")]
    #[from(skip)]
    Absent,

    /// A hybrid type lacks the requested capability.
    #[display("{capability} not implemented for {type_name}")]
    #[from(skip)]
    MissingCapability {
        /// Rust type name.
        type_name: &'static str,
        /// Capability name.
        capability: &'static str,
    },

    /// A required field was never set.
    #[display("missing required field")]
    #[from(skip)]
    MissingRequired,

    /// A field required to be non-zero holds its zero value.
    #[display("zero value")]
    #[from(skip)]
    ZeroValue,

    /// Form or attachments were combined with a raw body.
    #[display("cannot combine form or file uploads with a request body")]
    #[from(skip)]
    ConflictingBodySources,

    /// The operation was cancelled.
    #[display("operation cancelled")]
    #[from(skip)]
    Cancelled,

    /// An extraction failed for a lookup key and its raw values.
    #[display("key {key:?} with values {values:?}: {source}")]
    #[from(skip)]
    Extraction {
        /// Lookup key.
        key: String,
        /// Raw values (file names for uploads).
        values: Vec<String>,
        /// Underlying error.
        source: Box<Error>,
    },

    /// A registration name is already taken.
    #[display("duplicate {kind} {name:?}")]
    #[from(skip)]
    DuplicateRegistration {
        /// What was registered (coder, body format, directive).
        kind: &'static str,
        /// Registered name.
        name: String,
    },

    /// A named coder is not registered.
    #[display("unknown coder {_0:?}")]
    #[from(skip)]
    UnknownCoder(#[error(not(source))] String),

    /// A body format is not registered.
    #[display("unknown body format {_0:?}")]
    #[from(skip)]
    UnknownBodyFormat(#[error(not(source))] String),

    /// The process-wide registry was already read.
    #[display("global registry already in use")]
    #[from(skip)]
    RegistryFrozen,

    /// Malformed multipart payload or failed multipart stream.
    #[display("multipart error: {_0}")]
    #[from(skip)]
    Multipart(#[error(not(source))] String),

    /// Reading a request body failed.
    #[display("body error: {_0}")]
    #[from(skip)]
    Body(#[error(not(source))] String),

    /// A request body exceeded the configured limit.
    #[display("body exceeds {limit} bytes")]
    #[from(skip)]
    BodyTooLarge {
        /// Limit in bytes.
        limit: usize,
    },

    /// Streaming needs a Tokio runtime.
    #[display("no tokio runtime available")]
    #[from(skip)]
    NoRuntime,

    /// I/O error while reading an upload.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Invalid header name.
    #[display("invalid header name: {_0}")]
    #[from]
    InvalidHeaderName(http::header::InvalidHeaderName),

    /// Invalid header value.
    #[display("invalid header value: {_0}")]
    #[from]
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// Form URL-encoded deserialization error.
    #[display("form deserialization error: {_0}")]
    #[from]
    FormDeserialization(serde_urlencoded::de::Error),

    /// Free-form validation failure raised by a codec or directive.
    #[display("{_0}")]
    #[from(skip)]
    Invalid(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a parse error.
    #[must_use]
    pub fn parse(type_name: &'static str, input: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            type_name,
            input: input.into(),
            message: message.to_string(),
        }
    }

    /// Tag an element error with its index.
    #[must_use]
    pub fn at_index(index: usize, source: Self) -> Self {
        Self::AtIndex {
            index,
            source: Box::new(source),
        }
    }

    /// Tag an extraction error with its key and raw values.
    #[must_use]
    pub fn extraction(key: impl Into<String>, values: Vec<String>, source: Self) -> Self {
        Self::Extraction {
            key: key.into(),
            values,
            source: Box::new(source),
        }
    }

    /// Create a free-form validation error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error, or the error it wraps, is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::AtIndex { source, .. } | Self::Extraction { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Returns the failing element index of a sequence error.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::AtIndex { index, .. } => Some(*index),
            Self::Extraction { source, .. } => source.index(),
            _ => None,
        }
    }

    /// Returns the innermost error, skipping index and extraction tags.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::AtIndex { source, .. } | Self::Extraction { source, .. } => source.root(),
            other => other,
        }
    }
}
