//! Core types and traits for fieldbind.
//!
//! This crate provides the building blocks of the binding engine:
//! - [`Bindable`] and [`TypeDescriptor`] - Field storage and its shape
//! - [`codec`] - String and file codecs, with optional and slice adapters
//! - [`Registry`] - Type-driven codec resolution and named coders
//! - [`DirectiveExecutor`], [`DecodeRuntime`], [`EncodeRuntime`] - Directive runtime contract
//! - [`InboundRequest`] - Parsed view of a request to decode
//! - [`RequestBuilder`] and [`Request`] - Request assembly from encoded fields
//! - [`multipart`] - Streamed multipart bodies with cancellation
//! - [`Error`] and [`Result`] - Error handling

pub mod bindable;
mod body;
mod builder;
mod cancel;
pub mod codec;
mod error;
mod file;
mod inbound;
pub mod multipart;
mod patch;
pub mod registry;
mod request;
mod runtime;
mod type_kind;

pub use bindable::{Access, AccessMut, Bindable, Optional, Sequence};
pub use body::{
    BodyFormat, ContentType, JsonFormat, Payload, PayloadAccess, from_form, from_json, from_value,
    to_form, to_json,
};
pub use builder::{Body, RequestBuilder};
pub use cancel::{CancelSignal, Canceller};
pub use error::{Error, Result};
pub use file::{BoxedReader, File, ReceivedFile, SharedReader, Upload, UploadSource};
pub use inbound::{InboundRequest, Values};
pub use multipart::{MultipartConfig, MultipartStream};
pub use patch::Patch;
pub use registry::{NamedCoder, Registry};
pub use request::{Request, RequestBody};
pub use runtime::{
    DecodeRuntime, Directive, DirectiveExecutor, EncodeRuntime, FieldContext, FieldState,
};
pub use type_kind::{Shape, TypeDescriptor, TypeInfo, TypeKind, classify};

// Re-export http types used in public signatures
pub use http::{HeaderMap, Method, header};
