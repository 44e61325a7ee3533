//! Bind HTTP requests to typed records, and build HTTP requests from them.
//!
//! A [`Record`] lists its fields and the directives declared on each one.
//! An [`Engine`] runs those directives: decoding reads query values, form
//! values, headers, cookies, path parameters, uploaded files and bodies
//! into the fields; encoding writes the fields back into an outgoing
//! [`Request`].
//!
//! # Example
//!
//! ```
//! use fieldbind::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct ListUsers {
//!     page: u32,
//!     tags: Vec<String>,
//!     token: Patch<String>,
//! }
//!
//! impl Record for ListUsers {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             field!(Self, page).directive("query", &["page"]).directive("default", &["1"]),
//!             field!(Self, tags).directive("query", &["tag"]),
//!             field!(Self, token).directive("header", &["x-api-token"]),
//!         ]
//!     }
//! }
//!
//! let engine = Engine::<ListUsers>::new()?;
//!
//! let request = http::Request::get("/users?tag=a&tag=b").body(bytes::Bytes::new())?;
//! let input = engine.decode(&InboundRequest::from_http(request)?)?;
//! assert_eq!(input.page, 1);
//! assert_eq!(input.tags, ["a", "b"]);
//! assert_eq!(input.token.get(), None);
//!
//! let request = engine.new_request(Method::GET, "https://api.example.com/users", &input)?;
//! assert_eq!(request.url().as_str(), "https://api.example.com/users?page=1&tag=a&tag=b");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
pub mod directive;
mod engine;
mod error;
pub mod prelude;
mod schema;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use directive::DirectiveRegistry;
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, InvalidFieldError, MultiInvalidFieldError, Result};
pub use schema::{Field, Record};

// Re-export core types
pub use fieldbind_core::{
    Bindable, Body, BodyFormat, CancelSignal, Canceller, ContentType, DecodeRuntime, Directive,
    DirectiveExecutor, EncodeRuntime, File, InboundRequest, JsonFormat, Method, NamedCoder,
    Patch, Payload, PayloadAccess, ReceivedFile, Registry, Request, RequestBody, RequestBuilder,
    Upload, UploadSource, bindable_scalar,
};

// Re-export core modules for codec and registry setup
pub use fieldbind_core::{codec, multipart, registry};
