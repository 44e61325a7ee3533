//! Outgoing HTTP requests.
//!
//! A [`Request`] is what an encode pass produces: method, URL with query
//! and substituted path, headers and an optional body. Streamed multipart
//! bodies stay streams until the transport reads them.
//!
//! # Example
//!
//! ```
//! use fieldbind_core::Request;
//! use http::Method;
//!
//! let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
//! let request = Request::new(Method::GET, url);
//! assert!(request.body().is_none());
//! ```

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::{HeaderMap, Method};
use http_body::Frame;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};

use crate::multipart::MultipartStream;
use crate::{Error, Result};

/// Body of an outgoing request.
#[derive(Debug)]
pub enum RequestBody {
    /// Fully buffered content.
    Full(Bytes),
    /// Streamed multipart content.
    Stream(MultipartStream),
}

impl RequestBody {
    /// Drain the body into memory.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of a failed or cancelled stream.
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }

    fn into_box_body(self) -> BoxBody<Bytes, Error> {
        match self {
            Self::Full(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed(),
            Self::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed(),
        }
    }
}

/// An outgoing HTTP request with method, URL, headers, and optional body.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl Request {
    /// Create a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &url::Url {
        &self.url
    }

    /// Mutable access to the URL.
    pub const fn url_mut(&mut self) -> &mut url::Url {
        &mut self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by name, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }

    /// Take the body out of the request.
    pub const fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HeaderMap, Option<RequestBody>) {
        (self.method, self.url, self.headers, self.body)
    }

    /// Convert into an [`http::Request`] for any `http`-based client.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a valid URI.
    pub fn into_http(self) -> Result<http::Request<BoxBody<Bytes, Error>>> {
        let uri: http::Uri = self
            .url
            .as_str()
            .parse()
            .map_err(|err: http::uri::InvalidUri| Error::invalid(format!("invalid URI: {err}")))?;
        let body = match self.body {
            Some(body) => body.into_box_body(),
            None => Empty::new().map_err(|never| match never {}).boxed(),
        };
        let mut request = http::Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}
