//! Request assembly.
//!
//! Directives push their encoded contributions into a [`RequestBuilder`]
//! during an encode pass. [`RequestBuilder::populate`] then writes all of
//! them onto a [`Request`] at once and consumes the builder.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tracing::debug;

use crate::body::{ContentType, to_form};
use crate::cancel::CancelSignal;
use crate::multipart::{Form, MultipartConfig, Part};
use crate::request::{Request, RequestBody};
use crate::{Error, Result, Upload};

/// Encodes everything in a path segment except unreserved characters and
/// sub-delimiters.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%');

/// A raw body contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    format: String,
    content_type: String,
    bytes: Bytes,
}

impl Body {
    /// Create a body of the named format.
    #[must_use]
    pub fn new(format: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            format: format.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Format name (`json`, …).
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// `Content-Type` of the body.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Encoded content.
    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Accumulates the contributions of one encode pass.
///
/// Setters replace the previous values of their key.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    query: BTreeMap<String, Vec<String>>,
    form: BTreeMap<String, Vec<String>>,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    path: BTreeMap<String, String>,
    attachments: BTreeMap<String, Vec<Upload>>,
    body: Option<Body>,
}

impl RequestBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query values of a key.
    pub fn set_query(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.query.insert(key.into(), values);
    }

    /// Set the form values of a key.
    pub fn set_form(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.form.insert(key.into(), values);
    }

    /// Set the values of a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or a value is not a valid header.
    pub fn set_header(&mut self, key: &str, values: Vec<String>) -> Result<()> {
        let name = HeaderName::from_bytes(key.as_bytes())?;
        let values = values
            .iter()
            .map(|value| HeaderValue::from_str(value))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.headers.remove(&name);
        for value in values {
            self.headers.append(name.clone(), value);
        }
        Ok(())
    }

    /// Set the cookies of a name, one cookie per value.
    pub fn set_cookie(&mut self, name: &str, values: Vec<String>) {
        self.cookies.retain(|(existing, _)| existing != name);
        self.cookies
            .extend(values.into_iter().map(|value| (name.to_string(), value)));
    }

    /// Set a path placeholder; only the first value is used.
    pub fn set_path(&mut self, key: impl Into<String>, values: Vec<String>) {
        if let Some(value) = values.into_iter().next() {
            self.path.insert(key.into(), value);
        }
    }

    /// Set the file uploads of a key.
    pub fn set_attachment(&mut self, key: impl Into<String>, uploads: Vec<Upload>) {
        self.attachments.insert(key.into(), uploads);
    }

    /// Set the raw body.
    pub fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Query values.
    #[must_use]
    pub const fn query(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query
    }

    /// Form values.
    #[must_use]
    pub const fn form(&self) -> &BTreeMap<String, Vec<String>> {
        &self.form
    }

    /// Headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Cookies, in order.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Path placeholders.
    #[must_use]
    pub const fn path(&self) -> &BTreeMap<String, String> {
        &self.path
    }

    /// File uploads.
    #[must_use]
    pub const fn attachments(&self) -> &BTreeMap<String, Vec<Upload>> {
        &self.attachments
    }

    /// Raw body.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    fn has_form(&self) -> bool {
        !self.form.is_empty() || !self.attachments.is_empty()
    }

    /// Write every contribution onto `request`.
    ///
    /// - query values are appended to the URL query;
    /// - form values become a urlencoded body, or a streamed multipart
    ///   body when there are attachments;
    /// - the raw body is set with its content type;
    /// - `{key}` placeholders in the URL path are replaced by their
    ///   percent-encoded value;
    /// - headers replace the request headers of the same name;
    /// - cookies are appended to the `Cookie` header.
    ///
    /// `request` is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingBodySources`] when form values or
    /// attachments are combined with a raw body, and [`Error::NoRuntime`]
    /// when a multipart body has to be streamed outside a Tokio runtime.
    pub fn populate(
        self,
        request: &mut Request,
        cancel: CancelSignal,
        config: &MultipartConfig,
    ) -> Result<()> {
        if self.has_form() && self.body.is_some() {
            return Err(Error::ConflictingBodySources);
        }

        let url = self.populated_url(request.url());
        let cookie = self.cookie_header(request.headers())?;
        let body = if self.attachments.is_empty() {
            match (&self.body, self.form.is_empty()) {
                (Some(body), _) => Some((
                    HeaderValue::from_str(body.content_type())?,
                    RequestBody::Full(body.bytes.clone()),
                )),
                (None, false) => Some((
                    HeaderValue::from_static(ContentType::FormUrlEncoded.as_str()),
                    RequestBody::Full(Bytes::from(to_form(&self.form_pairs())?)),
                )),
                (None, true) => None,
            }
        } else {
            let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
            let form = self.multipart_form(config);
            let content_type = HeaderValue::from_str(&form.content_type())?;
            debug!(
                fields = self.form.len(),
                attachments = self.attachments.len(),
                "streaming multipart form"
            );
            Some((
                content_type,
                RequestBody::Stream(form.into_stream(&handle, cancel, config)),
            ))
        };

        debug!(
            query = self.query.len(),
            headers = self.headers.keys_len(),
            cookies = self.cookies.len(),
            path = self.path.len(),
            body = body.is_some(),
            "populating request"
        );

        *request.url_mut() = url;
        let headers = request.headers_mut();
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.headers {
            headers.append(name, value.clone());
        }
        if let Some(cookie) = cookie {
            headers.insert(http::header::COOKIE, cookie);
        }
        if let Some((content_type, body)) = body {
            headers.insert(http::header::CONTENT_TYPE, content_type);
            request.set_body(body);
        }
        Ok(())
    }

    fn populated_url(&self, url: &url::Url) -> url::Url {
        let mut url = url.clone();
        if !self.path.is_empty() {
            let path = substitute_path(url.path(), &self.path);
            url.set_path(&path);
        }
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, values) in &self.query {
                for value in values {
                    pairs.append_pair(key, value);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        url
    }

    fn cookie_header(&self, headers: &HeaderMap) -> Result<Option<HeaderValue>> {
        if self.cookies.is_empty() {
            return Ok(None);
        }
        let added = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        let cookie = match headers
            .get(http::header::COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            Some(existing) if !existing.is_empty() => format!("{existing}; {added}"),
            _ => added,
        };
        Ok(Some(HeaderValue::from_str(&cookie)?))
    }

    fn form_pairs(&self) -> Vec<(&str, &str)> {
        self.form
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.as_str(), value.as_str())))
            .collect()
    }

    fn multipart_form(&self, config: &MultipartConfig) -> Form {
        let mut form = config
            .boundary
            .as_ref()
            .map_or_else(Form::new, Form::with_boundary);
        for (key, value) in self.form_pairs() {
            form = form.part(Part::text(key, value));
        }
        for (key, uploads) in &self.attachments {
            for (index, upload) in uploads.iter().enumerate() {
                form = form.part(Part::file(key.clone(), index, upload.clone()));
            }
        }
        form
    }
}

/// Replace `{key}` placeholders, raw or percent-encoded, in one pass.
///
/// Substituted values are never scanned again; unknown placeholders are
/// kept as they are.
fn substitute_path(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(['{', '%']) {
        let (before, from) = rest.split_at(start);
        path.push_str(before);

        let (open, close) = if from.starts_with('{') {
            ("{", "}")
        } else if from.get(..3).is_some_and(|open| open.eq_ignore_ascii_case("%7B")) {
            ("%7B", "%7D")
        } else {
            path.push('%');
            rest = from.get(1..).unwrap_or_default();
            continue;
        };

        let inner = from.get(open.len()..).unwrap_or_default();
        let end = if close == "}" {
            inner.find('}')
        } else {
            inner.to_ascii_uppercase().find(close)
        };
        let Some(end) = end else {
            path.push_str(from);
            return path;
        };
        let key = inner.get(..end).unwrap_or_default();
        let placeholder_len = open.len() + end + close.len();
        match params.get(key) {
            Some(value) => {
                path.extend(utf8_percent_encode(value, PATH_SEGMENT_ENCODE_SET));
            }
            None => path.push_str(from.get(..placeholder_len).unwrap_or_default()),
        }
        rest = from.get(placeholder_len..).unwrap_or_default();
    }
    path.push_str(rest);
    path
}
