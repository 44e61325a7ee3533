//! Decoded view of an inbound HTTP request.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::body::{ContentType, from_form};
use crate::{Error, ReceivedFile, Result, multipart};

/// Multi-valued string data keyed by name, values in request order.
pub type Values = BTreeMap<String, Vec<String>>;

/// An inbound request, parsed into the sources directives read from.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Values,
    form: Values,
    files: BTreeMap<String, Vec<ReceivedFile>>,
    cookies: Values,
    path_params: BTreeMap<String, String>,
    body: Bytes,
}

impl InboundRequest {
    /// Parse a request whose body was already collected.
    ///
    /// Form bodies (`application/x-www-form-urlencoded` and
    /// `multipart/form-data`) are parsed into form values and files; other
    /// bodies are kept as is for body directives.
    ///
    /// # Errors
    ///
    /// Returns an error when the query string or a form body is malformed.
    pub fn from_http(request: http::Request<Bytes>) -> Result<Self> {
        let (parts, body) = request.into_parts();

        let query = match parts.uri.query() {
            Some(query) => group(from_form(query.as_bytes())?),
            None => Values::new(),
        };
        let cookies = parse_cookies(&parts.headers);

        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let (form, files) = match ContentType::from_header(content_type) {
            Some(ContentType::FormUrlEncoded) => (group(from_form(&body)?), BTreeMap::new()),
            Some(ContentType::Multipart) => {
                let boundary = multipart::boundary_of(content_type)
                    .ok_or_else(|| Error::Multipart("missing boundary".to_string()))?;
                let parsed = multipart::parse(&body, &boundary)?;
                let mut files: BTreeMap<String, Vec<ReceivedFile>> = BTreeMap::new();
                for (name, file) in parsed.files {
                    files.entry(name).or_default().push(file);
                }
                (group(parsed.fields), files)
            }
            _ => (Values::new(), BTreeMap::new()),
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            query,
            form,
            files,
            cookies,
            path_params: BTreeMap::new(),
            body,
        })
    }

    /// Collect the body of a request under a size limit, then parse it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyTooLarge`] past `limit`, [`Error::Body`] when
    /// reading fails, or any error of [`InboundRequest::from_http`].
    pub async fn read<B>(request: http::Request<B>, limit: usize) -> Result<Self>
    where
        B: http_body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = request.into_parts();
        let collected = Limited::new(body, limit).collect().await.map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                Error::BodyTooLarge { limit }
            } else {
                Error::Body(err.to_string())
            }
        })?;
        Self::from_http(http::Request::from_parts(parts, collected.to_bytes()))
    }

    /// Add a path parameter captured by a router.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query string values.
    #[must_use]
    pub const fn query(&self) -> &Values {
        &self.query
    }

    /// Form values, from a urlencoded or multipart body.
    #[must_use]
    pub const fn form(&self) -> &Values {
        &self.form
    }

    /// Uploaded files of a multipart body.
    #[must_use]
    pub const fn files(&self) -> &BTreeMap<String, Vec<ReceivedFile>> {
        &self.files
    }

    /// Cookie values.
    #[must_use]
    pub const fn cookies(&self) -> &Values {
        &self.cookies
    }

    /// Path parameters.
    #[must_use]
    pub const fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    /// Raw body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// All values of a header; header names are case-insensitive.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }
}

fn group(pairs: Vec<(String, String)>) -> Values {
    let mut values = Values::new();
    for (key, value) in pairs {
        values.entry(key).or_default().push(value);
    }
    values
}

fn parse_cookies(headers: &HeaderMap) -> Values {
    let pairs = headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|cookie| {
            let (name, value) = cookie.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect();
    group(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> http::request::Builder {
        http::Request::builder().method(Method::POST).uri(uri)
    }

    #[test]
    fn query_and_cookies() {
        let req = request("/items?tag=a&tag=b%20c&page=2")
            .header("Cookie", "session=abc; theme=\"dark\"")
            .header("Cookie", "session=def")
            .body(Bytes::new())
            .expect("request");
        let inbound = InboundRequest::from_http(req).expect("parse");

        assert_eq!(inbound.query()["tag"], vec!["a", "b c"]);
        assert_eq!(inbound.query()["page"], vec!["2"]);
        assert_eq!(inbound.cookies()["session"], vec!["abc", "def"]);
        assert_eq!(inbound.cookies()["theme"], vec!["dark"]);
        assert!(inbound.form().is_empty());
    }

    #[test]
    fn urlencoded_form() {
        let req = request("/")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"name=Ann&age=30&age=31"))
            .expect("request");
        let inbound = InboundRequest::from_http(req).expect("parse");
        assert_eq!(inbound.form()["name"], vec!["Ann"]);
        assert_eq!(inbound.form()["age"], vec!["30", "31"]);
    }

    #[test]
    fn multipart_form() {
        let body = "--B\r\nContent-Disposition: form-data; name=\"n\"\r\n\r\nv\r\n--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"x.txt\"\r\n\r\ncontent\r\n--B--\r\n";
        let req = request("/")
            .header("Content-Type", "multipart/form-data; boundary=B")
            .body(Bytes::from(body))
            .expect("request");
        let inbound = InboundRequest::from_http(req).expect("parse");
        assert_eq!(inbound.form()["n"], vec!["v"]);
        let files = &inbound.files()["f"];
        assert_eq!(files.len(), 1);
        assert_eq!(files.first().map(ReceivedFile::filename), Some("x.txt"));
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = request("/")
            .header("X-Api-Key", "k1")
            .header("x-api-key", "k2")
            .body(Bytes::new())
            .expect("request");
        let inbound = InboundRequest::from_http(req)
            .expect("parse")
            .with_path_param("id", "42");
        assert_eq!(inbound.header_values("X-API-KEY"), vec!["k1", "k2"]);
        assert_eq!(inbound.path_params()["id"], "42");
    }

    #[tokio::test]
    async fn read_enforces_limit() {
        let req = request("/")
            .body(http_body_util::Full::new(Bytes::from_static(b"0123456789")))
            .expect("request");
        let err = InboundRequest::read(req, 4).await.expect_err("too large");
        assert!(matches!(err, Error::BodyTooLarge { limit: 4 }));

        let req = request("/")
            .body(http_body_util::Full::new(Bytes::from_static(b"0123")))
            .expect("request");
        let inbound = InboundRequest::read(req, 4).await.expect("read");
        assert_eq!(inbound.body().as_ref(), b"0123");
    }
}
