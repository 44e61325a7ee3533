//! Inbound `multipart/form-data` parsing.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{Error, ReceivedFile, Result};

/// Maximum number of headers per part.
const MAX_PART_HEADERS: usize = 16;

/// Fields and files of a multipart body, in body order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMultipart {
    /// Value parts as `(name, value)`.
    pub fields: Vec<(String, String)>,
    /// File parts as `(name, file)`.
    pub files: Vec<(String, ReceivedFile)>,
}

/// Extract the boundary parameter of a `multipart/form-data` content type.
#[must_use]
pub fn boundary_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// Parse a complete multipart body.
///
/// A part is a file part when its `Content-Disposition` carries a
/// `filename` parameter.
///
/// # Errors
///
/// Returns [`Error::Multipart`] on a malformed body.
pub fn parse(body: &Bytes, boundary: &str) -> Result<ParsedMultipart> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let separator = [b"\r\n".as_slice(), delimiter].concat();

    let mut parsed = ParsedMultipart::default();
    let start = find(body, delimiter, 0).ok_or_else(|| malformed("missing opening boundary"))?;
    let mut cursor = start + delimiter.len();

    loop {
        let rest = body.get(cursor..).unwrap_or_default();
        if rest.starts_with(b"--") {
            return Ok(parsed);
        }
        let rest = rest
            .strip_prefix(b"\r\n")
            .ok_or_else(|| malformed("expected line break after boundary"))?;
        cursor = body.len() - rest.len();

        let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
        let (consumed, part_headers) = match httparse::parse_headers(rest, &mut headers) {
            Ok(httparse::Status::Complete(complete)) => complete,
            Ok(httparse::Status::Partial) => return Err(malformed("truncated part headers")),
            Err(err) => return Err(malformed(&err.to_string())),
        };
        let content_start = cursor + consumed;
        let content_end =
            find(body, &separator, content_start).ok_or_else(|| malformed("missing closing boundary"))?;
        let content = body.slice(content_start..content_end);
        cursor = content_end + separator.len();

        let headers = to_header_map(part_headers)?;
        let disposition = headers
            .get(http::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed("part without content disposition"))?;
        let name = disposition_param(disposition, "name")
            .ok_or_else(|| malformed("part without name"))?;

        match disposition_param(disposition, "filename") {
            Some(filename) => {
                let mut file = ReceivedFile::new(filename, content);
                if let Some(content_type) = headers
                    .get(http::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                {
                    file = file.with_content_type(content_type);
                }
                parsed.files.push((name, file.with_headers(headers)));
            }
            None => {
                let value = String::from_utf8(content.to_vec())
                    .map_err(|_| malformed("form value is not valid UTF-8"))?;
                parsed.fields.push((name, value));
            }
        }
    }
}

fn malformed(message: &str) -> Error {
    Error::Multipart(message.to_string())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}

fn to_header_map(headers: &[httparse::Header<'_>]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|_| malformed("invalid part header name"))?;
        map.append(name, HeaderValue::from_bytes(header.value)?);
    }
    Ok(map)
}

/// Value of a `Content-Disposition` parameter, quotes removed.
fn disposition_param(disposition: &str, name: &str) -> Option<String> {
    disposition.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let value = value.trim();
        let unquoted = value
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .map_or_else(
                || value.to_string(),
                |inner| inner.replace("\\\"", "\"").replace("\\\\", "\\"),
            );
        Some(unquoted)
    })
}
