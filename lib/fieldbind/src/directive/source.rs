//! Directives bound to one part of the request.

use fieldbind_core::{DecodeRuntime, DirectiveExecutor, EncodeRuntime, Result};

use super::extract::extract;
use super::sink::{Sink, encode};

/// `query`: the query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query;

impl DirectiveExecutor for Query {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        let query = runtime.request().query();
        extract(runtime, |key| query.get(key).cloned().unwrap_or_default(), None)
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        encode(runtime, Sink::Query)
    }
}

/// `form`: urlencoded or multipart form values, and uploaded files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Form;

impl DirectiveExecutor for Form {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        let request = runtime.request();
        extract(
            runtime,
            |key| request.form().get(key).cloned().unwrap_or_default(),
            Some(request.files()),
        )
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        encode(runtime, Sink::Form)
    }
}

/// `header`: request headers, names matched case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct Header;

impl DirectiveExecutor for Header {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        let request = runtime.request();
        extract(runtime, |key| request.header_values(key), None)
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        encode(runtime, Sink::Header)
    }
}

/// `cookie`: values of the `Cookie` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cookie;

impl DirectiveExecutor for Cookie {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        let cookies = runtime.request().cookies();
        extract(runtime, |key| cookies.get(key).cloned().unwrap_or_default(), None)
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        encode(runtime, Sink::Cookie)
    }
}

/// `path`: path parameters captured by the router, `{key}` placeholders
/// when encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Path;

impl DirectiveExecutor for Path {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        let params = runtime.request().path_params();
        extract(
            runtime,
            |key| params.get(key).cloned().into_iter().collect(),
            None,
        )
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        encode(runtime, Sink::Path)
    }
}
