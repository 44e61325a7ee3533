//! Encoding records into outgoing requests.

use std::sync::Arc;
use std::time::Duration;

use assert2::{check, let_assert};
use bytes::Bytes;
use fieldbind::prelude::*;
use fieldbind::{MultiInvalidFieldError, RequestBody};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

fn engine<R: Record>() -> Engine<R> {
    Engine::builder()
        .registry(Arc::new(Registry::new()))
        .build()
        .expect("engine")
}

fn invalid_fields(result: Result<Request>) -> MultiInvalidFieldError {
    let_assert!(Err(Error::InvalidFields(errors)) = result);
    errors
}

async fn body_text(request: &mut Request) -> String {
    let body = request.take_body().expect("body").collect().await.expect("collect");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

// ============================================================================
// Query, path, headers and cookies
// ============================================================================

#[derive(Debug, Default)]
struct ListItems {
    owner: String,
    tags: Vec<String>,
    limit: Patch<u32>,
    digest: Vec<u8>,
    token: String,
    session: String,
}

impl Record for ListItems {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, owner).directive("path", &["owner"]),
            field!(Self, tags).directive("query", &["tag"]),
            field!(Self, limit).directive("query", &["limit"]),
            field!(Self, digest).directive("query", &["digest"]),
            field!(Self, token)
                .directive("header", &["X-Api-Token"])
                .directive("omitempty", &[]),
            field!(Self, session).directive("cookie", &["session"]),
        ]
    }
}

#[test]
fn query_path_header_and_cookie() {
    let engine = engine::<ListItems>();
    let items = ListItems {
        owner: "ann lee".to_string(),
        tags: vec!["a b".to_string(), "c".to_string()],
        limit: Patch::some(10),
        digest: b"hi".to_vec(),
        token: "t0k".to_string(),
        session: "s1".to_string(),
    };

    let request = engine
        .new_request(
            Method::GET,
            "https://api.example.com/users/{owner}/items?keep=1",
            &items,
        )
        .expect("request");

    check!(
        request.url().as_str()
            == "https://api.example.com/users/ann%20lee/items?keep=1&digest=aGk%3D&limit=10&tag=a+b&tag=c"
    );
    check!(request.header("x-api-token") == Some("t0k"));
    check!(request.header("cookie") == Some("session=s1"));
    check!(request.body().is_none());
}

#[test]
fn absent_optional_and_empty_values_write_nothing() {
    let engine = engine::<ListItems>();
    let items = ListItems {
        owner: "ann".to_string(),
        ..ListItems::default()
    };

    let request = engine
        .new_request(Method::GET, "https://api.example.com/users/{owner}/items", &items)
        .expect("request");

    check!(request.url().as_str() == "https://api.example.com/users/ann/items?digest=");
    check!(request.header("x-api-token").is_none());
    check!(request.header("cookie") == Some("session="));
}

// ============================================================================
// Rule directives
// ============================================================================

#[derive(Debug, Default)]
struct Search {
    page: u32,
    q: String,
    size: u16,
}

impl Record for Search {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, page)
                .directive("query", &["page"])
                .directive("default", &["1"]),
            field!(Self, q).directive("query", &["q"]).directive("nonzero", &[]),
            field!(Self, size).directive("nonzero", &[]).directive("query", &["size"]),
        ]
    }
}

#[test]
fn default_fills_zero_fields() {
    let engine = engine::<Search>();
    let search = Search {
        page: 0,
        q: "rust".to_string(),
        size: 20,
    };
    let request = engine
        .new_request(Method::GET, "https://example.com/search", &search)
        .expect("request");
    check!(request.url().query() == Some("page=1&q=rust&size=20"));

    let search = Search {
        page: 3,
        ..search
    };
    let request = engine
        .new_request(Method::GET, "https://example.com/search", &search)
        .expect("request");
    check!(request.url().query() == Some("page=3&q=rust&size=20"));
}

#[test]
fn every_invalid_field_is_reported() {
    let engine = engine::<Search>();
    let errors = invalid_fields(engine.new_request(
        Method::GET,
        "https://example.com/search",
        &Search::default(),
    ));

    let fields: Vec<_> = errors.errors().iter().map(|err| (err.field(), err.directive())).collect();
    check!(fields == [("q", "nonzero"), ("size", "nonzero")]);
    insta::assert_snapshot!(
        errors.to_string(),
        @r#"2 invalid fields: invalid field "q" (nonzero): zero value; invalid field "size" (nonzero): zero value"#
    );
}

#[test]
fn invalid_url_is_a_core_error() {
    let engine = engine::<Search>();
    let_assert!(
        Err(Error::Core(fieldbind_core::Error::InvalidUrl(_))) =
            engine.new_request(Method::GET, "not a url", &Search::default())
    );
}

// ============================================================================
// Bodies
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct Profile {
    name: String,
}

#[derive(Debug, Default)]
struct UpdateProfile {
    id: u64,
    profile: Payload<Profile>,
}

impl Record for UpdateProfile {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, id).directive("path", &["id"]),
            field!(Self, profile).directive("body", &[]),
        ]
    }
}

#[tokio::test]
async fn json_body() {
    let engine = engine::<UpdateProfile>();
    let update = UpdateProfile {
        id: 7,
        profile: Payload(Profile {
            name: "Ann".to_string(),
        }),
    };
    let mut request = engine
        .new_request(Method::PUT, "https://example.com/profiles/{id}", &update)
        .expect("request");

    check!(request.url().path() == "/profiles/7");
    check!(request.header("content-type") == Some("application/json"));
    check!(body_text(&mut request).await == r#"{"name":"Ann"}"#);
}

#[derive(Debug, Default)]
struct Mixed {
    note: String,
    profile: Payload<Profile>,
}

impl Record for Mixed {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, note).directive("form", &["note"]),
            field!(Self, profile).directive("body", &["json"]),
        ]
    }
}

#[test]
fn form_and_body_conflict() {
    let engine = engine::<Mixed>();
    let mixed = Mixed {
        note: "hi".to_string(),
        ..Mixed::default()
    };
    let_assert!(
        Err(Error::Core(fieldbind_core::Error::ConflictingBodySources)) =
            engine.new_request(Method::POST, "https://example.com/", &mixed)
    );
}

#[derive(Debug, Default)]
struct Login {
    user: String,
    scopes: Vec<String>,
}

impl Record for Login {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, user).directive("form", &["user"]),
            field!(Self, scopes).directive("form", &["scope"]),
        ]
    }
}

#[tokio::test]
async fn urlencoded_form() {
    let engine = engine::<Login>();
    let login = Login {
        user: "ann".to_string(),
        scopes: vec!["read".to_string(), "write all".to_string()],
    };
    let mut request = engine
        .new_request(Method::POST, "https://example.com/login", &login)
        .expect("request");

    check!(request.header("content-type") == Some("application/x-www-form-urlencoded"));
    check!(body_text(&mut request).await == "scope=read&scope=write+all&user=ann");
}

// ============================================================================
// Multipart
// ============================================================================

#[derive(Debug, Default)]
struct Upload {
    title: String,
    avatar: File,
    empty: Patch<File>,
}

impl Record for Upload {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, title).directive("form", &["title"]),
            field!(Self, avatar).directive("form", &["avatar"]),
            field!(Self, empty).directive("form", &["empty"]),
        ]
    }
}

fn multipart_engine() -> Engine<Upload> {
    Engine::builder()
        .registry(Arc::new(Registry::new()))
        .config(
            EngineConfig::builder()
                .multipart_boundary("XYZ")
                .multipart_chunk_size(2)
                .build(),
        )
        .build()
        .expect("engine")
}

#[tokio::test]
async fn multipart_with_attachment() {
    let engine = multipart_engine();
    let upload = Upload {
        title: "me".to_string(),
        avatar: File::from_bytes("photos/me.png", "PNG"),
        empty: Patch::none(),
    };

    let mut request = engine
        .new_request(Method::POST, "https://example.com/upload", &upload)
        .expect("request");
    check!(request.header("content-type") == Some("multipart/form-data; boundary=XYZ"));
    insta::assert_snapshot!(body_text(&mut request).await.replace("\r\n", "\n"), @r#"
    --XYZ
    Content-Disposition: form-data; name="title"

    me
    --XYZ
    Content-Disposition: form-data; name="avatar"; filename="me.png"
    Content-Type: image/png

    PNG
    --XYZ--
    "#);
}

#[tokio::test]
async fn cancelling_a_streamed_upload() {
    let engine = multipart_engine();
    let (reader, mut writer) = tokio::io::duplex(64);
    let upload = Upload {
        title: "slow".to_string(),
        avatar: File::from_reader(reader).with_content_type("application/octet-stream"),
        empty: Patch::none(),
    };
    let canceller = Canceller::new();

    let mut request = engine
        .new_request_with_cancel(
            Method::POST,
            "https://example.com/upload",
            &upload,
            canceller.signal(),
        )
        .expect("request");
    let_assert!(Some(RequestBody::Stream(mut stream)) = request.take_body());

    writer.write_all(b"abcd").await.expect("write");
    let mut received = Vec::new();
    while !String::from_utf8_lossy(&received).contains("abcd") {
        let chunk = stream.next().await.expect("chunk").expect("data");
        received.extend_from_slice(&chunk);
    }

    canceller.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(_)) => {}
                Some(Err(err)) => return Some(err),
                None => return None,
            }
        }
    })
    .await
    .expect("stream ends after cancel");

    let_assert!(Some(err) = outcome);
    check!(err.is_cancelled());
    check!(!String::from_utf8_lossy(&received).contains("--XYZ--"));
    drop(writer);
}

#[derive(Debug, Default)]
struct Attachments {
    files: Vec<File>,
    body: Payload<Profile>,
}

impl Record for Attachments {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, files).directive("form", &["file"]),
            field!(Self, body).directive("body", &[]),
        ]
    }
}

#[test]
fn attachments_conflict_with_body() {
    let engine = engine::<Attachments>();
    let attachments = Attachments {
        files: vec![File::from_bytes("a.txt", "a")],
        body: Payload(Profile::default()),
    };
    let result = engine.new_request(Method::POST, "https://example.com/", &attachments);
    let_assert!(Err(Error::Core(fieldbind_core::Error::ConflictingBodySources)) = result);
}

// ============================================================================
// Round trip through decode
// ============================================================================

#[derive(Debug, Default, PartialEq)]
struct Filter {
    since: Patch<chrono::DateTime<chrono::Utc>>,
    ids: Vec<i64>,
    secret: Vec<u8>,
}

impl Record for Filter {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, since).directive("query", &["since"]),
            field!(Self, ids).directive("query", &["id"]),
            field!(Self, secret).directive("header", &["x-secret"]),
        ]
    }
}

#[test]
fn encoded_request_decodes_back() {
    let engine = engine::<Filter>();
    let since = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
        .expect("timestamp")
        .with_timezone(&chrono::Utc);
    let filter = Filter {
        since: Patch::some(since),
        ids: vec![3, 1],
        secret: b"hi".to_vec(),
    };

    let request = engine
        .new_request(Method::GET, "https://example.com/events", &filter)
        .expect("request");
    let (method, url, headers, _) = request.into_parts();
    let mut inbound = http::Request::builder()
        .method(method)
        .uri(url.as_str())
        .body(Bytes::new())
        .expect("request");
    *inbound.headers_mut() = headers;

    let decoded = engine
        .decode(&InboundRequest::from_http(inbound).expect("inbound"))
        .expect("decode");
    check!(decoded == filter);
}
