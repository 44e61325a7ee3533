//! Decoding requests into records.

use std::sync::Arc;

use assert2::{check, let_assert};
use bytes::Bytes;
use fieldbind::codec::{codec_fn, typed};
use fieldbind::prelude::*;
use fieldbind::{InvalidFieldError, bindable_scalar};

fn engine<R: Record>() -> Engine<R> {
    Engine::builder()
        .registry(Arc::new(Registry::new()))
        .build()
        .expect("engine")
}

fn form_request(uri: &str, body: &'static str) -> InboundRequest {
    let request = http::Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Bytes::from_static(body.as_bytes()))
        .expect("request");
    InboundRequest::from_http(request).expect("inbound")
}

fn get_request(uri: &str) -> http::request::Builder {
    http::Request::get(uri)
}

fn field_error<R: std::fmt::Debug>(result: Result<R>) -> InvalidFieldError {
    let_assert!(Err(Error::InvalidField(err)) = result);
    err
}

// ============================================================================
// Scalars
// ============================================================================

#[derive(Debug, Default)]
struct AgeInput {
    age: i64,
}

impl Record for AgeInput {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Self, age as "Age").directive("form", &["age"])]
    }
}

#[test]
fn invalid_literal_names_field_source_key_and_value() {
    let engine = engine::<AgeInput>();
    let mut input = AgeInput { age: 7 };

    let err = field_error(engine.decode_into(&form_request("/", "age=apple"), &mut input));

    check!(err.field() == "Age");
    check!(err.directive() == "form");
    check!(err.key() == Some("age"));
    check!(err.values() == ["apple".to_string()]);
    check!(matches!(err.cause().root(), fieldbind_core::Error::Parse { .. }));
    insta::assert_snapshot!(
        err.to_string(),
        @r#"invalid field "Age" (form): key "age" with values ["apple"]: invalid i64 "apple": invalid digit found in string"#
    );
    check!(input.age == 7);
}

#[derive(Debug, Default)]
struct Narrow {
    level: i8,
}

impl Record for Narrow {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Self, level).directive("query", &["level"])]
    }
}

#[test]
fn out_of_range_integer_is_rejected() {
    let engine = engine::<Narrow>();
    let request = get_request("/?level=128").body(Bytes::new()).expect("request");
    let err = field_error(engine.decode(&InboundRequest::from_http(request).expect("inbound")));
    check!(err.values() == ["128".to_string()]);

    let request = get_request("/?level=-128").body(Bytes::new()).expect("request");
    let narrow = engine
        .decode(&InboundRequest::from_http(request).expect("inbound"))
        .expect("decode");
    check!(narrow.level == -128);
}

// ============================================================================
// Optional containers
// ============================================================================

#[derive(Debug, Default)]
struct Filter {
    limit: Patch<u32>,
}

impl Record for Filter {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Self, limit).directive("query", &["limit"])]
    }
}

#[test]
fn optional_absent_present_and_invalid() {
    let engine = engine::<Filter>();

    let absent = engine.decode(&form_request("/", "")).expect("absent");
    check!(absent.limit == Patch { value: 0, valid: false });

    let present = engine.decode(&form_request("/?limit=25", "")).expect("present");
    check!(present.limit == Patch::some(25));

    let mut filter = Filter::default();
    let err = field_error(engine.decode_into(&form_request("/?limit=many", ""), &mut filter));
    check!(err.key() == Some("limit"));
    check!(filter.limit == Patch { value: 0, valid: false });
}

// ============================================================================
// Sequences and bytes
// ============================================================================

#[derive(Debug, Default)]
struct Ids {
    ids: Vec<i32>,
    digest: Vec<u8>,
}

impl Record for Ids {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, ids).directive("query", &["id"]),
            field!(Self, digest).directive("query", &["digest"]),
        ]
    }
}

#[test]
fn sequence_failure_reports_index_without_partial_result() {
    let engine = engine::<Ids>();
    let mut ids = Ids {
        ids: vec![9],
        digest: Vec::new(),
    };

    let err = field_error(engine.decode_into(&form_request("/?id=1&id=2&id=x", ""), &mut ids));

    check!(err.cause().index() == Some(2));
    check!(err.values() == ["1".to_string(), "2".to_string(), "x".to_string()]);
    check!(ids.ids == [9]);
}

#[test]
fn sequence_keeps_request_order() {
    let engine = engine::<Ids>();
    let ids = engine
        .decode(&form_request("/?id=3&id=1&id=2", ""))
        .expect("decode");
    check!(ids.ids == [3, 1, 2]);
}

#[test]
fn bytes_decode_from_base64() {
    let engine = engine::<Ids>();
    let ids = engine
        .decode(&form_request("/?digest=aGk%3D", ""))
        .expect("decode");
    check!(ids.digest == b"hi");
}

// ============================================================================
// Field-set protocol and rule directives
// ============================================================================

#[derive(Debug, Default)]
struct Token {
    token: String,
}

impl Record for Token {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, token)
                .directive("query", &["access_token"])
                .directive("header", &["Authorization"])
                .directive("default", &["anonymous"]),
        ]
    }
}

#[test]
fn first_directive_with_input_wins() {
    let engine = engine::<Token>();
    let request = get_request("/?access_token=from-query")
        .header("authorization", "from-header")
        .body(Bytes::new())
        .expect("request");
    let token = engine
        .decode(&InboundRequest::from_http(request).expect("inbound"))
        .expect("decode");
    check!(token.token == "from-query");

    let request = get_request("/")
        .header("AUTHORIZATION", "from-header")
        .body(Bytes::new())
        .expect("request");
    let token = engine
        .decode(&InboundRequest::from_http(request).expect("inbound"))
        .expect("decode");
    check!(token.token == "from-header");

    let token = engine.decode(&form_request("/", "")).expect("decode");
    check!(token.token == "anonymous");
}

#[derive(Debug, Default)]
struct Strict {
    name: String,
    count: u16,
}

impl Record for Strict {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, name).directive("form", &[]).directive("required", &[]),
            field!(Self, count).directive("form", &[]).directive("nonzero", &[]),
        ]
    }
}

#[test]
fn required_and_nonzero() {
    let engine = engine::<Strict>();

    let strict = engine.decode(&form_request("/", "name=a&count=3")).expect("decode");
    check!(strict.name == "a");
    check!(strict.count == 3);

    let err = field_error(engine.decode(&form_request("/", "count=3")));
    check!(err.field() == "name");
    check!(err.directive() == "required");
    check!(matches!(err.cause(), fieldbind_core::Error::MissingRequired));

    let err = field_error(engine.decode(&form_request("/", "name=a&count=0")));
    check!(err.field() == "count");
    check!(matches!(err.cause(), fieldbind_core::Error::ZeroValue));
}

#[test]
fn present_but_empty_counts_as_set() {
    let engine = engine::<Strict>();
    let strict = engine.decode(&form_request("/", "name=&count=1")).expect("decode");
    check!(strict.name.is_empty());
}

// ============================================================================
// Other sources
// ============================================================================

#[derive(Debug, Default)]
struct Sources {
    id: u64,
    session: String,
    trace: Vec<String>,
}

impl Record for Sources {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, id).directive("path", &["id"]),
            field!(Self, session).directive("cookie", &["session"]),
            field!(Self, trace).directive("header", &["x-trace"]),
        ]
    }
}

#[test]
fn path_cookie_and_header() {
    let engine = engine::<Sources>();
    let request = get_request("/users/42")
        .header("cookie", "theme=dark; session=s3cr3t")
        .header("X-Trace", "a")
        .header("x-trace", "b")
        .body(Bytes::new())
        .expect("request");
    let inbound = InboundRequest::from_http(request)
        .expect("inbound")
        .with_path_param("id", "42");

    let sources = engine.decode(&inbound).expect("decode");
    check!(sources.id == 42);
    check!(sources.session == "s3cr3t");
    check!(sources.trace == ["a", "b"]);
}

#[derive(Debug, Default)]
struct DefaultKey {
    color: String,
}

impl Record for DefaultKey {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Self, color).directive("query", &[])]
    }
}

#[test]
fn key_defaults_to_field_name() {
    let engine = engine::<DefaultKey>();
    let input = engine.decode(&form_request("/?color=red", "")).expect("decode");
    check!(input.color == "red");
}

// ============================================================================
// Bodies and files
// ============================================================================

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct NewUser {
    name: String,
    tags: Vec<String>,
}

#[derive(Debug, Default)]
struct CreateUser {
    user: Payload<NewUser>,
}

impl Record for CreateUser {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Self, user).directive("body", &["JSON"])]
    }
}

#[test]
fn json_body() {
    let engine = engine::<CreateUser>();
    let request = http::Request::post("/users")
        .header("content-type", "application/json")
        .body(Bytes::from_static(br#"{"name":"Ann","tags":["x"]}"#))
        .expect("request");
    let input = engine
        .decode(&InboundRequest::from_http(request).expect("inbound"))
        .expect("decode");
    check!(*input.user == NewUser {
        name: "Ann".to_string(),
        tags: vec!["x".to_string()],
    });

    let request = http::Request::post("/users")
        .body(Bytes::from_static(br#"{"name":1}"#))
        .expect("request");
    let err = field_error(engine.decode(&InboundRequest::from_http(request).expect("inbound")));
    check!(err.directive() == "body");
    let_assert!(fieldbind_core::Error::JsonDeserialization { path, .. } = err.cause());
    check!(path == "name");
}

#[derive(Debug, Default)]
struct Upload {
    avatar: File,
    attachments: Vec<File>,
    note: Patch<String>,
}

impl Record for Upload {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, avatar).directive("form", &["avatar"]).directive("required", &[]),
            field!(Self, attachments).directive("form", &["attachment"]),
            field!(Self, note).directive("form", &["note"]),
        ]
    }
}

#[test]
fn multipart_files_and_values() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
        "Content-Type: image/png\r\n",
        "\r\n",
        "PNG\r\n",
        "--B\r\n",
        "Content-Disposition: form-data; name=\"attachment\"; filename=\"a.txt\"\r\n",
        "\r\n",
        "a\r\n",
        "--B\r\n",
        "Content-Disposition: form-data; name=\"attachment\"; filename=\"b.txt\"\r\n",
        "\r\n",
        "b\r\n",
        "--B\r\n",
        "Content-Disposition: form-data; name=\"note\"\r\n",
        "\r\n",
        "hello\r\n",
        "--B--\r\n",
    );
    let request = http::Request::post("/upload")
        .header("content-type", "multipart/form-data; boundary=B")
        .body(Bytes::from_static(body.as_bytes()))
        .expect("request");
    let engine = engine::<Upload>();
    let upload = engine
        .decode(&InboundRequest::from_http(request).expect("inbound"))
        .expect("decode");

    let_assert!(Some(avatar) = upload.avatar.received());
    check!(avatar.filename() == "me.png");
    check!(avatar.content_type() == Some("image/png"));
    check!(avatar.content().as_ref() == b"PNG");

    let names: Vec<_> = upload.attachments.iter().filter_map(File::filename).collect();
    check!(names == ["a.txt", "b.txt"]);
    check!(upload.note == Patch::some("hello".to_string()));
}

#[test]
fn missing_file_is_reported_by_required() {
    let engine = engine::<Upload>();
    let err = field_error(engine.decode(&form_request("/", "note=x")));
    check!(err.field() == "avatar");
    check!(err.directive() == "required");
}

// ============================================================================
// Custom coders and hybrid types
// ============================================================================

#[derive(Debug, Default)]
struct Flags {
    verbose: bool,
    mask: u16,
}

impl Record for Flags {
    fn fields() -> Vec<Field<Self>> {
        vec![
            field!(Self, verbose).directive("query", &["verbose"]),
            field!(Self, mask)
                .directive("query", &["mask"])
                .directive("coder", &["hex"]),
        ]
    }
}

#[test]
fn named_and_type_coders() {
    let mut registry = Registry::new();
    registry.register_coder::<bool>(typed::<bool, _>(codec_fn(
        |value: &bool| Ok(if *value { "on" } else { "off" }.to_string()),
        |input: &str| Ok(input == "on"),
    )));
    registry
        .register_named_coder::<u16>(
            "hex",
            typed::<u16, _>(codec_fn(
                |value: &u16| Ok(format!("{value:x}")),
                |input: &str| {
                    u16::from_str_radix(input, 16)
                        .map_err(|err| fieldbind_core::Error::parse("u16", input, err))
                },
            )),
        )
        .expect("register");

    let engine = Engine::<Flags>::builder()
        .registry(Arc::new(registry))
        .build()
        .expect("engine");
    let flags = engine
        .decode(&form_request("/?verbose=on&mask=ff", ""))
        .expect("decode");
    check!(flags.verbose);
    check!(flags.mask == 255);
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Level(u8);

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl std::str::FromStr for Level {
    type Err = std::num::ParseIntError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        input.trim_start_matches('L').parse().map(Level)
    }
}

bindable_scalar!(Level => [text_marshal, text_unmarshal]);

#[derive(Debug, Default)]
struct Levels {
    levels: Vec<Level>,
}

impl Record for Levels {
    fn fields() -> Vec<Field<Self>> {
        vec![field!(Self, levels).directive("query", &["level"])]
    }
}

#[test]
fn hybrid_type_in_sequence() {
    let engine = engine::<Levels>();
    let levels = engine
        .decode(&form_request("/?level=L1&level=L3", ""))
        .expect("decode");
    check!(levels.levels == [Level(1), Level(3)]);
}

#[tokio::test]
async fn body_limit_applies_when_reading() {
    let engine = Engine::<AgeInput>::builder()
        .registry(Arc::new(Registry::new()))
        .config(EngineConfig::builder().max_body_size(4).build())
        .build()
        .expect("engine");
    let request = http::Request::post("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(http_body_util::Full::new(Bytes::from_static(b"age=12345")))
        .expect("request");

    let_assert!(Err(Error::Core(fieldbind_core::Error::BodyTooLarge { limit: 4 })) =
        engine.decode_request(request).await);

    let request = http::Request::post("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(http_body_util::Full::new(Bytes::from_static(b"age=")))
        .expect("request");
    let_assert!(Err(Error::InvalidField(_)) = engine.decode_request(request).await);
}
