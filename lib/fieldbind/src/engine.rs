//! The binding engine: decode requests into records, build requests from
//! records.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use fieldbind_core::{
    CancelSignal, DecodeRuntime, Directive, DirectiveExecutor, EncodeRuntime, FieldContext,
    FieldState, InboundRequest, Method, Registry, Request, RequestBuilder, registry,
};
use tracing::{debug, debug_span, trace};

use crate::directive::{CODER, DirectiveRegistry};
use crate::{EngineConfig, Error, Field, InvalidFieldError, MultiInvalidFieldError, Record, Result};

/// A field with its directives resolved.
struct Binding<R: 'static> {
    field: Field<R>,
    executors: Vec<Arc<dyn DirectiveExecutor>>,
    encode_order: Vec<usize>,
    coder: Option<String>,
}

impl<R: 'static> Binding<R> {
    fn steps(&self) -> impl Iterator<Item = (&Directive, &Arc<dyn DirectiveExecutor>)> {
        self.field.directives().iter().zip(&self.executors)
    }

    fn encode_steps(&self) -> impl Iterator<Item = (&Directive, &Arc<dyn DirectiveExecutor>)> {
        self.encode_order.iter().filter_map(|&index| {
            Some((self.field.directives().get(index)?, self.executors.get(index)?))
        })
    }
}

/// Binds HTTP requests to records of type `R`, and records to requests.
///
/// Directives and named coders are resolved when the engine is built; a
/// pass only runs them.
///
/// # Example
///
/// ```
/// use fieldbind::{Engine, Field, InboundRequest, Record, field};
///
/// #[derive(Debug, Default)]
/// struct Greeting {
///     name: String,
///     times: u8,
/// }
///
/// impl Record for Greeting {
///     fn fields() -> Vec<Field<Self>> {
///         vec![
///             field!(Self, name).directive("query", &["name"]).directive("required", &[]),
///             field!(Self, times).directive("query", &["times"]).directive("default", &["1"]),
///         ]
///     }
/// }
///
/// let engine = Engine::<Greeting>::new()?;
/// let request = http::Request::get("/hello?name=Ann").body(bytes::Bytes::new())?;
/// let greeting = engine.decode(&InboundRequest::from_http(request)?)?;
/// assert_eq!(greeting.name, "Ann");
/// assert_eq!(greeting.times, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Engine<R: 'static> {
    bindings: Vec<Binding<R>>,
    registry: Arc<Registry>,
    config: EngineConfig,
}

impl<R: Record> Engine<R> {
    /// Create an engine with the process-wide codec registry, the built-in
    /// directives and the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDirective`] or an unknown coder error when a
    /// field declares something that is not registered.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a new engine builder.
    #[must_use]
    pub fn builder() -> EngineBuilder<R> {
        EngineBuilder::default()
    }

    /// Codec registry of this engine.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Configuration of this engine.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fields of `R`, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field<R>> {
        self.bindings.iter().map(|binding| &binding.field)
    }

    // ========================================================================
    // Decode
    // ========================================================================

    /// Decode a request into a new record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] for the first field that fails.
    pub fn decode(&self, request: &InboundRequest) -> Result<R>
    where
        R: Default,
    {
        let mut record = R::default();
        self.decode_into(request, &mut record)?;
        Ok(record)
    }

    /// Decode a request into an existing record.
    ///
    /// Fields are processed in declaration order and their directives in
    /// declaration order; the first failure stops the pass. Fields decoded
    /// before the failure keep their new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] for the first field that fails.
    pub fn decode_into(&self, request: &InboundRequest, record: &mut R) -> Result<()> {
        let _span = debug_span!("decode", record = type_name::<R>()).entered();

        for binding in &self.bindings {
            let name = binding.field.name();
            let coder = binding
                .coder
                .as_deref()
                .and_then(|coder| self.registry.named_coder(coder));
            let mut state = FieldState::default();

            for (directive, executor) in binding.steps() {
                trace!(field = name, directive = directive.name(), "decoding field");
                let mut runtime = DecodeRuntime::new(
                    request,
                    &self.registry,
                    binding.field.get_mut(record),
                    FieldContext {
                        name,
                        directive,
                        coder,
                        state: &mut state,
                    },
                );
                executor
                    .decode(&mut runtime)
                    .map_err(|err| InvalidFieldError::new(name, directive.name(), err))?;
            }
        }
        Ok(())
    }

    /// Read an inbound request under the configured body limit, then decode
    /// it.
    ///
    /// # Errors
    ///
    /// Returns a body error when reading fails, or the first field error.
    pub async fn decode_request<B>(&self, request: http::Request<B>) -> Result<R>
    where
        R: Default,
        B: http_body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let inbound = self.read_request(request).await?;
        self.decode(&inbound)
    }

    /// Read an inbound request under the configured body limit.
    ///
    /// # Errors
    ///
    /// Returns [`fieldbind_core::Error::BodyTooLarge`] past the limit, or a
    /// parse error for malformed query strings and form bodies.
    pub async fn read_request<B>(&self, request: http::Request<B>) -> Result<InboundRequest>
    where
        B: http_body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Ok(InboundRequest::read(request, self.config.max_body_size).await?)
    }

    // ========================================================================
    // Encode
    // ========================================================================

    /// Build a request from a record.
    ///
    /// # Errors
    ///
    /// See [`Engine::new_request_with_cancel`].
    pub fn new_request(&self, method: Method, url: &str, record: &R) -> Result<Request> {
        self.new_request_with_cancel(method, url, record, CancelSignal::never())
    }

    /// Build a request from a record; `cancel` aborts a streamed multipart
    /// body.
    ///
    /// Every field is encoded before failing, so the error lists all
    /// invalid fields. Within a field, directives run by encode priority,
    /// then declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFields`] when fields fail to encode, and a
    /// core error when the URL is invalid or the request cannot be
    /// assembled.
    pub fn new_request_with_cancel(
        &self,
        method: Method,
        url: &str,
        record: &R,
        cancel: CancelSignal,
    ) -> Result<Request> {
        let _span = debug_span!("encode", record = type_name::<R>(), %method).entered();
        let url = url::Url::parse(url).map_err(fieldbind_core::Error::from)?;

        let mut builder = RequestBuilder::new();
        let mut errors = Vec::new();
        for binding in &self.bindings {
            let name = binding.field.name();
            let coder = binding
                .coder
                .as_deref()
                .and_then(|coder| self.registry.named_coder(coder));
            let field = binding.field.get(record);
            let mut state = FieldState::default();

            for (directive, executor) in binding.encode_steps() {
                trace!(field = name, directive = directive.name(), "encoding field");
                let mut runtime = EncodeRuntime::new(
                    &mut builder,
                    &self.registry,
                    field,
                    FieldContext {
                        name,
                        directive,
                        coder,
                        state: &mut state,
                    },
                );
                if let Err(err) = executor.encode(&mut runtime) {
                    errors.push(InvalidFieldError::new(name, directive.name(), err));
                    break;
                }
            }
        }
        if !errors.is_empty() {
            debug!(failures = errors.len(), "encoding failed");
            return Err(MultiInvalidFieldError::new(errors).into());
        }

        let mut request = Request::new(method, url);
        builder.populate(&mut request, cancel, &self.config.multipart())?;
        Ok(request)
    }
}

impl<R: 'static> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<_> = self.bindings.iter().map(|binding| &binding.field).collect();
        f.debug_struct("Engine")
            .field("record", &type_name::<R>())
            .field("fields", &fields)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Engine`].
pub struct EngineBuilder<R> {
    registry: Option<Arc<Registry>>,
    directives: Option<DirectiveRegistry>,
    config: Option<EngineConfig>,
    record: PhantomData<fn() -> R>,
}

impl<R> Default for EngineBuilder<R> {
    fn default() -> Self {
        Self {
            registry: None,
            directives: None,
            config: None,
            record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for EngineBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("record", &type_name::<R>())
            .field("registry", &self.registry)
            .field("directives", &self.directives)
            .field("config", &self.config)
            .finish()
    }
}

impl<R: Record> EngineBuilder<R> {
    /// Use a codec registry instead of the process-wide one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a directive registry instead of the built-in directives.
    #[must_use]
    pub fn directives(mut self, directives: DirectiveRegistry) -> Self {
        self.directives = Some(directives);
        self
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Resolve the fields of `R` and build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDirective`] for an unregistered directive,
    /// and a core error for a `coder` directive without a registered coder.
    pub fn build(self) -> Result<Engine<R>> {
        let registry = self.registry.unwrap_or_else(registry::global);
        let directives = self.directives.unwrap_or_else(DirectiveRegistry::with_builtins);

        let bindings = R::fields()
            .into_iter()
            .map(|field| bind(field, &directives, &registry))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            record = type_name::<R>(),
            fields = bindings.len(),
            "engine ready"
        );

        Ok(Engine {
            bindings,
            registry,
            config: self.config.unwrap_or_default(),
        })
    }
}

fn bind<R: 'static>(
    field: Field<R>,
    directives: &DirectiveRegistry,
    registry: &Registry,
) -> Result<Binding<R>> {
    let executors = field
        .directives()
        .iter()
        .map(|directive| {
            directives
                .get(directive.name())
                .cloned()
                .ok_or_else(|| Error::UnknownDirective {
                    field: field.name().to_string(),
                    name: directive.name().to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let coder = field
        .directives()
        .iter()
        .find(|directive| directive.name() == CODER)
        .map(|directive| {
            let name = directive.argv().first().cloned().unwrap_or_default();
            if registry.named_coder(&name).is_none() {
                return Err(InvalidFieldError::new(
                    field.name(),
                    CODER,
                    fieldbind_core::Error::UnknownCoder(name),
                ));
            }
            Ok(name)
        })
        .transpose()?;

    // stable sort keeps declaration order among equal priorities
    let mut encode_order: Vec<usize> = (0..executors.len()).collect();
    encode_order.sort_by_key(|&index| {
        executors
            .get(index)
            .map_or(0, |executor| executor.encode_priority())
    });

    Ok(Binding {
        field,
        executors,
        encode_order,
        coder,
    })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use bytes::Bytes;

    use super::*;
    use crate::field;

    #[derive(Debug, Default)]
    struct Login {
        user: String,
        remember: bool,
    }

    impl Record for Login {
        fn fields() -> Vec<Field<Self>> {
            vec![
                field!(Self, user)
                    .directive("form", &["user"])
                    .directive("nonzero", &[]),
                field!(Self, remember)
                    .directive("query", &["remember"])
                    .directive("omitempty", &[]),
            ]
        }
    }

    #[derive(Debug, Default)]
    struct Unknown {
        value: u8,
    }

    impl Record for Unknown {
        fn fields() -> Vec<Field<Self>> {
            vec![field!(Self, value).directive("magic", &["x"])]
        }
    }

    #[derive(Debug, Default)]
    struct MissingCoder {
        value: u8,
    }

    impl Record for MissingCoder {
        fn fields() -> Vec<Field<Self>> {
            vec![field!(Self, value).directive("query", &["v"]).directive("coder", &["nope"])]
        }
    }

    fn engine<R: Record>() -> Result<Engine<R>> {
        Engine::builder().registry(Arc::new(Registry::new())).build()
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let_assert!(Err(Error::UnknownDirective { field, name }) = engine::<Unknown>());
        check!(field == "value");
        check!(name == "magic");
    }

    #[test]
    fn unknown_coder_is_rejected() {
        let_assert!(Err(Error::InvalidField(err)) = engine::<MissingCoder>());
        check!(err.directive() == "coder");
        check!(matches!(err.cause(), fieldbind_core::Error::UnknownCoder(name) if name == "nope"));
    }

    #[test]
    fn encode_order_follows_priority() {
        let engine = engine::<Login>().expect("engine");
        let remember = engine.bindings.get(1).expect("remember binding");
        let order: Vec<_> = remember.encode_steps().map(|(directive, _)| directive.name()).collect();
        check!(order == ["omitempty", "query"]);
        let declared: Vec<_> = remember.steps().map(|(directive, _)| directive.name()).collect();
        check!(declared == ["query", "omitempty"]);
    }

    #[test]
    fn decode_then_encode() {
        let engine = engine::<Login>().expect("engine");
        let request = http::Request::post("/login?remember=true")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"user=ann"))
            .expect("request");
        let login = engine
            .decode(&InboundRequest::from_http(request).expect("inbound"))
            .expect("decode");
        check!(login.user == "ann");
        check!(login.remember);

        let request = engine
            .new_request(Method::POST, "https://example.com/login", &Login {
                user: "bob".to_string(),
                remember: false,
            })
            .expect("encode");
        check!(request.url().as_str() == "https://example.com/login");
        check!(request.header("content-type") == Some("application/x-www-form-urlencoded"));
    }

    #[test]
    fn encode_collects_every_failure() {
        let engine = engine::<Login>().expect("engine");
        let_assert!(
            Err(Error::InvalidFields(err)) =
                engine.new_request(Method::POST, "https://example.com/login", &Login::default())
        );
        check!(err.errors().len() == 1);
        check!(err.errors().first().map(InvalidFieldError::directive) == Some("nonzero"));
    }

    #[test]
    fn engine_is_shared_across_threads() {
        let engine = engine::<Login>().expect("engine");
        let users: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["ann", "bob"]
                .into_iter()
                .map(|user| {
                    let engine = &engine;
                    scope.spawn(move || {
                        let request = http::Request::post("/login")
                            .header("content-type", "application/x-www-form-urlencoded")
                            .body(Bytes::from(format!("user={user}")))
                            .expect("request");
                        engine
                            .decode(&InboundRequest::from_http(request).expect("inbound"))
                            .expect("decode")
                            .user
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("decode thread"))
                .collect()
        });
        check!(users == ["ann", "bob"]);
    }

    #[test]
    fn invalid_url() {
        let engine = engine::<Login>().expect("engine");
        let_assert!(
            Err(Error::Core(fieldbind_core::Error::InvalidUrl(_))) =
                engine.new_request(Method::GET, "not a url", &Login::default())
        );
    }
}
