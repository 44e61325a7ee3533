//! Built-in directives and the directive registry.
//!
//! | name        | decode                               | encode                              |
//! |-------------|--------------------------------------|-------------------------------------|
//! | `query`     | query string values                  | query pairs                         |
//! | `form`      | form values and uploaded files       | form values or attachments          |
//! | `header`    | header values                        | headers                             |
//! | `cookie`    | cookie values                        | one cookie per value                |
//! | `path`      | router path parameters               | `{key}` placeholders                |
//! | `default`   | arguments, when the field is unset   | arguments in place of a zero field  |
//! | `required`  | fails when the field is unset        |                                     |
//! | `nonzero`   | fails on a zero field                | fails on a zero field               |
//! | `omitempty` |                                      | a zero field writes no key          |
//! | `body`      | whole body through a body format     | body with the format's content type |
//! | `coder`     | binds a named coder to the field     | same                                |
//!
//! Keys default to the field name when a directive has no arguments.

mod body;
mod extract;
mod rules;
mod sink;
mod source;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fieldbind_core::DirectiveExecutor;
use tracing::debug;

pub use self::body::Body;
pub use self::rules::{Coder, DefaultValue, NonZero, OmitEmpty, Required};
pub use self::source::{Cookie, Form, Header, Path, Query};

/// Name of the directive binding a named coder to a field.
pub const CODER: &str = "coder";

/// Directive executors by name.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    executors: HashMap<String, Arc<dyn DirectiveExecutor>>,
}

impl DirectiveRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in directives.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .replace("query", Arc::new(Query))
            .replace("form", Arc::new(Form))
            .replace("header", Arc::new(Header))
            .replace("cookie", Arc::new(Cookie))
            .replace("path", Arc::new(Path))
            .replace("default", Arc::new(DefaultValue))
            .replace("required", Arc::new(Required))
            .replace("nonzero", Arc::new(NonZero))
            .replace("omitempty", Arc::new(OmitEmpty))
            .replace("body", Arc::new(Body))
            .replace(CODER, Arc::new(Coder));
        registry
    }

    /// Register a directive.
    ///
    /// # Errors
    ///
    /// Returns [`fieldbind_core::Error::DuplicateRegistration`] if the name
    /// is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        executor: Arc<dyn DirectiveExecutor>,
    ) -> fieldbind_core::Result<&mut Self> {
        let name = name.into();
        if self.executors.contains_key(&name) {
            return Err(fieldbind_core::Error::DuplicateRegistration {
                kind: "directive",
                name,
            });
        }
        Ok(self.replace(name, executor))
    }

    /// Register or replace a directive.
    pub fn replace(
        &mut self,
        name: impl Into<String>,
        executor: Arc<dyn DirectiveExecutor>,
    ) -> &mut Self {
        let name = name.into();
        debug!(%name, "registering directive");
        self.executors.insert(name, executor);
        self
    }

    /// Look up a directive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DirectiveExecutor>> {
        self.executors.get(name)
    }

    /// Returns `true` if a directive is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.executors.keys().collect();
        names.sort();
        f.debug_struct("DirectiveRegistry")
            .field("directives", &names)
            .finish()
    }
}
