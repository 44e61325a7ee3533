//! Directive runtime.
//!
//! Directives are executed once per (field, directive) pair, in the order
//! they are declared on the field. Each call gets a runtime giving access
//! to the data source or sink, the field storage, the named coder bound to
//! the field and the field-set flag shared by all directives of the field.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::builder::RequestBuilder;
use crate::codec::{FileSlicable, StringSlicable};
use crate::inbound::InboundRequest;
use crate::registry::{NamedCoder, Registry};
use crate::{Bindable, Error, Result};

/// A directive declared on a field: a name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directive {
    name: String,
    argv: Vec<String>,
}

impl Directive {
    /// Create a directive.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Directive name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directive arguments.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.argv.join(","))
    }
}

/// Per-field state of one decode or encode pass.
///
/// The set flag starts unset and becomes set the first time a directive
/// writes the field (decode) or its key (encode); later directives observe
/// it and skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    set: bool,
    fallback: Option<Vec<String>>,
    omit_empty: bool,
}

impl FieldState {
    /// Returns `true` once a directive wrote the field.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.set
    }

    /// Update the set flag.
    pub const fn mark_set(&mut self, set: bool) {
        self.set = set;
    }

    /// Values to encode in place of a zero field.
    #[must_use]
    pub fn fallback(&self) -> Option<&[String]> {
        self.fallback.as_deref()
    }

    /// Returns `true` if a zero field must not contribute a key.
    #[must_use]
    pub const fn omit_empty(&self) -> bool {
        self.omit_empty
    }
}

/// Implementation of a directive.
pub trait DirectiveExecutor: Send + Sync {
    /// Decode-direction callback.
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()>;

    /// Encode-direction callback.
    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()>;

    /// Encode order of the directives of one field, lowest first; equal
    /// priorities keep their declared order.
    fn encode_priority(&self) -> i8 {
        0
    }
}

impl<T: DirectiveExecutor + ?Sized> DirectiveExecutor for Arc<T> {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        (**self).decode(runtime)
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        (**self).encode(runtime)
    }

    fn encode_priority(&self) -> i8 {
        (**self).encode_priority()
    }
}

/// What a runtime knows about the field being processed.
#[derive(Debug)]
pub struct FieldContext<'a> {
    /// Declared field name.
    pub name: &'a str,
    /// The directive being executed.
    pub directive: &'a Directive,
    /// Named coder bound to the field.
    pub coder: Option<&'a NamedCoder>,
    /// Field-set flag and encode hints.
    pub state: &'a mut FieldState,
}

// ============================================================================
// Decode
// ============================================================================

/// Runtime of a decode-direction directive call.
pub struct DecodeRuntime<'a> {
    request: &'a InboundRequest,
    registry: &'a Registry,
    field: &'a mut dyn Bindable,
    context: FieldContext<'a>,
}

impl<'a> DecodeRuntime<'a> {
    /// Create a runtime.
    pub fn new(
        request: &'a InboundRequest,
        registry: &'a Registry,
        field: &'a mut dyn Bindable,
        context: FieldContext<'a>,
    ) -> Self {
        Self {
            request,
            registry,
            field,
            context,
        }
    }

    /// The inbound request.
    #[must_use]
    pub const fn request(&self) -> &'a InboundRequest {
        self.request
    }

    /// The codec registry.
    #[must_use]
    pub const fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Declared field name.
    #[must_use]
    pub const fn field_name(&self) -> &'a str {
        self.context.name
    }

    /// The directive being executed.
    #[must_use]
    pub const fn directive(&self) -> &'a Directive {
        self.context.directive
    }

    /// Named coder bound to the field.
    #[must_use]
    pub const fn coder(&self) -> Option<&'a NamedCoder> {
        self.context.coder
    }

    /// Field storage.
    #[must_use]
    pub fn field(&self) -> &dyn Bindable {
        &*self.field
    }

    /// Mutable field storage.
    pub fn field_mut(&mut self) -> &mut dyn Bindable {
        &mut *self.field
    }

    /// Returns `true` once a directive wrote the field.
    #[must_use]
    pub const fn is_field_set(&self) -> bool {
        self.context.state.is_set()
    }

    /// Update the field-set flag.
    pub const fn mark_field_set(&mut self, set: bool) {
        self.context.state.mark_set(set);
    }

    /// Assign a decoded value to the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldTypeMismatch`] if `V` is not the field type.
    pub fn set_value<V: Any>(&mut self, value: V) -> Result<()> {
        let field_type = self.field.descriptor().ty().name();
        let target = self
            .field
            .as_any_mut()
            .downcast_mut::<V>()
            .ok_or(Error::FieldTypeMismatch {
                field_type,
                value_type: std::any::type_name::<V>(),
            })?;
        *target = value;
        Ok(())
    }

    /// String codec for the field, honoring its named coder.
    pub fn string_slicable(&self) -> Result<Arc<dyn StringSlicable>> {
        self.registry
            .string_slicable(&self.field.descriptor(), self.context.coder)
    }

    /// File codec for the field.
    pub fn file_slicable(&self) -> Result<Arc<dyn FileSlicable>> {
        self.registry.file_slicable(&self.field.descriptor())
    }

    /// Returns `true` if the field binds uploaded files.
    #[must_use]
    pub fn is_file_field(&self) -> bool {
        self.registry.is_file_type(&self.field.descriptor())
    }
}

impl fmt::Debug for DecodeRuntime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeRuntime")
            .field("field", &self.context.name)
            .field("directive", &self.context.directive)
            .field("set", &self.context.state.is_set())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Runtime of an encode-direction directive call.
pub struct EncodeRuntime<'a> {
    builder: &'a mut RequestBuilder,
    registry: &'a Registry,
    field: &'a dyn Bindable,
    context: FieldContext<'a>,
}

impl<'a> EncodeRuntime<'a> {
    /// Create a runtime.
    pub fn new(
        builder: &'a mut RequestBuilder,
        registry: &'a Registry,
        field: &'a dyn Bindable,
        context: FieldContext<'a>,
    ) -> Self {
        Self {
            builder,
            registry,
            field,
            context,
        }
    }

    /// The request builder.
    pub const fn builder(&mut self) -> &mut RequestBuilder {
        self.builder
    }

    /// The codec registry.
    #[must_use]
    pub const fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Declared field name.
    #[must_use]
    pub const fn field_name(&self) -> &'a str {
        self.context.name
    }

    /// The directive being executed.
    #[must_use]
    pub const fn directive(&self) -> &'a Directive {
        self.context.directive
    }

    /// Named coder bound to the field.
    #[must_use]
    pub const fn coder(&self) -> Option<&'a NamedCoder> {
        self.context.coder
    }

    /// Field value.
    #[must_use]
    pub const fn field(&self) -> &'a dyn Bindable {
        self.field
    }

    /// Returns `true` once a directive wrote the field's key.
    #[must_use]
    pub const fn is_field_set(&self) -> bool {
        self.context.state.is_set()
    }

    /// Update the field-set flag.
    pub const fn mark_field_set(&mut self, set: bool) {
        self.context.state.mark_set(set);
    }

    /// Values to encode in place of a zero field.
    #[must_use]
    pub fn fallback(&self) -> Option<&[String]> {
        self.context.state.fallback()
    }

    /// Encode `values` instead of the field value.
    pub fn set_fallback(&mut self, values: Vec<String>) {
        self.context.state.fallback = Some(values);
    }

    /// Returns `true` if a zero field must not contribute a key.
    #[must_use]
    pub const fn omit_empty(&self) -> bool {
        self.context.state.omit_empty()
    }

    /// Make a zero field contribute no key.
    pub const fn set_omit_empty(&mut self, omit: bool) {
        self.context.state.omit_empty = omit;
    }

    /// String codec for the field, honoring its named coder.
    pub fn string_slicable(&self) -> Result<Arc<dyn StringSlicable>> {
        self.registry
            .string_slicable(&self.field.descriptor(), self.context.coder)
    }

    /// File codec for the field.
    pub fn file_slicable(&self) -> Result<Arc<dyn FileSlicable>> {
        self.registry.file_slicable(&self.field.descriptor())
    }

    /// Returns `true` if the field binds uploaded files.
    #[must_use]
    pub fn is_file_field(&self) -> bool {
        self.registry.is_file_type(&self.field.descriptor())
    }
}

impl fmt::Debug for EncodeRuntime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeRuntime")
            .field("field", &self.context.name)
            .field("directive", &self.context.directive)
            .field("set", &self.context.state.is_set())
            .finish_non_exhaustive()
    }
}
