//! Adapters for optional containers.

use std::sync::Arc;

use super::{StringSlicable, Stringable};
use crate::{Bindable, Error, Result, bindable};

/// [`Stringable`] over an optional container.
///
/// Encoding an invalid container fails with [`Error::Absent`]; decoding
/// marks the container valid only once the inner codec succeeded.
pub struct OptionalStringable {
    inner: Arc<dyn Stringable>,
}

impl OptionalStringable {
    /// Wrap the codec of the contained type.
    #[must_use]
    pub fn new(inner: Arc<dyn Stringable>) -> Self {
        Self { inner }
    }
}

impl Stringable for OptionalStringable {
    fn encode(&self, value: &dyn Bindable) -> Result<String> {
        match bindable::as_optional(value)?.value() {
            Some(inner) => self.inner.encode(inner),
            None => Err(Error::Absent),
        }
    }

    fn decode(&self, value: &mut dyn Bindable, input: &str) -> Result<()> {
        bindable::as_optional_mut(value)?.fill(&mut |inner| self.inner.decode(inner, input))
    }
}

/// [`StringSlicable`] over an optional container; invalid encodes to `None`.
pub struct OptionalSlicable {
    inner: Arc<dyn StringSlicable>,
}

impl OptionalSlicable {
    /// Wrap the sequence codec of the contained type.
    #[must_use]
    pub fn new(inner: Arc<dyn StringSlicable>) -> Self {
        Self { inner }
    }
}

impl StringSlicable for OptionalSlicable {
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<String>>> {
        match bindable::as_optional(value)?.value() {
            Some(inner) => self.inner.encode_all(inner),
            None => Ok(None),
        }
    }

    fn decode_all(&self, value: &mut dyn Bindable, inputs: &[String]) -> Result<()> {
        bindable::as_optional_mut(value)?.fill(&mut |inner| self.inner.decode_all(inner, inputs))
    }
}
