//! Sequence adapters.

use std::sync::Arc;

use super::{StringSlicable, Stringable};
use crate::{Bindable, Error, Result, bindable};

/// Element-wise codec: value `i` maps to string `i`.
///
/// Decoding builds a new sequence sized to the inputs and commits it only
/// when every element parsed; the first failure is tagged with its index.
pub struct SequenceSlicable {
    element: Arc<dyn Stringable>,
}

impl SequenceSlicable {
    /// Wrap the element codec.
    #[must_use]
    pub fn new(element: Arc<dyn Stringable>) -> Self {
        Self { element }
    }
}

impl StringSlicable for SequenceSlicable {
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<String>>> {
        let sequence = bindable::as_sequence(value)?;
        let mut encoded = Vec::with_capacity(sequence.len());
        for index in 0..sequence.len() {
            let Some(element) = sequence.element(index) else {
                continue;
            };
            let text = self
                .element
                .encode(element)
                .map_err(|err| Error::at_index(index, err))?;
            encoded.push(text);
        }
        Ok(Some(encoded))
    }

    fn decode_all(&self, value: &mut dyn Bindable, inputs: &[String]) -> Result<()> {
        bindable::as_sequence_mut(value)?.rebuild(inputs.len(), &mut |index, element| {
            let Some(input) = inputs.get(index) else {
                return Ok(());
            };
            self.element
                .decode(element, input)
                .map_err(|err| Error::at_index(index, err))
        })
    }
}

/// Degenerate sequence codec for a single value.
///
/// Encodes to exactly one string and decodes the first input only.
pub struct SingleSlicable {
    inner: Arc<dyn Stringable>,
}

impl SingleSlicable {
    /// Wrap a scalar codec.
    #[must_use]
    pub fn new(inner: Arc<dyn Stringable>) -> Self {
        Self { inner }
    }
}

impl StringSlicable for SingleSlicable {
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<String>>> {
        match self.inner.encode(value) {
            Ok(text) => Ok(Some(vec![text])),
            Err(Error::Absent) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn decode_all(&self, value: &mut dyn Bindable, inputs: &[String]) -> Result<()> {
        match inputs.first() {
            Some(input) => self.inner.decode(value, input),
            None => Ok(()),
        }
    }
}
