//! String and file codecs.
//!
//! Codecs are stateless and operate on `&dyn Bindable`:
//!
//! - [`Stringable`] converts one value to and from a string;
//! - [`StringSlicable`] converts a value to and from an ordered list of
//!   strings, `None` meaning "no value, omit the key";
//! - [`FileCodec`] / [`FileSlicable`] do the same with uploads.
//!
//! Shape adapters compose these by delegation; the [`Registry`](crate::Registry)
//! picks the adapters from a field's [`TypeDescriptor`](crate::TypeDescriptor).

mod builtin;
mod file;
mod hybrid;
mod optional;
mod slice;
mod time;

use std::marker::PhantomData;
use std::sync::Arc;

pub use builtin::{BoolCodec, BytesCodec, ComplexCodec, FromStrCodec};
pub use file::{
    FileCodec, FileMarshal, FileSlicable, FileUnmarshal, OptionalFileCodec, OptionalFileSlicable,
    SequenceFileSlicable, SingleFileSlicable, TypedFileCodec,
};
pub use hybrid::{Capabilities, Capability, HybridCoder, StringMarshal, StringUnmarshal};
pub use optional::{OptionalSlicable, OptionalStringable};
pub use slice::{SequenceSlicable, SingleSlicable};
pub use time::TimeCodec;

pub(crate) use builtin::builtins;

use crate::{Bindable, Result, bindable};

/// Converts one value to and from its string form.
///
/// `decode` leaves the target unchanged on error.
pub trait Stringable: Send + Sync {
    /// Render the value.
    fn encode(&self, value: &dyn Bindable) -> Result<String>;

    /// Parse `input` into the value.
    fn decode(&self, value: &mut dyn Bindable, input: &str) -> Result<()>;
}

/// Converts a value to and from an ordered list of strings.
pub trait StringSlicable: Send + Sync {
    /// Render the value; `None` means the value is absent and its key must be omitted.
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<String>>>;

    /// Parse `inputs` into the value.
    fn decode_all(&self, value: &mut dyn Bindable, inputs: &[String]) -> Result<()>;
}

/// A typed codec for one scalar type.
///
/// Decoding returns a new value, so targets are only written on success.
pub trait ScalarCodec<T>: Send + Sync + 'static {
    /// Render a value.
    fn encode(&self, value: &T) -> Result<String>;

    /// Parse a value.
    fn decode(&self, input: &str) -> Result<T>;
}

/// A [`ScalarCodec`] built from two functions.
#[derive(Debug, Clone, Copy)]
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

/// Build a [`ScalarCodec`] from an encode and a decode function.
///
/// ```
/// use fieldbind_core::codec::{ScalarCodec, codec_fn};
///
/// let yes_no = codec_fn(
///     |value: &bool| Ok(if *value { "yes" } else { "no" }.to_string()),
///     |input: &str| Ok(input == "yes"),
/// );
/// assert_eq!(yes_no.encode(&true).expect("encode"), "yes");
/// ```
pub const fn codec_fn<T, E, D>(encode: E, decode: D) -> FnCodec<E, D>
where
    E: Fn(&T) -> Result<String>,
    D: Fn(&str) -> Result<T>,
{
    FnCodec { encode, decode }
}

impl<T, E, D> ScalarCodec<T> for FnCodec<E, D>
where
    E: Fn(&T) -> Result<String> + Send + Sync + 'static,
    D: Fn(&str) -> Result<T> + Send + Sync + 'static,
{
    fn encode(&self, value: &T) -> Result<String> {
        (self.encode)(value)
    }

    fn decode(&self, input: &str) -> Result<T> {
        (self.decode)(input)
    }
}

/// Erases a [`ScalarCodec<T>`] into a [`Stringable`] with a checked downcast.
pub struct Typed<T, C> {
    codec: C,
    _type: PhantomData<fn() -> T>,
}

impl<T, C> Typed<T, C> {
    /// Wrap a typed codec.
    pub const fn new(codec: C) -> Self {
        Self {
            codec,
            _type: PhantomData,
        }
    }
}

impl<T: Bindable, C: ScalarCodec<T>> Stringable for Typed<T, C> {
    fn encode(&self, value: &dyn Bindable) -> Result<String> {
        self.codec.encode(bindable::downcast_ref::<T>(value)?)
    }

    fn decode(&self, value: &mut dyn Bindable, input: &str) -> Result<()> {
        let target = bindable::downcast_mut::<T>(value)?;
        *target = self.codec.decode(input)?;
        Ok(())
    }
}

/// Erase a typed codec into a shared [`Stringable`].
pub fn typed<T: Bindable, C: ScalarCodec<T>>(codec: C) -> Arc<dyn Stringable> {
    Arc::new(Typed::<T, C>::new(codec))
}
