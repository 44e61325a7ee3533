//! Built-in codecs for primitive scalars and byte sequences.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use num_complex::Complex;

use super::{ScalarCodec, Stringable, typed};
use crate::{Bindable, Error, Result, bindable};

/// Codec over [`Display`] / [`FromStr`].
///
/// Integer parsing rejects literals outside the target width.
pub struct FromStrCodec<T>(PhantomData<fn() -> T>);

impl<T> FromStrCodec<T> {
    /// Create the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScalarCodec<T> for FromStrCodec<T>
where
    T: Display + FromStr + 'static,
    T::Err: Display,
{
    fn encode(&self, value: &T) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(&self, input: &str) -> Result<T> {
        input
            .parse()
            .map_err(|err| Error::parse(std::any::type_name::<T>(), input, err))
    }
}

/// Boolean codec accepting `1 t T TRUE true True` and `0 f F FALSE false False`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl ScalarCodec<bool> for BoolCodec {
    fn encode(&self, value: &bool) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(&self, input: &str) -> Result<bool> {
        match input {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(Error::parse("bool", input, "invalid syntax")),
        }
    }
}

/// Complex number codec; parentheses around the literal are accepted.
pub struct ComplexCodec<F>(PhantomData<fn() -> F>);

impl<F> ComplexCodec<F> {
    /// Create the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F> Default for ComplexCodec<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> ScalarCodec<Complex<F>> for ComplexCodec<F>
where
    F: 'static,
    Complex<F>: Display + FromStr,
    <Complex<F> as FromStr>::Err: Display,
{
    fn encode(&self, value: &Complex<F>) -> Result<String> {
        Ok(value.to_string())
    }

    fn decode(&self, input: &str) -> Result<Complex<F>> {
        let literal = input
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(input);
        literal
            .parse()
            .map_err(|err| Error::parse(std::any::type_name::<Complex<F>>(), input, err))
    }
}

/// Byte sequence codec: one standard base64 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Stringable for BytesCodec {
    fn encode(&self, value: &dyn Bindable) -> Result<String> {
        let sequence = bindable::as_sequence(value)?;
        let mut bytes = Vec::with_capacity(sequence.len());
        for index in 0..sequence.len() {
            if let Some(element) = sequence.element(index) {
                bytes.push(*bindable::downcast_ref::<u8>(element)?);
            }
        }
        Ok(STANDARD.encode(bytes))
    }

    fn decode(&self, value: &mut dyn Bindable, input: &str) -> Result<()> {
        let bytes = STANDARD
            .decode(input)
            .map_err(|err| Error::parse("bytes", input, err))?;
        bindable::as_sequence_mut(value)?.rebuild(bytes.len(), &mut |index, element| {
            if let Some(byte) = bytes.get(index) {
                *bindable::downcast_mut::<u8>(element)? = *byte;
            }
            Ok(())
        })
    }
}

macro_rules! from_str_codecs {
    ($map:ident: $($ty:ty),+ $(,)?) => {
        $( $map.insert(TypeId::of::<$ty>(), typed::<$ty, _>(FromStrCodec::<$ty>::new())); )+
    };
}

/// Built-in scalar codecs keyed by type.
pub(crate) fn builtins() -> HashMap<TypeId, Arc<dyn Stringable>> {
    let mut map: HashMap<TypeId, Arc<dyn Stringable>> = HashMap::new();
    map.insert(TypeId::of::<bool>(), typed::<bool, _>(BoolCodec));
    from_str_codecs!(map: i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String);
    map.insert(
        TypeId::of::<Complex<f32>>(),
        typed::<Complex<f32>, _>(ComplexCodec::<f32>::new()),
    );
    map.insert(
        TypeId::of::<Complex<f64>>(),
        typed::<Complex<f64>, _>(ComplexCodec::<f64>::new()),
    );
    map
}
