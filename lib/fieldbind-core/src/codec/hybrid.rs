//! Codecs assembled from capabilities a type declares.
//!
//! Two flavors exist per direction. String-flavored capabilities are the
//! [`StringMarshal`] / [`StringUnmarshal`] traits of this crate. The generic
//! text-flavored ones are [`Display`] and [`FromStr`]. When a type declares
//! both flavors, the string-flavored one is used.

use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::str::FromStr;

use super::Stringable;
use crate::{Bindable, Error, Result, TypeInfo, bindable};

/// Render a value as its string form.
pub trait StringMarshal {
    /// Render the value.
    fn marshal_string(&self) -> Result<String>;
}

/// Parse a value from its string form.
pub trait StringUnmarshal {
    /// Parse `input` into `self`.
    ///
    /// Runs against a staged copy; a failure never reaches the field.
    fn unmarshal_string(&mut self, input: &str) -> Result<()>;
}

/// Capability tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// [`StringMarshal`].
    StringMarshal,
    /// [`StringUnmarshal`].
    StringUnmarshal,
    /// [`Display`].
    TextMarshal,
    /// [`FromStr`].
    TextUnmarshal,
}

impl Capability {
    /// Marshal capabilities, most preferred first.
    pub const MARSHAL_PRECEDENCE: [Self; 2] = [Self::StringMarshal, Self::TextMarshal];

    /// Unmarshal capabilities, most preferred first.
    pub const UNMARSHAL_PRECEDENCE: [Self; 2] = [Self::StringUnmarshal, Self::TextUnmarshal];
}

impl Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StringMarshal => "StringMarshal",
            Self::StringUnmarshal => "StringUnmarshal",
            Self::TextMarshal => "TextMarshal",
            Self::TextUnmarshal => "TextUnmarshal",
        };
        f.write_str(name)
    }
}

type MarshalFn = fn(&dyn Bindable) -> Result<String>;
type UnmarshalFn = fn(&mut dyn Bindable, &str) -> Result<()>;

/// Capability table of `T`, built with bounds-checked methods.
pub struct Capabilities<T> {
    marshal: Vec<(Capability, MarshalFn)>,
    unmarshal: Vec<(Capability, UnmarshalFn)>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Bindable> Default for Capabilities<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Bindable> Capabilities<T> {
    /// An empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marshal: Vec::new(),
            unmarshal: Vec::new(),
            _type: PhantomData,
        }
    }

    /// Declare [`StringMarshal`].
    #[must_use]
    pub fn string_marshal(mut self) -> Self
    where
        T: StringMarshal,
    {
        self.marshal
            .push((Capability::StringMarshal, marshal_string::<T> as MarshalFn));
        self
    }

    /// Declare [`StringUnmarshal`].
    #[must_use]
    pub fn string_unmarshal(mut self) -> Self
    where
        T: StringUnmarshal + Clone,
    {
        self.unmarshal
            .push((Capability::StringUnmarshal, unmarshal_string::<T> as UnmarshalFn));
        self
    }

    /// Declare [`Display`] as the text marshaller.
    #[must_use]
    pub fn text_marshal(mut self) -> Self
    where
        T: Display,
    {
        self.marshal
            .push((Capability::TextMarshal, marshal_text::<T> as MarshalFn));
        self
    }

    /// Declare [`FromStr`] as the text unmarshaller.
    #[must_use]
    pub fn text_unmarshal(mut self) -> Self
    where
        T: FromStr,
        T::Err: Display,
    {
        self.unmarshal
            .push((Capability::TextUnmarshal, unmarshal_text::<T> as UnmarshalFn));
        self
    }

    /// Resolve the precedence lists into a coder.
    #[must_use]
    pub fn build(self) -> HybridCoder {
        HybridCoder {
            ty: TypeInfo::of::<T>(),
            marshal: pick(&Capability::MARSHAL_PRECEDENCE, &self.marshal),
            unmarshal: pick(&Capability::UNMARSHAL_PRECEDENCE, &self.unmarshal),
        }
    }
}

fn pick<F: Copy>(precedence: &[Capability], declared: &[(Capability, F)]) -> Option<(Capability, F)> {
    precedence.iter().find_map(|wanted| {
        declared
            .iter()
            .find(|(capability, _)| capability == wanted)
            .copied()
    })
}

fn marshal_string<T: Bindable + StringMarshal>(value: &dyn Bindable) -> Result<String> {
    bindable::downcast_ref::<T>(value)?.marshal_string()
}

fn unmarshal_string<T: Bindable + StringUnmarshal + Clone>(
    value: &mut dyn Bindable,
    input: &str,
) -> Result<()> {
    let target = bindable::downcast_mut::<T>(value)?;
    let mut staged = target.clone();
    staged.unmarshal_string(input)?;
    *target = staged;
    Ok(())
}

fn marshal_text<T: Bindable + Display>(value: &dyn Bindable) -> Result<String> {
    Ok(bindable::downcast_ref::<T>(value)?.to_string())
}

fn unmarshal_text<T>(value: &mut dyn Bindable, input: &str) -> Result<()>
where
    T: Bindable + FromStr,
    T::Err: Display,
{
    let target = bindable::downcast_mut::<T>(value)?;
    *target = input
        .parse()
        .map_err(|err| Error::parse(std::any::type_name::<T>(), input, err))?;
    Ok(())
}

/// Codec resolved from a capability table.
#[derive(Clone)]
pub struct HybridCoder {
    ty: TypeInfo,
    marshal: Option<(Capability, MarshalFn)>,
    unmarshal: Option<(Capability, UnmarshalFn)>,
}

impl HybridCoder {
    /// The type this coder applies to.
    #[must_use]
    pub const fn ty(&self) -> TypeInfo {
        self.ty
    }

    /// Capability used to marshal.
    #[must_use]
    pub fn marshal_capability(&self) -> Option<Capability> {
        self.marshal.map(|(capability, _)| capability)
    }

    /// Capability used to unmarshal.
    #[must_use]
    pub fn unmarshal_capability(&self) -> Option<Capability> {
        self.unmarshal.map(|(capability, _)| capability)
    }

    /// Returns `true` if at least one direction is available.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.marshal.is_some() || self.unmarshal.is_some()
    }
}

impl fmt::Debug for HybridCoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridCoder")
            .field("ty", &self.ty)
            .field("marshal", &self.marshal_capability())
            .field("unmarshal", &self.unmarshal_capability())
            .finish()
    }
}

impl Stringable for HybridCoder {
    fn encode(&self, value: &dyn Bindable) -> Result<String> {
        let (_, marshal) = self.marshal.ok_or(Error::MissingCapability {
            type_name: self.ty.name(),
            capability: "StringMarshal",
        })?;
        marshal(value)
    }

    fn decode(&self, value: &mut dyn Bindable, input: &str) -> Result<()> {
        let (_, unmarshal) = self.unmarshal.ok_or(Error::MissingCapability {
            type_name: self.ty.name(),
            capability: "StringUnmarshal",
        })?;
        unmarshal(value, input)
    }
}
