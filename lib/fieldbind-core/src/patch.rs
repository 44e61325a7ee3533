//! The optional container `{ value, valid }`.

use std::any::Any;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bindable::{Access, AccessMut, FillValue, Optional};
use crate::{Bindable, Result, TypeDescriptor};

/// A value paired with a presence flag.
///
/// `valid == false` means the field was absent from the source: it is
/// omitted on encode, and on decode it only becomes `true` once a value has
/// been parsed successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Patch<T> {
    /// The value; the zero value while invalid.
    pub value: T,
    /// Presence flag.
    pub valid: bool,
}

impl<T> Patch<T> {
    /// A present value.
    #[must_use]
    pub const fn some(value: T) -> Self {
        Self { value, valid: true }
    }

    /// Returns the value when present.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        if self.valid { Some(&self.value) } else { None }
    }

    /// Converts into an [`Option`].
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        self.valid.then_some(self.value)
    }
}

impl<T: Default> Patch<T> {
    /// An absent value.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

impl<T: Default> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::default, Self::some)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Default> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

impl<T: Bindable + Default> Optional for Patch<T> {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn value(&self) -> Option<&dyn Bindable> {
        self.valid.then_some(&self.value as &dyn Bindable)
    }

    fn fill(&mut self, fill: &mut FillValue<'_>) -> Result<()> {
        let mut value = T::default();
        fill(&mut value)?;
        self.value = value;
        self.valid = true;
        Ok(())
    }
}

impl<T: Bindable + Default> Bindable for Patch<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::optional::<Self>(T::describe)
    }

    fn descriptor(&self) -> TypeDescriptor {
        Self::describe()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn access(&self) -> Access<'_> {
        Access::Optional(self)
    }

    fn access_mut(&mut self) -> AccessMut<'_> {
        AccessMut::Optional(self)
    }

    fn is_zero(&self) -> bool {
        !self.valid && self.value.is_zero()
    }
}
