//! Type-erased access to field storage.
//!
//! Codecs never see concrete field types. They work through
//! `&dyn Bindable`, which exposes the type description, `Any` views for
//! checked downcasts and one of three shape accessors:
//!
//! - scalars are reached through [`Bindable::as_any`] / [`Bindable::as_any_mut`];
//! - sequences through [`Sequence`];
//! - optional containers through [`Optional`].
//!
//! Sequence and optional writes are staged: a fresh value is filled and
//! committed only once every step succeeded, so a failed decode never leaves
//! a partial value behind.

use std::any::Any;

use crate::{Error, Result, TypeDescriptor};

/// A value that can be bound to and from HTTP data.
pub trait Bindable: Any + Send {
    /// Static description of the type.
    fn describe() -> TypeDescriptor
    where
        Self: Sized;

    /// Description of the value's type.
    fn descriptor(&self) -> TypeDescriptor;

    /// View as [`Any`].
    fn as_any(&self) -> &dyn Any;

    /// Mutable view as [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Shape accessor.
    fn access(&self) -> Access<'_> {
        Access::Scalar
    }

    /// Mutable shape accessor.
    fn access_mut(&mut self) -> AccessMut<'_> {
        AccessMut::Scalar
    }

    /// Returns `true` when the value equals its zero value.
    fn is_zero(&self) -> bool;

    /// Structured payload view, for body-bound values.
    fn payload(&self) -> Option<&dyn crate::PayloadAccess> {
        None
    }

    /// Mutable structured payload view, for body-bound values.
    fn payload_mut(&mut self) -> Option<&mut dyn crate::PayloadAccess> {
        None
    }
}

/// Read access by shape.
pub enum Access<'a> {
    /// A scalar; use [`Bindable::as_any`].
    Scalar,
    /// A sequence.
    Sequence(&'a dyn Sequence),
    /// An optional container.
    Optional(&'a dyn Optional),
}

/// Write access by shape.
pub enum AccessMut<'a> {
    /// A scalar; use [`Bindable::as_any_mut`].
    Scalar,
    /// A sequence.
    Sequence(&'a mut dyn Sequence),
    /// An optional container.
    Optional(&'a mut dyn Optional),
}

/// Callback filling one element of a sequence being rebuilt.
pub type FillElement<'f> = dyn FnMut(usize, &mut dyn Bindable) -> Result<()> + 'f;

/// Callback filling the value of an optional container.
pub type FillValue<'f> = dyn FnMut(&mut dyn Bindable) -> Result<()> + 'f;

/// An ordered sequence of bindable elements.
pub trait Sequence {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`.
    fn element(&self, index: usize) -> Option<&dyn Bindable>;

    /// Replace the sequence with `len` fresh elements, each passed to `fill`.
    ///
    /// The sequence is left untouched unless every `fill` call succeeds.
    fn rebuild(&mut self, len: usize, fill: &mut FillElement<'_>) -> Result<()>;
}

/// A value paired with a presence flag.
pub trait Optional {
    /// Presence flag.
    fn is_valid(&self) -> bool;

    /// The value, when present.
    fn value(&self) -> Option<&dyn Bindable>;

    /// Fill a fresh value; on success store it and mark the container valid.
    ///
    /// On failure neither the value nor the flag change.
    fn fill(&mut self, fill: &mut FillValue<'_>) -> Result<()>;
}

/// Downcast a bindable to a concrete type.
pub fn downcast_ref<T: Bindable>(value: &dyn Bindable) -> Result<&T> {
    let actual = value.descriptor().ty().name();
    value
        .as_any()
        .downcast_ref::<T>()
        .ok_or(Error::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual,
        })
}

/// Mutably downcast a bindable to a concrete type.
pub fn downcast_mut<T: Bindable>(value: &mut dyn Bindable) -> Result<&mut T> {
    let actual = value.descriptor().ty().name();
    value
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or(Error::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual,
        })
}

/// Sequence view of a bindable.
pub(crate) fn as_sequence(value: &dyn Bindable) -> Result<&dyn Sequence> {
    let actual = value.descriptor().ty().name();
    match value.access() {
        Access::Sequence(sequence) => Ok(sequence),
        _ => Err(Error::TypeMismatch {
            expected: "sequence",
            actual,
        }),
    }
}

/// Mutable sequence view of a bindable.
pub(crate) fn as_sequence_mut(value: &mut dyn Bindable) -> Result<&mut dyn Sequence> {
    let actual = value.descriptor().ty().name();
    match value.access_mut() {
        AccessMut::Sequence(sequence) => Ok(sequence),
        _ => Err(Error::TypeMismatch {
            expected: "sequence",
            actual,
        }),
    }
}

/// Optional view of a bindable.
pub(crate) fn as_optional(value: &dyn Bindable) -> Result<&dyn Optional> {
    let actual = value.descriptor().ty().name();
    match value.access() {
        Access::Optional(optional) => Ok(optional),
        _ => Err(Error::TypeMismatch {
            expected: "optional",
            actual,
        }),
    }
}

/// Mutable optional view of a bindable.
pub(crate) fn as_optional_mut(value: &mut dyn Bindable) -> Result<&mut dyn Optional> {
    let actual = value.descriptor().ty().name();
    match value.access_mut() {
        AccessMut::Optional(optional) => Ok(optional),
        _ => Err(Error::TypeMismatch {
            expected: "optional",
            actual,
        }),
    }
}

/// Implement [`Bindable`] for scalar types.
///
/// The types must implement `Default`, `PartialEq` and `Send`. A type may
/// list its hybrid marshal capabilities, which are resolved once and cached:
///
/// ```
/// use fieldbind_core::bindable_scalar;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Level(u8);
///
/// impl std::fmt::Display for Level {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "L{}", self.0)
///     }
/// }
///
/// impl std::str::FromStr for Level {
///     type Err = std::num::ParseIntError;
///     fn from_str(s: &str) -> Result<Self, Self::Err> {
///         s.trim_start_matches('L').parse().map(Level)
///     }
/// }
///
/// bindable_scalar!(Level => [text_marshal, text_unmarshal]);
/// ```
#[macro_export]
macro_rules! bindable_scalar {
    (@common) => {
        fn descriptor(&self) -> $crate::TypeDescriptor {
            <Self as $crate::Bindable>::describe()
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }

        fn is_zero(&self) -> bool {
            *self == <Self as ::std::default::Default>::default()
        }
    };
    ($ty:ty => [$($capability:ident),+ $(,)?]) => {
        impl $crate::Bindable for $ty {
            fn describe() -> $crate::TypeDescriptor {
                fn capabilities() -> &'static $crate::codec::HybridCoder {
                    static CODER: ::std::sync::OnceLock<$crate::codec::HybridCoder> =
                        ::std::sync::OnceLock::new();
                    CODER.get_or_init(|| {
                        $crate::codec::Capabilities::<$ty>::new()
                            $(.$capability())+
                            .build()
                    })
                }
                $crate::TypeDescriptor::hybrid::<Self>(capabilities)
            }

            $crate::bindable_scalar!(@common);
        }
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Bindable for $ty {
                fn describe() -> $crate::TypeDescriptor {
                    $crate::TypeDescriptor::scalar::<Self>()
                }

                $crate::bindable_scalar!(@common);
            }
        )+
    };
}

bindable_scalar!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    num_complex::Complex32,
    num_complex::Complex64,
    chrono::DateTime<chrono::Utc>,
);

// ============================================================================
// Sequences
// ============================================================================

impl<T: Bindable + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<&dyn Bindable> {
        self.get(index).map(|element| element as &dyn Bindable)
    }

    fn rebuild(&mut self, len: usize, fill: &mut FillElement<'_>) -> Result<()> {
        let mut fresh = Vec::with_capacity(len);
        for index in 0..len {
            let mut element = T::default();
            fill(index, &mut element)?;
            fresh.push(element);
        }
        *self = fresh;
        Ok(())
    }
}

impl<T: Bindable + Default> Bindable for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self>(T::describe)
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
        Access::Sequence(self)
    }

    fn access_mut(&mut self) -> AccessMut<'_> {
        AccessMut::Sequence(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Bindable + Default, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element(&self, index: usize) -> Option<&dyn Bindable> {
        self.get(index).map(|element| element as &dyn Bindable)
    }

    fn rebuild(&mut self, len: usize, fill: &mut FillElement<'_>) -> Result<()> {
        if len != N {
            return Err(Error::Length {
                expected: N,
                actual: len,
            });
        }
        let mut fresh: [T; N] = std::array::from_fn(|_| T::default());
        for (index, element) in fresh.iter_mut().enumerate() {
            fill(index, element)?;
        }
        *self = fresh;
        Ok(())
    }
}

impl<T: Bindable + Default, const N: usize> Bindable for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::sequence::<Self>(T::describe)
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
        Access::Sequence(self)
    }

    fn access_mut(&mut self) -> AccessMut<'_> {
        AccessMut::Sequence(self)
    }

    fn is_zero(&self) -> bool {
        self.iter().all(Bindable::is_zero)
    }
}

// ============================================================================
// Optional containers
// ============================================================================

impl<T: Bindable + Default> Optional for Option<T> {
    fn is_valid(&self) -> bool {
        self.is_some()
    }

    fn value(&self) -> Option<&dyn Bindable> {
        self.as_ref().map(|value| value as &dyn Bindable)
    }

    fn fill(&mut self, fill: &mut FillValue<'_>) -> Result<()> {
        let mut value = T::default();
        fill(&mut value)?;
        *self = Some(value);
        Ok(())
    }
}

impl<T: Bindable + Default> Bindable for Option<T> {
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
        self.is_none()
    }
}
