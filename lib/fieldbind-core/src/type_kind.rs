//! Shape classification of bindable field types.
//!
//! Every [`Bindable`](crate::Bindable) type describes itself statically with a
//! [`TypeDescriptor`]. The descriptor records the type identity and its
//! [`Shape`]; [`TypeDescriptor::kind`] folds that shape into one of the four
//! [`TypeKind`]s used to pick a codec adapter.

use std::any::TypeId;
use std::fmt;

/// The four-way shape of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A single value.
    Scalar,
    /// A sequence of values (`Vec<T>`, `[T; N]`).
    Slice,
    /// An optional container around a scalar.
    OptionalScalar,
    /// An optional container around a sequence.
    OptionalSlice,
}

impl TypeKind {
    /// Returns `true` for both optional shapes.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::OptionalScalar | Self::OptionalSlice)
    }
}

/// Identity of a Rust type: its [`TypeId`] and a printable name.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Identity of `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type id.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by [`std::any::type_name`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this is the identity of `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Structural shape of a type.
///
/// Inner descriptors are produced lazily so that descriptors stay `Copy`.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    /// A single value.
    Scalar,
    /// A sequence; the function describes the element type.
    Sequence(fn() -> TypeDescriptor),
    /// A value plus a presence flag; the function describes the value type.
    Optional(fn() -> TypeDescriptor),
}

/// Static description of a bindable type.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    ty: TypeInfo,
    shape: Shape,
    hybrid: Option<fn() -> &'static crate::codec::HybridCoder>,
}

impl TypeDescriptor {
    /// Describe a scalar type.
    #[must_use]
    pub fn scalar<T: 'static>() -> Self {
        Self {
            ty: TypeInfo::of::<T>(),
            shape: Shape::Scalar,
            hybrid: None,
        }
    }

    /// Describe a scalar type that carries hybrid marshal capabilities.
    #[must_use]
    pub fn hybrid<T: 'static>(capabilities: fn() -> &'static crate::codec::HybridCoder) -> Self {
        Self {
            ty: TypeInfo::of::<T>(),
            shape: Shape::Scalar,
            hybrid: Some(capabilities),
        }
    }

    /// Describe a sequence type.
    #[must_use]
    pub fn sequence<T: 'static>(element: fn() -> Self) -> Self {
        Self {
            ty: TypeInfo::of::<T>(),
            shape: Shape::Sequence(element),
            hybrid: None,
        }
    }

    /// Describe an optional container type.
    #[must_use]
    pub fn optional<T: 'static>(inner: fn() -> Self) -> Self {
        Self {
            ty: TypeInfo::of::<T>(),
            shape: Shape::Optional(inner),
            hybrid: None,
        }
    }

    /// Identity of the described type.
    #[must_use]
    pub const fn ty(&self) -> TypeInfo {
        self.ty
    }

    /// Structural shape.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Hybrid capability table, if the type declared one.
    #[must_use]
    pub const fn hybrid_capabilities(&self) -> Option<fn() -> &'static crate::codec::HybridCoder> {
        self.hybrid
    }

    /// Element descriptor of a sequence.
    #[must_use]
    pub fn element(&self) -> Option<Self> {
        match self.shape {
            Shape::Sequence(element) => Some(element()),
            _ => None,
        }
    }

    /// Value descriptor of an optional container.
    #[must_use]
    pub fn inner(&self) -> Option<Self> {
        match self.shape {
            Shape::Optional(inner) => Some(inner()),
            _ => None,
        }
    }

    /// Four-way classification.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self.shape {
            Shape::Scalar => TypeKind::Scalar,
            Shape::Sequence(_) => TypeKind::Slice,
            Shape::Optional(inner) => match inner().shape {
                Shape::Sequence(_) => TypeKind::OptionalSlice,
                _ => TypeKind::OptionalScalar,
            },
        }
    }

    /// Base type: the optional container is unwrapped, then one sequence level.
    #[must_use]
    pub fn base(&self) -> TypeInfo {
        let unwrapped = self.inner().unwrap_or(*self);
        unwrapped.element().map_or(unwrapped.ty, |element| element.ty)
    }

    /// Returns `true` for byte sequences, which encode as one base64 string.
    #[must_use]
    pub fn is_bytes(&self) -> bool {
        self.element().is_some_and(|element| element.ty.is::<u8>())
    }
}

/// Classify `T` into its base type and [`TypeKind`].
///
/// Classification depends on the static type only.
#[must_use]
pub fn classify<T: crate::Bindable>() -> (TypeInfo, TypeKind) {
    let descriptor = T::describe();
    (descriptor.base(), descriptor.kind())
}
