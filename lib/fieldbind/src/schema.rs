//! Record schemas: the fields of a type and the directives declared on them.
//!
//! # Example
//!
//! ```
//! use fieldbind::{Field, Patch, Record, field};
//!
//! #[derive(Default)]
//! struct ListUsers {
//!     page: u32,
//!     tags: Vec<String>,
//!     token: Patch<String>,
//! }
//!
//! impl Record for ListUsers {
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             field!(Self, page).directive("query", &["page"]).directive("default", &["1"]),
//!             field!(Self, tags).directive("query", &["tag"]),
//!             field!(Self, token as "Token").directive("header", &["x-api-token"]),
//!         ]
//!     }
//! }
//!
//! assert_eq!(ListUsers::fields()[2].name(), "Token");
//! ```

use std::fmt;
use std::sync::Arc;

use fieldbind_core::{Bindable, Directive};

type Getter<R> = Arc<dyn Fn(&R) -> &(dyn Bindable) + Send + Sync>;
type GetterMut<R> = Arc<dyn Fn(&mut R) -> &mut (dyn Bindable) + Send + Sync>;

/// A type whose fields bind to HTTP data.
pub trait Record: Send + 'static {
    /// Fields in declaration order.
    fn fields() -> Vec<Field<Self>>
    where
        Self: Sized;
}

/// One field of a record: name, storage accessors and directives.
pub struct Field<R> {
    name: String,
    get: Getter<R>,
    get_mut: GetterMut<R>,
    directives: Vec<Directive>,
}

impl<R: 'static> Field<R> {
    /// Create a field from its accessors.
    #[must_use]
    pub fn new<T, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: Bindable + Sync,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            get: getter(move |record| get(record)),
            get_mut: getter_mut(move |record| get_mut(record)),
            directives: Vec::new(),
        }
    }

    /// Fields of a nested record, reached through `get` and `get_mut`.
    ///
    /// Nested fields keep their own names and directives.
    pub fn nested<C, G, M>(get: G, get_mut: M) -> impl Iterator<Item = Self>
    where
        C: Record,
        G: Fn(&R) -> &C + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut C + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);
        C::fields().into_iter().map(move |child| {
            let (outer, outer_mut) = (Arc::clone(&get), Arc::clone(&get_mut));
            let (inner, inner_mut) = (child.get, child.get_mut);
            Self {
                name: child.name,
                get: getter(move |record| inner(outer(record))),
                get_mut: getter_mut(move |record| inner_mut(outer_mut(record))),
                directives: child.directives,
            }
        })
    }

    /// Declare a directive; directives run in declaration order.
    #[must_use]
    pub fn directive(mut self, name: &str, argv: &[&str]) -> Self {
        self.directives.push(Directive::new(name, argv.iter().copied()));
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared directives.
    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Field storage of `record`.
    pub fn get<'r>(&self, record: &'r R) -> &'r dyn Bindable {
        (self.get)(record)
    }

    /// Mutable field storage of `record`.
    pub fn get_mut<'r>(&self, record: &'r mut R) -> &'r mut dyn Bindable {
        (self.get_mut)(record)
    }
}

impl<R> Clone for Field<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            get: Arc::clone(&self.get),
            get_mut: Arc::clone(&self.get_mut),
            directives: self.directives.clone(),
        }
    }
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("directives", &self.directives)
            .finish_non_exhaustive()
    }
}

fn getter<R, F>(get: F) -> Getter<R>
where
    F: Fn(&R) -> &(dyn Bindable) + Send + Sync + 'static,
{
    Arc::new(get)
}

fn getter_mut<R, F>(get_mut: F) -> GetterMut<R>
where
    F: Fn(&mut R) -> &mut (dyn Bindable) + Send + Sync + 'static,
{
    Arc::new(get_mut)
}

/// Declare a [`Field`] bound to a struct member.
///
/// The field name is the member name unless renamed with `as`.
#[macro_export]
macro_rules! field {
    ($record:ty, $member:ident) => {
        $crate::field!($record, $member as stringify!($member))
    };
    ($record:ty, $member:ident as $name:expr) => {
        $crate::Field::<$record>::new(
            $name,
            |record: &$record| &record.$member,
            |record: &mut $record| &mut record.$member,
        )
    };
}
