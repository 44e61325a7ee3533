//! Codec registry.
//!
//! A [`Registry`] resolves the codec of a field from its
//! [`TypeDescriptor`]. Scalar resolution order, first match wins:
//!
//! 1. the named coder attached to the field;
//! 2. a type-scoped codec registered with [`Registry::register_coder`];
//! 3. the timestamp codec for `DateTime<Utc>`;
//! 4. hybrid marshal capabilities declared by the type;
//! 5. base64 for byte sequences;
//! 6. the built-in codecs;
//! 7. otherwise [`Error::UnsupportedType`].
//!
//! Optional containers resolve their inner type and get wrapped; sequences
//! resolve their element type.
//!
//! A registry is built during setup and read-only afterwards. The
//! process-wide instance is set once with [`install`] and read with
//! [`global`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::body::{BodyFormat, JsonFormat};
use crate::codec::{
    BytesCodec, FileCodec, FileMarshal, FileSlicable, FileUnmarshal, OptionalFileCodec,
    OptionalFileSlicable, OptionalSlicable, OptionalStringable, SequenceFileSlicable,
    SequenceSlicable, SingleFileSlicable, SingleSlicable, StringSlicable, Stringable, TimeCodec,
    TypedFileCodec, typed,
};
use crate::{Bindable, Error, File, Result, Shape, TypeDescriptor, TypeInfo};

/// A codec registered under a name, for one base type.
#[derive(Clone)]
pub struct NamedCoder {
    name: String,
    ty: TypeInfo,
    codec: Arc<dyn Stringable>,
}

impl NamedCoder {
    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base type the coder applies to.
    #[must_use]
    pub const fn ty(&self) -> TypeInfo {
        self.ty
    }

    /// The codec.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn Stringable> {
        &self.codec
    }
}

impl fmt::Debug for NamedCoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCoder")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Codec registry.
pub struct Registry {
    customs: HashMap<TypeId, Arc<dyn Stringable>>,
    named: HashMap<String, NamedCoder>,
    files: HashMap<TypeId, Arc<dyn FileCodec>>,
    builtins: HashMap<TypeId, Arc<dyn Stringable>>,
    time: Arc<dyn Stringable>,
    bytes: Arc<dyn Stringable>,
    body_formats: HashMap<String, Arc<dyn BodyFormat>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<_> = self.named.keys().collect();
        named.sort();
        let mut formats: Vec<_> = self.body_formats.keys().collect();
        formats.sort();
        f.debug_struct("Registry")
            .field("customs", &self.customs.len())
            .field("named", &named)
            .field("files", &self.files.len())
            .field("body_formats", &formats)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// A registry with the built-in codecs, the [`File`] file type and the
    /// `json` body format.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            customs: HashMap::new(),
            named: HashMap::new(),
            files: HashMap::new(),
            builtins: crate::codec::builtins(),
            time: typed::<DateTime<Utc>, _>(TimeCodec),
            bytes: Arc::new(BytesCodec),
            body_formats: HashMap::new(),
        };
        registry.register_file_type::<File>();
        registry
            .body_formats
            .insert("json".to_string(), Arc::new(JsonFormat));
        registry
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a codec for every field of type `T`; last write wins.
    pub fn register_coder<T: Bindable>(&mut self, codec: Arc<dyn Stringable>) -> &mut Self {
        let ty = TypeInfo::of::<T>();
        debug!(ty = ty.name(), "registering coder");
        self.customs.insert(ty.id(), codec);
        self
    }

    /// Register a codec under a name, for fields whose base type is `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if the name is taken.
    pub fn register_named_coder<T: Bindable>(
        &mut self,
        name: impl Into<String>,
        codec: Arc<dyn Stringable>,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.named.contains_key(&name) {
            return Err(Error::DuplicateRegistration {
                kind: "coder",
                name,
            });
        }
        Ok(self.replace_named_coder::<T>(name, codec))
    }

    /// Register or replace a named codec.
    pub fn replace_named_coder<T: Bindable>(
        &mut self,
        name: impl Into<String>,
        codec: Arc<dyn Stringable>,
    ) -> &mut Self {
        let name = name.into();
        let ty = TypeInfo::of::<T>();
        debug!(%name, ty = ty.name(), "registering named coder");
        self.named.insert(name.clone(), NamedCoder { name, ty, codec });
        self
    }

    /// Look up a named coder.
    #[must_use]
    pub fn named_coder(&self, name: &str) -> Option<&NamedCoder> {
        self.named.get(name)
    }

    /// Register `T` as a file-upload type.
    pub fn register_file_type<T>(&mut self) -> &mut Self
    where
        T: Bindable + FileMarshal + FileUnmarshal + Clone,
    {
        let ty = TypeInfo::of::<T>();
        debug!(ty = ty.name(), "registering file type");
        self.files
            .insert(ty.id(), Arc::new(TypedFileCodec::<T>::new()));
        self
    }

    /// Returns `true` if the base type of `descriptor` is a file type.
    #[must_use]
    pub fn is_file_type(&self, descriptor: &TypeDescriptor) -> bool {
        self.files.contains_key(&descriptor.base().id())
    }

    /// Register a body format; names are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if the name is taken.
    pub fn register_body_format(
        &mut self,
        name: impl Into<String>,
        format: Arc<dyn BodyFormat>,
    ) -> Result<&mut Self> {
        let name = name.into().to_lowercase();
        if self.body_formats.contains_key(&name) {
            return Err(Error::DuplicateRegistration {
                kind: "body format",
                name,
            });
        }
        Ok(self.replace_body_format(name, format))
    }

    /// Register or replace a body format.
    pub fn replace_body_format(
        &mut self,
        name: impl Into<String>,
        format: Arc<dyn BodyFormat>,
    ) -> &mut Self {
        let name = name.into().to_lowercase();
        debug!(%name, "registering body format");
        self.body_formats.insert(name, format);
        self
    }

    /// Look up a body format by case-insensitive name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBodyFormat`] if none is registered.
    pub fn body_format(&self, name: &str) -> Result<Arc<dyn BodyFormat>> {
        self.body_formats
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnknownBodyFormat(name.to_string()))
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve the string codec of a value type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when nothing matches, and
    /// [`Error::TypeMismatch`] when `coder` is bound to another type.
    pub fn stringable(
        &self,
        descriptor: &TypeDescriptor,
        coder: Option<&NamedCoder>,
    ) -> Result<Arc<dyn Stringable>> {
        if let Some(inner) = descriptor.inner() {
            let inner = self.stringable(&inner, coder)?;
            return Ok(Arc::new(OptionalStringable::new(inner)));
        }

        let ty = descriptor.ty();
        if let Some(coder) = coder {
            if coder.ty != ty {
                return Err(Error::TypeMismatch {
                    expected: coder.ty.name(),
                    actual: ty.name(),
                });
            }
            return Ok(Arc::clone(&coder.codec));
        }
        if let Some(codec) = self.customs.get(&ty.id()) {
            return Ok(Arc::clone(codec));
        }
        if ty.is::<DateTime<Utc>>() {
            return Ok(Arc::clone(&self.time));
        }
        if let Some(capabilities) = descriptor.hybrid_capabilities() {
            let coder = capabilities();
            if coder.is_usable() {
                return Ok(Arc::new(coder.clone()));
            }
        }
        if descriptor.is_bytes() {
            return Ok(Arc::clone(&self.bytes));
        }
        self.builtins
            .get(&ty.id())
            .cloned()
            .ok_or(Error::UnsupportedType {
                type_name: ty.name(),
            })
    }

    /// Resolve the string sequence codec of a field type.
    ///
    /// Byte sequences are a single value; other sequences are element-wise.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::stringable`].
    pub fn string_slicable(
        &self,
        descriptor: &TypeDescriptor,
        coder: Option<&NamedCoder>,
    ) -> Result<Arc<dyn StringSlicable>> {
        match descriptor.shape() {
            Shape::Optional(inner) => {
                let inner = self.string_slicable(&inner(), coder)?;
                Ok(Arc::new(OptionalSlicable::new(inner)))
            }
            Shape::Sequence(element)
                if !descriptor.is_bytes() && !self.overrides(descriptor, coder) =>
            {
                let element = self.stringable(&element(), coder)?;
                Ok(Arc::new(SequenceSlicable::new(element)))
            }
            Shape::Sequence(_) | Shape::Scalar => {
                let codec = self.stringable(descriptor, coder)?;
                Ok(Arc::new(SingleSlicable::new(codec)))
            }
        }
    }

    /// Resolve the file codec of a value type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFileType`] unless the type is a
    /// registered file type.
    pub fn file_codec(&self, descriptor: &TypeDescriptor) -> Result<Arc<dyn FileCodec>> {
        if let Some(inner) = descriptor.inner() {
            let inner = self.file_codec(&inner)?;
            return Ok(Arc::new(OptionalFileCodec::new(inner)));
        }
        let ty = descriptor.ty();
        self.files
            .get(&ty.id())
            .cloned()
            .ok_or(Error::UnsupportedFileType {
                type_name: ty.name(),
            })
    }

    /// Resolve the file sequence codec of a field type.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::file_codec`].
    pub fn file_slicable(&self, descriptor: &TypeDescriptor) -> Result<Arc<dyn FileSlicable>> {
        match descriptor.shape() {
            Shape::Optional(inner) => {
                let inner = self.file_slicable(&inner())?;
                Ok(Arc::new(OptionalFileSlicable::new(inner)))
            }
            Shape::Sequence(element) => {
                let element = self.file_codec(&element())?;
                Ok(Arc::new(SequenceFileSlicable::new(element)))
            }
            Shape::Scalar => {
                let codec = self.file_codec(descriptor)?;
                Ok(Arc::new(SingleFileSlicable::new(codec)))
            }
        }
    }

    /// Returns `true` if the sequence type itself has a codec of its own.
    fn overrides(&self, descriptor: &TypeDescriptor, coder: Option<&NamedCoder>) -> bool {
        let ty = descriptor.ty();
        coder.is_some_and(|coder| coder.ty == ty) || self.customs.contains_key(&ty.id())
    }
}

// ============================================================================
// Process-wide registry
// ============================================================================

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Install the process-wide registry.
///
/// Must run during setup, before the first call to [`global`].
///
/// # Errors
///
/// Returns [`Error::RegistryFrozen`] if a registry is already in use.
pub fn install(registry: Registry) -> Result<()> {
    GLOBAL
        .set(Arc::new(registry))
        .map_err(|_| Error::RegistryFrozen)
}

/// The process-wide registry; a default one is installed on first use.
#[must_use]
pub fn global() -> Arc<Registry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FromStrCodec, codec_fn};
    use crate::{Patch, ReceivedFile};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn builtin_scalar_roundtrip() {
        let registry = Registry::new();
        let codec = registry
            .stringable(&i32::describe(), None)
            .expect("resolve");
        let mut value = 0_i32;
        codec.decode(&mut value, "-12").expect("decode");
        assert_eq!(value, -12);
        assert_eq!(codec.encode(&value).expect("encode"), "-12");
    }

    #[test]
    fn unsupported_type() {
        #[derive(Default, PartialEq)]
        struct Unit;
        crate::bindable_scalar!(Unit);

        let err = Registry::new()
            .stringable(&Unit::describe(), None)
            .err()
            .expect("unsupported");
        assert!(matches!(err, Error::UnsupportedType { .. }));
    }

    #[test]
    fn custom_coder_beats_builtin() {
        let mut registry = Registry::new();
        registry.register_coder::<bool>(typed::<bool, _>(codec_fn(
            |value: &bool| Ok(if *value { "yes" } else { "no" }.to_string()),
            |input: &str| Ok(input == "yes"),
        )));
        let codec = registry
            .stringable(&bool::describe(), None)
            .expect("resolve");
        assert_eq!(codec.encode(&true).expect("encode"), "yes");
    }

    #[test]
    fn named_coder_beats_custom_and_checks_type() {
        let mut registry = Registry::new();
        registry.register_coder::<u8>(typed::<u8, _>(FromStrCodec::<u8>::new()));
        registry
            .register_named_coder::<u8>(
                "hex",
                typed::<u8, _>(codec_fn(
                    |value: &u8| Ok(format!("{value:02x}")),
                    |input: &str| {
                        u8::from_str_radix(input, 16).map_err(|err| Error::parse("u8", input, err))
                    },
                )),
            )
            .expect("register");
        let hex = registry.named_coder("hex").cloned().expect("named");

        let codec = registry
            .stringable(&u8::describe(), Some(&hex))
            .expect("resolve");
        assert_eq!(codec.encode(&255_u8).expect("encode"), "ff");

        let err = registry
            .stringable(&u16::describe(), Some(&hex))
            .err()
            .expect("mismatch");
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn duplicate_named_coder() {
        let mut registry = Registry::new();
        let codec = typed::<u8, _>(FromStrCodec::<u8>::new());
        registry
            .register_named_coder::<u8>("n", Arc::clone(&codec))
            .expect("first");
        let err = registry
            .register_named_coder::<u8>("n", Arc::clone(&codec))
            .err()
            .expect("duplicate");
        assert!(matches!(err, Error::DuplicateRegistration { kind: "coder", .. }));
        registry.replace_named_coder::<u8>("n", codec);
    }

    #[test]
    fn named_coder_applies_to_elements() {
        let mut registry = Registry::new();
        registry.replace_named_coder::<u16>(
            "hex",
            typed::<u16, _>(codec_fn(
                |value: &u16| Ok(format!("{value:x}")),
                |input: &str| {
                    u16::from_str_radix(input, 16).map_err(|err| Error::parse("u16", input, err))
                },
            )),
        );
        let hex = registry.named_coder("hex").cloned();
        let codec = registry
            .string_slicable(&Patch::<Vec<u16>>::describe(), hex.as_ref())
            .expect("resolve");
        let mut value: Patch<Vec<u16>> = Patch::default();
        codec
            .decode_all(&mut value, &strings(&["a", "ff"]))
            .expect("decode");
        assert_eq!(value, Patch::some(vec![10, 255]));
    }

    #[test]
    fn timestamps_use_time_codec() {
        let registry = Registry::new();
        let codec = registry
            .stringable(&<DateTime<Utc>>::describe(), None)
            .expect("resolve");
        let mut value = DateTime::<Utc>::default();
        codec.decode(&mut value, "2006-01-02").expect("decode");
        assert_eq!(codec.encode(&value).expect("encode"), "2006-01-02T00:00:00Z");
    }

    #[test]
    fn byte_sequences_are_single_values() {
        let registry = Registry::new();
        let codec = registry
            .string_slicable(&Vec::<u8>::describe(), None)
            .expect("resolve");
        assert_eq!(
            codec.encode_all(&b"hi".to_vec()).expect("encode"),
            Some(strings(&["aGk="]))
        );
        let mut decoded: Vec<u8> = Vec::new();
        codec
            .decode_all(&mut decoded, &strings(&["aGk=", "ignored"]))
            .expect("decode");
        assert_eq!(decoded, b"hi");
    }

    #[test]
    fn slice_failure_reports_index() {
        let registry = Registry::new();
        let codec = registry
            .string_slicable(&Vec::<i32>::describe(), None)
            .expect("resolve");
        let mut values: Vec<i32> = Vec::new();
        let err = codec
            .decode_all(&mut values, &strings(&["1", "2", "x"]))
            .expect_err("index 2");
        assert_eq!(err.index(), Some(2));
        assert!(values.is_empty());
    }

    #[test]
    fn optional_scalar_absent_and_present() {
        let registry = Registry::new();
        let codec = registry
            .string_slicable(&Patch::<i64>::describe(), None)
            .expect("resolve");

        let mut value: Patch<i64> = Patch::default();
        assert_eq!(codec.encode_all(&value).expect("encode"), None);

        let err = codec
            .decode_all(&mut value, &strings(&["nope"]))
            .expect_err("invalid");
        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(value, Patch::none());

        codec
            .decode_all(&mut value, &strings(&["42"]))
            .expect("decode");
        assert_eq!(value, Patch::some(42));
    }

    #[test]
    fn file_types() {
        let registry = Registry::new();
        assert!(registry.is_file_type(&File::describe()));
        assert!(registry.is_file_type(&Vec::<File>::describe()));
        assert!(registry.is_file_type(&Patch::<File>::describe()));
        assert!(!registry.is_file_type(&String::describe()));

        let err = registry
            .file_slicable(&String::describe())
            .err()
            .expect("unsupported");
        assert!(matches!(err, Error::UnsupportedFileType { .. }));

        let codec = registry
            .file_slicable(&Vec::<File>::describe())
            .expect("resolve");
        let mut files: Vec<File> = Vec::new();
        codec
            .decode_all(&mut files, &[ReceivedFile::new("a", "1"), ReceivedFile::new("b", "2")])
            .expect("decode");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn body_formats() {
        let mut registry = Registry::new();
        let json = registry.body_format("json").expect("json");
        assert_eq!(json.content_type(), "application/json");

        assert!(matches!(
            registry.body_format("xml").err(),
            Some(Error::UnknownBodyFormat(name)) if name == "xml"
        ));
        assert!(registry
            .register_body_format("json", Arc::new(JsonFormat))
            .is_err());
        registry
            .register_body_format("json-alt", Arc::new(JsonFormat))
            .expect("register");
        assert!(registry.body_format("json-alt").is_ok());
    }

    #[test]
    fn body_format_names_ignore_case() {
        let mut registry = Registry::new();
        registry
            .register_body_format("JSON-Alt", Arc::new(JsonFormat))
            .expect("register");

        assert!(registry.body_format("json-alt").is_ok());
        assert!(registry.body_format("JSON-ALT").is_ok());
        assert!(registry.body_format("Json").is_ok());
        assert!(matches!(
            registry.register_body_format("json-ALT", Arc::new(JsonFormat)),
            Err(Error::DuplicateRegistration { ref name, .. }) if name == "json-alt"
        ));
    }

    #[test]
    fn global_registry_is_frozen_after_first_read() {
        let first = global();
        let second = global();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(install(Registry::new()), Err(Error::RegistryFrozen)));
    }
}
