//! File codecs: the upload analogue of the string codecs.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::{Bindable, Error, ReceivedFile, Result, Upload, bindable};

/// Produce an upload from a value.
pub trait FileMarshal {
    /// Describe the upload.
    fn marshal_file(&self) -> Result<Upload>;
}

/// Store a received file into a value.
pub trait FileUnmarshal {
    /// Store `file`.
    fn unmarshal_file(&mut self, file: &ReceivedFile) -> Result<()>;
}

/// Converts one value to and from a file.
pub trait FileCodec: Send + Sync {
    /// Produce the upload.
    fn encode(&self, value: &dyn Bindable) -> Result<Upload>;

    /// Store a received file; the target is unchanged on error.
    fn decode(&self, value: &mut dyn Bindable, file: &ReceivedFile) -> Result<()>;
}

/// Converts a value to and from an ordered list of files.
pub trait FileSlicable: Send + Sync {
    /// Produce the uploads; `None` means the value is absent.
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<Upload>>>;

    /// Store received files.
    fn decode_all(&self, value: &mut dyn Bindable, files: &[ReceivedFile]) -> Result<()>;
}

/// [`FileCodec`] for a type implementing [`FileMarshal`] and [`FileUnmarshal`].
pub struct TypedFileCodec<T>(PhantomData<fn() -> T>);

impl<T> TypedFileCodec<T> {
    /// Create the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedFileCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FileCodec for TypedFileCodec<T>
where
    T: Bindable + FileMarshal + FileUnmarshal + Clone,
{
    fn encode(&self, value: &dyn Bindable) -> Result<Upload> {
        bindable::downcast_ref::<T>(value)?.marshal_file()
    }

    fn decode(&self, value: &mut dyn Bindable, file: &ReceivedFile) -> Result<()> {
        let target = bindable::downcast_mut::<T>(value)?;
        let mut staged = target.clone();
        staged.unmarshal_file(file)?;
        *target = staged;
        Ok(())
    }
}

/// [`FileCodec`] over an optional container.
pub struct OptionalFileCodec {
    inner: Arc<dyn FileCodec>,
}

impl OptionalFileCodec {
    /// Wrap the codec of the contained type.
    #[must_use]
    pub fn new(inner: Arc<dyn FileCodec>) -> Self {
        Self { inner }
    }
}

impl FileCodec for OptionalFileCodec {
    fn encode(&self, value: &dyn Bindable) -> Result<Upload> {
        match bindable::as_optional(value)?.value() {
            Some(inner) => self.inner.encode(inner),
            None => Err(Error::Absent),
        }
    }

    fn decode(&self, value: &mut dyn Bindable, file: &ReceivedFile) -> Result<()> {
        bindable::as_optional_mut(value)?.fill(&mut |inner| self.inner.decode(inner, file))
    }
}

/// [`FileSlicable`] over an optional container; invalid encodes to `None`.
pub struct OptionalFileSlicable {
    inner: Arc<dyn FileSlicable>,
}

impl OptionalFileSlicable {
    /// Wrap the sequence codec of the contained type.
    #[must_use]
    pub fn new(inner: Arc<dyn FileSlicable>) -> Self {
        Self { inner }
    }
}

impl FileSlicable for OptionalFileSlicable {
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<Upload>>> {
        match bindable::as_optional(value)?.value() {
            Some(inner) => self.inner.encode_all(inner),
            None => Ok(None),
        }
    }

    fn decode_all(&self, value: &mut dyn Bindable, files: &[ReceivedFile]) -> Result<()> {
        bindable::as_optional_mut(value)?.fill(&mut |inner| self.inner.decode_all(inner, files))
    }
}

/// Element-wise file codec.
pub struct SequenceFileSlicable {
    element: Arc<dyn FileCodec>,
}

impl SequenceFileSlicable {
    /// Wrap the element codec.
    #[must_use]
    pub fn new(element: Arc<dyn FileCodec>) -> Self {
        Self { element }
    }
}

impl FileSlicable for SequenceFileSlicable {
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<Upload>>> {
        let sequence = bindable::as_sequence(value)?;
        let mut uploads = Vec::with_capacity(sequence.len());
        for index in 0..sequence.len() {
            let Some(element) = sequence.element(index) else {
                continue;
            };
            let upload = self
                .element
                .encode(element)
                .map_err(|err| Error::at_index(index, err))?;
            uploads.push(upload);
        }
        Ok(Some(uploads))
    }

    fn decode_all(&self, value: &mut dyn Bindable, files: &[ReceivedFile]) -> Result<()> {
        bindable::as_sequence_mut(value)?.rebuild(files.len(), &mut |index, element| {
            let Some(file) = files.get(index) else {
                return Ok(());
            };
            self.element
                .decode(element, file)
                .map_err(|err| Error::at_index(index, err))
        })
    }
}

/// Degenerate file sequence codec for a single value.
pub struct SingleFileSlicable {
    inner: Arc<dyn FileCodec>,
}

impl SingleFileSlicable {
    /// Wrap a file codec.
    #[must_use]
    pub fn new(inner: Arc<dyn FileCodec>) -> Self {
        Self { inner }
    }
}

impl FileSlicable for SingleFileSlicable {
    fn encode_all(&self, value: &dyn Bindable) -> Result<Option<Vec<Upload>>> {
        match self.inner.encode(value) {
            Ok(upload) => Ok(Some(vec![upload])),
            Err(Error::Absent) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn decode_all(&self, value: &mut dyn Bindable, files: &[ReceivedFile]) -> Result<()> {
        match files.first() {
            Some(file) => self.inner.decode(value, file),
            None => Ok(()),
        }
    }
}
