//! Field-tagged errors of decode and encode passes.

use derive_more::{Display, Error, From};

/// A field failed while a directive processed it.
///
/// The key and raw values are those of the extraction that failed, when
/// the directive read from a keyed source.
#[derive(Debug, Display, Error)]
#[display("invalid field {field:?} ({directive}): {source}")]
pub struct InvalidFieldError {
    field: String,
    directive: String,
    source: fieldbind_core::Error,
}

impl InvalidFieldError {
    /// Tag `source` with the field and directive names.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        directive: impl Into<String>,
        source: fieldbind_core::Error,
    ) -> Self {
        Self {
            field: field.into(),
            directive: directive.into(),
            source,
        }
    }

    /// Declared field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Name of the directive that failed.
    #[must_use]
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Lookup key of the failed extraction.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.source {
            fieldbind_core::Error::Extraction { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Raw values of the failed extraction.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match &self.source {
            fieldbind_core::Error::Extraction { values, .. } => values,
            _ => &[],
        }
    }

    /// Underlying error.
    #[must_use]
    pub const fn cause(&self) -> &fieldbind_core::Error {
        &self.source
    }
}

/// Every field failure of one encode pass.
#[derive(Debug, Display, Error)]
#[display("{} invalid fields: {}", errors.len(), display_all(errors))]
pub struct MultiInvalidFieldError {
    #[error(not(source))]
    errors: Vec<InvalidFieldError>,
}

impl MultiInvalidFieldError {
    /// Aggregate field errors.
    #[must_use]
    pub const fn new(errors: Vec<InvalidFieldError>) -> Self {
        Self { errors }
    }

    /// The individual failures, in field order.
    #[must_use]
    pub fn errors(&self) -> &[InvalidFieldError] {
        &self.errors
    }
}

fn display_all(errors: &[InvalidFieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for the binding engine.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// A field failed to decode or encode.
    #[display("{_0}")]
    #[from]
    InvalidField(InvalidFieldError),

    /// Several fields failed to encode.
    #[display("{_0}")]
    #[from]
    InvalidFields(MultiInvalidFieldError),

    /// A field declares a directive that is not registered.
    #[display("unknown directive {name:?} on field {field:?}")]
    #[from(skip)]
    UnknownDirective {
        /// Declared field name.
        field: String,
        /// Directive name.
        name: String,
    },

    /// Error outside any field.
    #[display("{_0}")]
    #[from]
    Core(fieldbind_core::Error),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if the error comes from a cancelled operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::InvalidField(err) => err.cause().is_cancelled(),
            Self::InvalidFields(err) => err.errors().iter().any(|err| err.cause().is_cancelled()),
            Self::Core(err) => err.is_cancelled(),
            Self::UnknownDirective { .. } => false,
        }
    }

    /// The field error, if a single field failed.
    #[must_use]
    pub const fn as_invalid_field(&self) -> Option<&InvalidFieldError> {
        match self {
            Self::InvalidField(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_failure() -> InvalidFieldError {
        InvalidFieldError::new(
            "Age",
            "form",
            fieldbind_core::Error::extraction(
                "age",
                vec!["apple".to_string()],
                fieldbind_core::Error::parse("i64", "apple", "invalid digit found in string"),
            ),
        )
    }

    #[test]
    fn invalid_field_display() {
        let err = parse_failure();
        insta::assert_snapshot!(
            err.to_string(),
            @r#"invalid field "Age" (form): key "age" with values ["apple"]: invalid i64 "apple": invalid digit found in string"#
        );
        assert_eq!(err.field(), "Age");
        assert_eq!(err.directive(), "form");
        assert_eq!(err.key(), Some("age"));
        assert_eq!(err.values(), ["apple".to_string()]);
    }

    #[test]
    fn multi_error_display() {
        let err = MultiInvalidFieldError::new(vec![
            parse_failure(),
            InvalidFieldError::new("Token", "nonzero", fieldbind_core::Error::ZeroValue),
        ]);
        assert_eq!(err.errors().len(), 2);
        assert!(err.to_string().starts_with("2 invalid fields: "));
        assert!(err.to_string().ends_with(r#"invalid field "Token" (nonzero): zero value"#));
    }

    #[test]
    fn cancellation_is_detected_through_tags() {
        let err = Error::from(InvalidFieldError::new(
            "Upload",
            "form",
            fieldbind_core::Error::extraction("upload", vec![], fieldbind_core::Error::Cancelled),
        ));
        assert!(err.is_cancelled());
        assert!(!Error::from(fieldbind_core::Error::ZeroValue).is_cancelled());
    }
}
