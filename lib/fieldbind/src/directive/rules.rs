//! Directives that constrain a field instead of reading a source.

use fieldbind_core::{DecodeRuntime, DirectiveExecutor, EncodeRuntime, Error, Result};

use super::extract::extract_strings;

/// `default`: arguments used when no earlier directive set the field.
///
/// Encoding runs before the sink directives and makes them write the
/// arguments in place of a zero field.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValue;

impl DirectiveExecutor for DefaultValue {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        if runtime.is_field_set() {
            return Ok(());
        }
        let argv = runtime.directive().argv();
        extract_strings(runtime, "default", argv)
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        if runtime.field().is_zero() {
            let argv = runtime.directive().argv().to_vec();
            runtime.set_fallback(argv);
        }
        Ok(())
    }

    fn encode_priority(&self) -> i8 {
        -2
    }
}

/// `required`: decoding fails unless an earlier directive set the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl DirectiveExecutor for Required {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        if runtime.is_field_set() {
            Ok(())
        } else {
            Err(Error::MissingRequired)
        }
    }

    fn encode(&self, _runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        Ok(())
    }
}

/// `nonzero`: the field must not hold its zero value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonZero;

impl DirectiveExecutor for NonZero {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        if runtime.field().is_zero() {
            return Err(Error::ZeroValue);
        }
        Ok(())
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        // a `default` fallback stands in for the zero value
        if runtime.field().is_zero() && runtime.fallback().is_none() {
            return Err(Error::ZeroValue);
        }
        Ok(())
    }

    fn encode_priority(&self) -> i8 {
        -1
    }
}

/// `omitempty`: a zero field contributes no key when encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct OmitEmpty;

impl DirectiveExecutor for OmitEmpty {
    fn decode(&self, _runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        Ok(())
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        runtime.set_omit_empty(true);
        Ok(())
    }

    fn encode_priority(&self) -> i8 {
        -3
    }
}

/// `coder`: names the registered coder of the field.
///
/// The engine binds the coder before the pass; the directive itself does
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coder;

impl DirectiveExecutor for Coder {
    fn decode(&self, _runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        Ok(())
    }

    fn encode(&self, _runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        Ok(())
    }
}
