use std::collections::BTreeMap;

use fieldbind_core::{DecodeRuntime, Directive, Error, ReceivedFile, Result};

/// Lookup keys of a directive: its arguments, else the field name.
pub(crate) fn keys(directive: &Directive, field_name: &str) -> Vec<String> {
    if directive.argv().is_empty() {
        vec![field_name.to_string()]
    } else {
        directive.argv().to_vec()
    }
}

/// Decode the field from the first key that has input.
///
/// Nothing happens once the field is set. Keys without input are skipped.
/// File fields read from `files` instead of `values`.
pub(crate) fn extract<F>(
    runtime: &mut DecodeRuntime<'_>,
    values: F,
    files: Option<&BTreeMap<String, Vec<ReceivedFile>>>,
) -> Result<()>
where
    F: Fn(&str) -> Vec<String>,
{
    for key in keys(runtime.directive(), runtime.field_name()) {
        if runtime.is_field_set() {
            break;
        }
        if runtime.is_file_field() {
            let uploaded = files.and_then(|files| files.get(&key)).map_or(&[][..], Vec::as_slice);
            extract_files(runtime, &key, uploaded)?;
        } else {
            extract_strings(runtime, &key, &values(&key))?;
        }
    }
    Ok(())
}

/// Decode raw strings into the field under `key`, then mark it set.
pub(crate) fn extract_strings(
    runtime: &mut DecodeRuntime<'_>,
    key: &str,
    values: &[String],
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    runtime
        .string_slicable()
        .and_then(|codec| codec.decode_all(runtime.field_mut(), values))
        .map_err(|err| Error::extraction(key, values.to_vec(), err))?;
    runtime.mark_field_set(true);
    Ok(())
}

fn extract_files(runtime: &mut DecodeRuntime<'_>, key: &str, files: &[ReceivedFile]) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    runtime
        .file_slicable()
        .and_then(|codec| codec.decode_all(runtime.field_mut(), files))
        .map_err(|err| {
            let names = files.iter().map(|file| file.filename().to_string()).collect();
            Error::extraction(key, names, err)
        })?;
    runtime.mark_field_set(true);
    Ok(())
}
