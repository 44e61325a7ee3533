use fieldbind_core::{EncodeRuntime, Result};

/// Where an encoding directive writes its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sink {
    Query,
    Form,
    Header,
    Cookie,
    Path,
}

/// Encode the field into `sink` under its key, then mark it set.
///
/// A zero field writes the `default` fallback when there is one and
/// nothing under `omitempty`. An absent optional writes nothing. File
/// fields of the form sink become attachments.
pub(crate) fn encode(runtime: &mut EncodeRuntime<'_>, sink: Sink) -> Result<()> {
    if runtime.is_field_set() {
        return Ok(());
    }
    let key = runtime
        .directive()
        .argv()
        .first()
        .map_or(runtime.field_name(), String::as_str);
    let field = runtime.field();

    if field.is_zero() {
        if let Some(fallback) = runtime.fallback() {
            let fallback = fallback.to_vec();
            return write(runtime, sink, key, fallback);
        }
        if runtime.omit_empty() {
            return Ok(());
        }
    }

    if sink == Sink::Form && runtime.is_file_field() {
        let Some(uploads) = runtime.file_slicable()?.encode_all(field)? else {
            return Ok(());
        };
        if uploads.is_empty() {
            return Ok(());
        }
        runtime.builder().set_attachment(key, uploads);
        runtime.mark_field_set(true);
        return Ok(());
    }

    match runtime.string_slicable()?.encode_all(field)? {
        Some(values) => write(runtime, sink, key, values),
        None => Ok(()),
    }
}

fn write(runtime: &mut EncodeRuntime<'_>, sink: Sink, key: &str, values: Vec<String>) -> Result<()> {
    let builder = runtime.builder();
    match sink {
        Sink::Query => builder.set_query(key, values),
        Sink::Form => builder.set_form(key, values),
        Sink::Header => builder.set_header(key, values)?,
        Sink::Cookie => builder.set_cookie(key, values),
        Sink::Path => builder.set_path(key, values),
    }
    runtime.mark_field_set(true);
    Ok(())
}
