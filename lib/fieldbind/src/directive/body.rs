use std::sync::Arc;

use fieldbind_core::{
    Body as RequestBody, BodyFormat, DecodeRuntime, DirectiveExecutor, EncodeRuntime, Error,
    Registry, Result,
};

/// `body`: the whole request body through a body format, `json` unless
/// named by the first argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct Body;

impl Body {
    fn format(registry: &Registry, argv: &[String]) -> Result<(String, Arc<dyn BodyFormat>)> {
        let name = argv
            .first()
            .map_or_else(|| "json".to_string(), |name| name.to_lowercase());
        let format = registry.body_format(&name)?;
        Ok((name, format))
    }
}

impl DirectiveExecutor for Body {
    fn decode(&self, runtime: &mut DecodeRuntime<'_>) -> Result<()> {
        let (_, format) = Self::format(runtime.registry(), runtime.directive().argv())?;
        let body = runtime.request().body();
        if body.is_empty() {
            return Ok(());
        }
        let value = format.decode(body)?;

        let type_name = runtime.field().descriptor().ty().name();
        let payload = runtime
            .field_mut()
            .payload_mut()
            .ok_or_else(|| Error::invalid(format!("{type_name} cannot be bound to a body")))?;
        payload.replace_from_value(value)?;
        runtime.mark_field_set(true);
        Ok(())
    }

    fn encode(&self, runtime: &mut EncodeRuntime<'_>) -> Result<()> {
        let (name, format) = Self::format(runtime.registry(), runtime.directive().argv())?;
        let field = runtime.field();
        let payload = field.payload().ok_or_else(|| {
            Error::invalid(format!(
                "{} cannot be bound to a body",
                field.descriptor().ty().name()
            ))
        })?;
        let bytes = format.encode(&payload.to_value()?)?;

        runtime
            .builder()
            .set_body(RequestBody::new(name, format.content_type(), bytes));
        runtime.mark_field_set(true);
        Ok(())
    }
}
