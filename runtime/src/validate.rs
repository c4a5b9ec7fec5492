//! Parameter validation for the Validate phase.
//!
//! Fields marked `#[reflect(required)]` must be set: an `Option` must be
//! `Some` and a `Vec` must not be empty. Nested structs and sequence
//! elements are checked too, and every missing field is reported at once.

use reqchain_core::{Error, NamedHandler, Reflect, Request};

/// Name of the Validate step installed by [`validate_params_handler`]
pub const VALIDATE_PARAMS_HANDLER: &str = "reqchain.ValidateParams";

/// Validate step: fails with [`Error::Validation`] listing every missing
/// required field path.
#[must_use]
pub fn validate_params_handler() -> NamedHandler {
    NamedHandler::new(VALIDATE_PARAMS_HANDLER, |request: &mut Request| {
        let missing = missing_required_fields(request.params.as_reflect());
        if missing.is_empty() {
            return;
        }
        tracing::debug!(operation = %request.operation.name, ?missing, "Params failed validation");
        request.error = Some(Error::Validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    })
}

/// Paths of all required fields that are unset, in declaration order.
#[must_use]
pub fn missing_required_fields(params: &dyn Reflect) -> Vec<String> {
    let mut missing = Vec::new();
    collect_missing(params, "", &mut missing);
    missing
}

fn collect_missing(value: &dyn Reflect, prefix: &str, missing: &mut Vec<String>) {
    let value = match value.as_optional() {
        Some(optional) => match optional.get() {
            Some(inner) => return collect_missing(inner, prefix, missing),
            None => return,
        },
        None => value,
    };

    if let Some(sequence) = value.as_sequence() {
        for index in 0..sequence.len() {
            if let Some(element) = sequence.element(index) {
                collect_missing(element, &format!("{prefix}[{index}]"), missing);
            }
        }
        return;
    }

    let Some(record) = value.as_struct() else {
        return;
    };
    for info in record.fields().iter().filter(|info| info.is_public()) {
        let Some(field) = record.field(info.name) else {
            continue;
        };
        let path = if prefix.is_empty() {
            info.name.to_string()
        } else {
            format!("{prefix}.{}", info.name)
        };
        if info.required && is_unset(field) {
            missing.push(path);
            continue;
        }
        collect_missing(field, &path, missing);
    }
}

fn is_unset(value: &dyn Reflect) -> bool {
    if let Some(optional) = value.as_optional() {
        return optional.get().is_none();
    }
    value.as_sequence().is_some_and(|sequence| sequence.is_empty())
}
