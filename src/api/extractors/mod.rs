//! Custom request extractors.

mod validated_json;
mod validated_query;

pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;

use axum::extract::rejection::JsonRejection;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Client-facing message for a body that never reached validation.
pub(crate) fn json_rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(err) => match missing_field(&err.body_text()) {
            Some(field) => format!("{} is required", field),
            None => "Invalid request body".to_string(),
        },
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON body".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "Content-Type must be application/json".to_string()
        }
        other => other.body_text(),
    }
}

/// Field name out of serde's "missing field `x`" error text.
fn missing_field(text: &str) -> Option<&str> {
    let rest = text.split("missing field `").nth(1)?;
    rest.split('`').next().filter(|field| !field.is_empty())
}

/// Message of the first failing field, in field-name order.
///
/// Nested structs and lists are searched depth first.
pub(crate) fn first_validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let message = match kind {
            ValidationErrorsKind::Field(errs) => errs.first().map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            }),
            ValidationErrorsKind::Struct(inner) => Some(first_validation_message(inner)),
            ValidationErrorsKind::List(items) => {
                items.values().next().map(|inner| first_validation_message(inner))
            }
        };

        if let Some(message) = message {
            return message;
        }
    }

    "Invalid request".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Inner {
        #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
        latitude: f64,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(length(min = 2, message = "Name too short"))]
        name: String,
        #[validate(nested)]
        location: Inner,
    }

    #[test]
    fn test_first_message_in_field_order() {
        let value = Outer {
            name: "x".to_string(),
            location: Inner { latitude: 120.0 },
        };
        let errors = value.validate().unwrap_err();

        // "location" sorts before "name"
        assert_eq!(first_validation_message(&errors), "Latitude out of range");
    }

    #[test]
    fn test_missing_field_name_is_extracted() {
        let text = "Failed to deserialize the JSON body into the target type: \
                    missing field `location` at line 1 column 42";
        assert_eq!(missing_field(text), Some("location"));
    }

    #[test]
    fn test_other_data_errors_have_no_field() {
        assert_eq!(missing_field("invalid type: string \"x\", expected f64"), None);
        assert_eq!(missing_field("missing field ``"), None);
    }

    #[test]
    fn test_single_field_message() {
        let value = Outer {
            name: "x".to_string(),
            location: Inner { latitude: 10.0 },
        };
        let errors = value.validate().unwrap_err();
        assert_eq!(first_validation_message(&errors), "Name too short");
    }
}
