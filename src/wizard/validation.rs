//! Field validation hooks
//!
//! Real validation rules belong to the form layer; the wizard only needs to
//! ask "do these fields pass?" for one step at a time, or for the whole form
//! before submitting.

use std::collections::BTreeMap;

use crate::models::FieldValues;

/// Field name to error message
pub type FieldErrors = BTreeMap<String, String>;

/// Validates one field value
pub trait FieldValidator {
    /// Check a value, returning a user-facing message on failure
    fn validate(&self, field: &str, value: &str) -> Result<(), String>;
}

impl<F> FieldValidator for F
where
    F: Fn(&str, &str) -> Result<(), String>,
{
    fn validate(&self, field: &str, value: &str) -> Result<(), String> {
        self(field, value)
    }
}

/// Accepts any non-blank value
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFields;

impl FieldValidator for RequiredFields {
    fn validate(&self, _field: &str, value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err("This field is required".to_string())
        } else {
            Ok(())
        }
    }
}

/// Validate `fields` against `values`; missing fields validate as empty
pub fn validate_fields<'a, I>(
    validator: &dyn FieldValidator,
    values: &FieldValues,
    fields: I,
) -> Result<(), FieldErrors>
where
    I: IntoIterator<Item = &'a String>,
{
    let errors: FieldErrors = fields
        .into_iter()
        .filter_map(|field| {
            let value = values.get(field).map(String::as_str).unwrap_or("");
            validator
                .validate(field, value)
                .err()
                .map(|msg| (field.clone(), msg))
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let mut values = FieldValues::new();
        values.insert("a".into(), "x".into());
        values.insert("b".into(), "  ".into());
        let fields = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let errors = validate_fields(&RequiredFields, &values, &fields).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("b"));
        assert!(errors.contains_key("c"));
    }

    #[test]
    fn test_closure_validator() {
        let four_digits = |field: &str, value: &str| {
            if field == "ssnLast4" && (value.len() != 4 || !value.chars().all(|c| c.is_ascii_digit())) {
                Err("Enter the last 4 digits".to_string())
            } else {
                Ok(())
            }
        };
        let mut values = FieldValues::new();
        values.insert("ssnLast4".into(), "12a4".into());
        let fields = vec!["ssnLast4".to_string()];
        assert!(validate_fields(&four_digits, &values, &fields).is_err());

        values.insert("ssnLast4".into(), "1234".into());
        assert!(validate_fields(&four_digits, &values, &fields).is_ok());
    }
}
