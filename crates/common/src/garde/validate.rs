//! Request validation on top of garde.

use crate::domain::{DomainError, DomainResult};
use garde::{Report, Validate};

/// Validate a request, folding every garde error into one ValidationError
pub fn validate_struct<T>(value: &T) -> DomainResult<()>
where
    T: Validate,
    T::Context: Default,
{
    value.validate().map_err(|report| DomainError::ValidationError(describe(&report)))
}

fn describe(report: &Report) -> String {
    let mut parts = Vec::new();
    for (path, error) in report.iter() {
        let path = path.to_string();
        if path.is_empty() {
            parts.push(error.message().to_string());
        } else {
            parts.push(format!("{}: {}", path, error.message()));
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use garde::Validate;

    #[derive(Validate)]
    struct NamedThing {
        #[garde(length(min = 1, max = 16))]
        name: String,
        #[garde(skip)]
        note: Option<String>,
    }

    #[test]
    fn test_valid_request_passes() {
        let thing = NamedThing {
            name: "sht4x".to_string(),
            note: None,
        };
        assert!(validate_struct(&thing).is_ok());
    }

    #[test]
    fn test_empty_name_is_reported_with_field_path() {
        let thing = NamedThing {
            name: String::new(),
            note: Some("ignored".to_string()),
        };
        match validate_struct(&thing) {
            Err(DomainError::ValidationError(msg)) => assert!(msg.starts_with("name")),
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }
}
