// ABOUTME: Field validation helpers shared by request handlers and storage layers
// ABOUTME: Produces errors that name the offending field

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(String),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

/// Trim a required text field, rejecting empty values and null bytes
pub fn require_non_empty(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required(field.to_string()));
    }

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    if trimmed.contains('\0') {
        return Err(ValidationError::Invalid {
            field: field.to_string(),
            message: "contains invalid null bytes".to_string(),
        });
    }

    Ok(trimmed.to_string())
}

/// Minimal structural email check: one `@` with text on both sides and a dot in the domain
pub fn validate_email(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim().to_lowercase();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !trimmed.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(trimmed)
    } else {
        Err(ValidationError::InvalidEmail(field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty_trims() {
        assert_eq!(require_non_empty("titulo", "  Hola  ", 50).unwrap(), "Hola");
    }

    #[test]
    fn test_require_non_empty_rejects_blank() {
        let err = require_non_empty("descripcion", "   ", 50).unwrap_err();
        assert_eq!(err, ValidationError::Required("descripcion".to_string()));
        assert_eq!(err.to_string(), "descripcion is required");
    }

    #[test]
    fn test_require_non_empty_rejects_long() {
        let err = require_non_empty("titulo", "abcdef", 5).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 5, .. }));
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email("email", " Ana@Cliente.CL ").unwrap(),
            "ana@cliente.cl"
        );
        assert!(validate_email("email", "ana@").is_err());
        assert!(validate_email("email", "ana.cliente.cl").is_err());
        assert!(validate_email("email", "a b@c.cl").is_err());
    }
}
