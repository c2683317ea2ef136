// Validation utilities for string fields

/// Trim a string field, rejecting empty values when required
pub fn trim_and_validate_field(field: &str, required: bool) -> Result<String, String> {
    let trimmed = field.trim().to_string();
    if trimmed.is_empty() {
        if required {
            Err("Field cannot be empty".to_string())
        } else {
            Ok(trimmed)
        }
    } else {
        Ok(trimmed)
    }
}

/// Trim an optional field, mapping whitespace-only values to None
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field() {
        assert_eq!(
            trim_and_validate_field("  Marta  ", true),
            Ok("Marta".to_string())
        );
        assert!(trim_and_validate_field("   ", true).is_err());
    }

    #[test]
    fn test_optional_field() {
        assert_eq!(
            trim_optional_field(Some(&" Berlin ".to_string())),
            Some("Berlin".to_string())
        );
        assert_eq!(trim_optional_field(Some(&"   ".to_string())), None);
        assert_eq!(trim_optional_field(None), None);
    }
}
