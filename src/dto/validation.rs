//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_NAME_LEN: usize = 64;

/// Validates that a display name is not blank and fits on the countdown screen.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Ana")    // Ok
/// validate_display_name("   ")    // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must contain at least one visible character".into());
        return Err(err);
    }

    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        let mut err = ValidationError::new("name_length");
        err.message =
            Some(format!("Name must be at most {MAX_NAME_LEN} characters (got {len})").into());
        return Err(err);
    }

    Ok(())
}

/// Validates a registry reference: non-empty and free of whitespace.
pub fn validate_registry_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("registry_id_format");
        err.message = Some("Player id must be non-empty and contain no whitespace".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_accept_visible_text() {
        assert!(validate_display_name("Ana").is_ok());
        assert!(validate_display_name("  José María ").is_ok());
    }

    #[test]
    fn display_names_reject_blank_or_long() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(" \t").is_err());
        assert!(validate_display_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn registry_ids_reject_whitespace() {
        assert!(validate_registry_id("p-001").is_ok());
        assert!(validate_registry_id("").is_err());
        assert!(validate_registry_id("p 001").is_err());
    }
}
