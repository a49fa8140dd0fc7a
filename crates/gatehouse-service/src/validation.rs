//! Input validation shared by the entity services.

use gatehouse_core::error::{RbacError, RbacResult};

/// Trim a required text field, rejecting blanks.
pub(crate) fn required(field: &str, value: &str) -> RbacResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RbacError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// Like [`required`] for partial updates: `None` stays `None`.
pub(crate) fn optional(field: &str, value: Option<String>) -> RbacResult<Option<String>> {
    value.map(|v| required(field, &v)).transpose()
}

pub(crate) fn username_errors(username: &str, errors: &mut Vec<String>) {
    if username.trim().chars().count() < 3 {
        errors.push("Username must be at least 3 characters long".into());
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push("Username can only contain letters, numbers, and underscores".into());
    }
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub(crate) fn is_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub(crate) fn email_errors(email: &str, errors: &mut Vec<String>) {
    if !is_email(email) {
        errors.push("Please provide a valid email address".into());
    }
}

pub(crate) fn password_errors(password: &str, min_length: usize, errors: &mut Vec<String>) {
    if password.chars().count() < min_length {
        errors.push(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        errors.push("Password must contain at least one letter and one number".into());
    }
}

/// Collapse collected messages into a single `Validation` error.
pub(crate) fn finish(errors: Vec<String>) -> RbacResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(RbacError::validation(errors.join(". ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Ops ").unwrap(), "Ops");
        assert!(required("name", "   ").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(is_email("alice@example.com"));
        assert!(!is_email("alice@example"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a@b@example.com"));
    }

    #[test]
    fn registration_errors_are_joined() {
        let mut errors = Vec::new();
        username_errors("a!", &mut errors);
        password_errors("abc", 6, &mut errors);
        assert_eq!(errors.len(), 4);
        let err = finish(errors).unwrap_err();
        assert!(err.to_string().contains("underscores. Password"));
    }
}
