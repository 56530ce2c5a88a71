//! Input normalization and validation.
//!
//! Each function takes raw user input, trims it, and either returns the
//! normalized value or a [`RsvpError::Validation`] naming the field.

use crate::error::{Result, RsvpError};

/// Minimum guest name length, in characters.
pub const GUEST_NAME_MIN: usize = 2;
/// Maximum guest name length, in characters.
pub const GUEST_NAME_MAX: usize = 100;
/// Accepted phone length range, in characters.
pub const PHONE_LEN: std::ops::RangeInclusive<usize> = 6..=20;

/// Validate email address format.
///
/// Basic RFC 5322 validation:
/// - Must contain exactly one `@`
/// - Must have non-empty local and domain parts
/// - Domain needs at least one dot and no empty labels
/// - Length must be between 3 and 255 characters
///
/// # Examples
///
/// ```
/// use rsvp_core::validation::is_valid_email;
///
/// assert!(is_valid_email("ana@x.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@localhost"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local_chars =
        |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local_chars)
        && domain.chars().all(valid_domain_chars)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Slugs are lowercase ASCII letters, digits and hyphens, at least 3 long.
///
/// ```
/// use rsvp_core::validation::is_valid_slug;
///
/// assert!(is_valid_slug("acme-events"));
/// assert!(!is_valid_slug("Acme"));
/// assert!(!is_valid_slug("ab"));
/// ```
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() >= 3
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Trimmed guest name.
///
/// # Errors
///
/// Fails if the trimmed name is shorter than 2 or longer than 100 characters.
pub fn guest_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < GUEST_NAME_MIN {
        return Err(RsvpError::validation(
            "guestName",
            format!("must be at least {GUEST_NAME_MIN} characters"),
        ));
    }
    if len > GUEST_NAME_MAX {
        return Err(RsvpError::validation(
            "guestName",
            format!("must be at most {GUEST_NAME_MAX} characters"),
        ));
    }
    Ok(name.to_string())
}

/// Trimmed, lowercased email.
///
/// # Errors
///
/// Fails if the address is not syntactically valid.
pub fn email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(RsvpError::validation("guestEmail", "invalid email format"))
    }
}

/// Trimmed phone number.
///
/// # Errors
///
/// Fails unless the number is 6 to 20 characters of digits, spaces and `+-()`.
pub fn phone(raw: &str) -> Result<String> {
    let phone = raw.trim();
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    if !PHONE_LEN.contains(&phone.chars().count()) || !phone.chars().all(allowed) {
        return Err(RsvpError::validation("guestPhone", "invalid phone number"));
    }
    if !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(RsvpError::validation("guestPhone", "invalid phone number"));
    }
    Ok(phone.to_string())
}

/// Trimmed text with at least `min` characters.
///
/// # Errors
///
/// Fails if the trimmed value is shorter than `min`.
pub fn min_chars(field: &str, raw: &str, min: usize) -> Result<String> {
    let value = raw.trim();
    if value.chars().count() < min {
        let message = if min <= 1 {
            "is required".to_string()
        } else {
            format!("must be at least {min} characters")
        };
        return Err(RsvpError::validation(field, message));
    }
    Ok(value.to_string())
}

/// Text no longer than `max` characters.
///
/// # Errors
///
/// Fails if the value is longer than `max`.
pub fn max_chars(field: &str, raw: &str, max: usize) -> Result<String> {
    if raw.chars().count() > max {
        return Err(RsvpError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(raw.to_string())
}

/// An absolute `http` or `https` URL.
///
/// # Errors
///
/// Fails for other schemes or an empty host.
pub fn http_url(field: &str, raw: &str) -> Result<String> {
    let url = raw.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') && !rest.contains(' ') => {
            Ok(url.to_string())
        }
        _ => Err(RsvpError::validation(field, "must be an http(s) URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_name_is_trimmed() {
        assert_eq!(guest_name("  Ana  ").ok().as_deref(), Some("Ana"));
        assert!(guest_name(" A ").is_err());
        assert!(guest_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_email_is_lowercased() {
        assert_eq!(email(" Ana@X.com ").ok().as_deref(), Some("ana@x.com"));
        assert!(email("ana@").is_err());
        assert!(email("ana@@x.com").is_err());
        assert!(email("ana x@x.com").is_err());
    }

    #[test]
    fn test_phone_formats() {
        assert!(phone("+62 (21) 555-0100").is_ok());
        assert!(phone("12345").is_err());
        assert!(phone("call me maybe").is_err());
        assert!(phone("(((  )))").is_err());
    }

    #[test]
    fn test_http_url() {
        assert!(http_url("logoUrl", "https://cdn.example.com/logo.png").is_ok());
        assert!(http_url("logoUrl", "ftp://cdn.example.com/logo.png").is_err());
        assert!(http_url("logoUrl", "https://").is_err());
    }

    #[test]
    fn test_errors_name_the_field() {
        let err = min_chars("title", "Hey", 5);
        assert!(matches!(err, Err(RsvpError::Validation { ref field, .. }) if field == "title"));
    }
}
