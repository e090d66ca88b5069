//! API handlers and shared validation helpers.
//!
//! Malformed input is rejected here, before anything reaches the auth core.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;

use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Usernames are 4-32 characters.
pub fn valid_username(username: &str) -> bool {
    let length = username.chars().count();
    (4..=32).contains(&length)
}

/// Passwords need at least 6 characters with one uppercase letter, one
/// digit, and one special character.
pub fn valid_password(password: &str) -> bool {
    if password.chars().count() < 6 {
        return false;
    }
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special =
        Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#).is_ok_and(|regex| regex.is_match(password));
    has_uppercase && has_digit && has_special
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, valid_email, valid_password, valid_username};

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_username_enforces_length() {
        assert!(valid_username("alice"));
        assert!(!valid_username("abc"));
        assert!(!valid_username(&"a".repeat(33)));
    }

    #[test]
    fn valid_password_requires_all_classes() {
        assert!(valid_password("Str0ng!pw"));
        assert!(!valid_password("short"));
        assert!(!valid_password("alllowercase1!"));
        assert!(!valid_password("NoDigits!"));
        assert!(!valid_password("NoSpecial1"));
    }
}
