//! Input checks shared by the services
//!
//! Failures name the offending field so the API can answer with the
//! `{"errors": {field: [message]}}` body.

/// A rejected input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalid {
    pub field: &'static str,
    pub message: &'static str,
}

pub const BLANK: &str = "can't be blank";
pub const MALFORMED: &str = "is invalid";
pub const TAKEN: &str = "has already been taken";

/// Reject empty or whitespace-only values
pub fn require(field: &'static str, value: &str) -> Result<(), Invalid> {
    if value.trim().is_empty() {
        Err(Invalid { field, message: BLANK })
    } else {
        Ok(())
    }
}

/// Minimal email shape check: one `@`, something on both sides, a dot in
/// the domain and no whitespace.
pub fn email(value: &str) -> Result<(), Invalid> {
    require("email", value)?;

    let malformed = Err(Invalid { field: "email", message: MALFORMED });
    if value.chars().any(char::is_whitespace) {
        return malformed;
    }
    match value.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => malformed,
    }
}
