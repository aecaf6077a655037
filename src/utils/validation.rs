use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

pub const MAX_EMAIL_LEN: usize = 254;

/// Trims `value` and rejects it when empty or longer than `max_len` characters.
pub fn required_text(field: &str, value: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }

    Ok(trimmed.to_string())
}

/// Validates an address and lowercases its domain. Stored addresses and
/// uniqueness checks always see the normalised form.
pub fn email(value: &str) -> AppResult<String> {
    let trimmed = required_text("email", value, MAX_EMAIL_LEN)?;

    if !EMAIL_RE.is_match(&trimmed) {
        return Err(AppError::validation("email is not a valid email address"));
    }

    Ok(match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => trimmed,
    })
}
