use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use super::ApiError;
use crate::domain::weather::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 25;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

pub fn validate_page_request(page: Option<i64>, limit: Option<i64>) -> Result<PageRequest, ApiError> {
    let page = match page {
        None => DEFAULT_PAGE,
        Some(raw) => u64::try_from(raw)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ApiError::validation(format!("Invalid page: {raw}. Page must be at least 1")))?,
    };

    let limit = match limit {
        None => DEFAULT_PAGE_SIZE,
        Some(raw) => u64::try_from(raw)
            .ok()
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "Invalid limit: {raw}. Limit must be between 1 and {MAX_PAGE_SIZE}"
                ))
            })?,
    };

    Ok(PageRequest::new(page, limit))
}

pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let valid = EMAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(trimmed));
    if !valid {
        return Err(ApiError::validation(format!("Invalid email address: {trimmed}")));
    }

    Ok(trimmed)
}

/// 6 to 25 characters with at least one lowercase letter, one uppercase
/// letter, one digit and one character that is neither.
pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(ApiError::validation(
            "Password must contain at least one uppercase letter, one lowercase letter, one number and one special character",
        ));
    }

    Ok(password)
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a bare
/// date. A bare date is the start of that day, or its last nanosecond when
/// `end_of_day` is set.
pub fn parse_timestamp(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        if let Some(time) = time {
            return Ok(date.and_time(time).and_utc());
        }
    }

    Err(ApiError::validation(format!(
        "Invalid {field}: {raw}. Expected an ISO 8601 date or timestamp"
    )))
}

/// Rejects `min > max` for an optional pair of bounds.
pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    what: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), ApiError> {
    if let (Some(min), Some(max)) = (min, max)
        && min > max
    {
        return Err(ApiError::validation(format!(
            "Invalid {what} range: {min} is greater than {max}"
        )));
    }
    Ok(())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ApiError::validation(format!(
            "Invalid latitude: {latitude}. Latitude must be between -90 and 90"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::validation(format!(
            "Invalid longitude: {longitude}. Longitude must be between -180 and 180"
        )));
    }
    Ok(())
}

pub fn validate_finite(field: &str, value: f64) -> Result<f64, ApiError> {
    if !value.is_finite() {
        return Err(ApiError::validation(format!("{field} must be a finite number")));
    }
    Ok(value)
}
