use chrono::NaiveDate;
use thiserror::Error;

/// Rejection of an entry before it reaches the document. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{field}' is required")]
    Required { field: &'static str },

    #[error("'{field}' must be an absolute http(s) URL")]
    InvalidUrl { field: &'static str },

    #[error("'{field}' is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("end date must not be before start date")]
    DateOrder,

    #[error("tab '{0}' does not exist or cannot hold custom fields")]
    UnknownTab(String),
}

/// Fails on empty or whitespace-only input.
pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Checks each `(field, value)` pair in order and reports the first blank one.
pub fn require_all(fields: &[(&'static str, &str)]) -> Result<(), ValidationError> {
    fields
        .iter()
        .try_for_each(|(field, value)| require_non_blank(field, value))
}

pub fn is_absolute_http_url(raw: &str) -> bool {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

pub fn require_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_blank(field, value)?;
    if !is_absolute_http_url(value) {
        return Err(ValidationError::InvalidUrl { field });
    }
    Ok(())
}

/// Blank optional URLs are fine; anything else must be a valid URL.
pub fn optional_url(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => require_url(field, v),
        _ => Ok(()),
    }
}

pub fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::DateOrder);
        }
    }
    Ok(())
}
