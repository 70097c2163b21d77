//! Invariant guards shared by payload and envelope constructors.
//!
//! Every guard returns `DomainError::InvalidPayload` naming the offending field,
//! so construction fails fast before anything is appended to a log.

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{DomainError, DomainResult};

/// Require `value` to lie within `[0, 1]`. NaN is rejected.
pub fn unit_interval(value: f64, field: &str) -> DomainResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DomainError::invalid_payload(format!(
            "{field} must be between 0 and 1 (got {value})"
        )))
    }
}

/// Require a counter to be at least 1.
pub fn positive(value: u32, field: &str) -> DomainResult<()> {
    if value >= 1 {
        Ok(())
    } else {
        Err(DomainError::invalid_payload(format!("{field} must be >= 1")))
    }
}

/// Require a finite, non-negative amount. NaN is rejected.
pub fn non_negative(value: f64, field: &str) -> DomainResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::invalid_payload(format!(
            "{field} must be >= 0 (got {value})"
        )))
    }
}

/// Require a non-blank string.
pub fn non_empty(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(DomainError::invalid_payload(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

/// Require an offset-carrying timestamp to be expressed in UTC.
pub fn utc(value: DateTime<FixedOffset>, field: &str) -> DomainResult<DateTime<Utc>> {
    if value.offset().local_minus_utc() != 0 {
        return Err(DomainError::invalid_payload(format!(
            "{field} must be in UTC (got offset {})",
            value.offset()
        )));
    }
    Ok(value.with_timezone(&Utc))
}

/// Parse an RFC 3339 timestamp, accepting only a zero offset.
pub fn parse_utc(raw: &str, field: &str) -> DomainResult<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
        DomainError::invalid_payload(format!("{field} is not an RFC 3339 timestamp: {e}"))
    })?;
    utc(parsed, field)
}
