//! Input checks run before any request leaves the client

use thiserror::Error;
use unity_core::{validation_error, UnityResult};

/// Longest name the array accepts for a resource
pub const MAX_RESOURCE_NAME_LENGTH: usize = 63;

const RETENTION_FORMAT: &str = "retention duration should be in format days:hours:minutes:seconds";
const RETENTION_RANGE: &str = "hours, minutes and seconds should be in between 0-60";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name empty error")]
    Empty,
    #[error("name too long error")]
    TooLong,
}

/// Trim a resource name and check it against the array's limits
pub fn validate_resource_name(name: &str) -> Result<&str, NameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().count() > MAX_RESOURCE_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    Ok(name)
}

/// Name check with the error wrapped for `kind` ("snapshot", "volume", ...)
pub(crate) fn checked_name<'a>(name: &'a str, kind: &str) -> UnityResult<&'a str> {
    validate_resource_name(name).map_err(|e| {
        validation_error!(
            format!("invalid {} name Error:{}", kind, e),
            "name",
            "validation"
        )
    })
}

/// Reject an empty identifier with `message`
pub(crate) fn require_id<'a>(id: &'a str, field: &str, message: &str) -> UnityResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(validation_error!(message, field, "validation"));
    }
    Ok(id)
}

/// Parse `days:hours:minutes:seconds` into seconds.
///
/// An empty string means no retention and yields `None`. Hours, minutes and
/// seconds must each lie in `0..=60`.
pub fn parse_retention_duration(duration: &str) -> UnityResult<Option<u64>> {
    let duration = duration.trim();
    if duration.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = duration.split(':').collect();
    if parts.len() != 4 {
        return Err(validation_error!(RETENTION_FORMAT, "retention", "validation"));
    }

    let mut values = [0u64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<u64>()
            .map_err(|_| validation_error!(RETENTION_FORMAT, "retention", "validation"))?;
    }

    let [days, hours, minutes, seconds] = values;
    if hours > 60 || minutes > 60 || seconds > 60 {
        return Err(validation_error!(RETENTION_RANGE, "retention", "validation"));
    }

    days.checked_mul(86_400)
        .and_then(|d| d.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .map(Some)
        .ok_or_else(|| validation_error!(RETENTION_FORMAT, "retention", "validation"))
}
