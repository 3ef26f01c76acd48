// crm-gate-core/src/core/time.rs
// ============================================================================
// Module: CRM Gate Time
// Description: Wall-clock timestamps for records and audit entries.
// Purpose: Keep a single RFC 3339 representation across backends.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! [`Timestamp`] wraps an RFC 3339 UTC string with a fixed nine-digit
//! fraction. Every value has the same width, so lexicographic ordering of
//! the string matches chronological ordering.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Fixed-width RFC 3339 layout; the fraction never drops trailing zeros.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

/// Value used when the formatter rejects a datetime.
const EPOCH: &str = "1970-01-01T00:00:00.000000000Z";

/// RFC 3339 UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Returns the current UTC time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    /// Wraps an already formatted RFC 3339 string (for example, one read back
    /// from storage).
    #[must_use]
    pub fn from_rfc3339(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the timestamp as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Formats a datetime in UTC, falling back to the unix epoch when the
    /// formatter rejects the value (years outside `0000..=9999`).
    #[must_use]
    pub fn from_datetime(value: OffsetDateTime) -> Self {
        let formatted = value
            .to_offset(UtcOffset::UTC)
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| EPOCH.to_string());
        Self(formatted)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
