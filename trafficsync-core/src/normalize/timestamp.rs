//! Conversion of feed-local evaluation timestamps into universal time.
//!
//! The source zone is always explicit. Resolving through the executing
//! process's zone produces results that depend on where the job runs.

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Zone the Bonn traffic feed documents its timestamps in.
pub const DEFAULT_SOURCE_ZONE: Tz = chrono_tz::Europe::Berlin;

/// Attribute carrying the evaluation timestamp in the Bonn feed.
pub const DEFAULT_TIMESTAMP_FIELD: &str = "auswertezeit";

/// Which attribute holds the local timestamp and which zone it is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampPolicy {
    /// Attribute name of the evaluation timestamp.
    pub field: String,
    /// Zone the feed's wall-clock times are expressed in.
    pub zone: Tz,
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        Self {
            field: DEFAULT_TIMESTAMP_FIELD.to_owned(),
            zone: DEFAULT_SOURCE_ZONE,
        }
    }
}

impl TimestampPolicy {
    /// Create a policy for `field` in the default zone.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Set the source zone.
    #[must_use]
    pub fn with_zone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    /// Resolve a wall-clock time in the source zone to a UTC instant.
    ///
    /// Ambiguous times (when clocks go back) resolve to the standard-time
    /// reading, which is the later instant. Times inside a spring-forward gap
    /// do not exist locally; they are read with the offset in force before
    /// the gap.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use trafficsync_core::TimestampPolicy;
    ///
    /// let policy = TimestampPolicy::default();
    /// let local = NaiveDate::from_ymd_opt(2019, 7, 1)
    ///     .and_then(|date| date.and_hms_opt(12, 0, 0))
    ///     .expect("valid date");
    /// let utc = policy.to_universal(local);
    /// assert_eq!(utc.to_rfc3339(), "2019-07-01T10:00:00+00:00");
    /// ```
    #[must_use]
    pub fn to_universal(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(resolved) => resolved.with_timezone(&Utc),
            LocalResult::Ambiguous(_, standard) => standard.with_timezone(&Utc),
            LocalResult::None => self.resolve_in_gap(local),
        }
    }

    fn resolve_in_gap(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let probe = local
            .checked_sub_signed(TimeDelta::days(1))
            .unwrap_or(local);
        let offset_secs = self.zone.offset_from_utc_datetime(&probe).fix().local_minus_utc();
        local
            .checked_sub_signed(TimeDelta::seconds(i64::from(offset_secs)))
            .unwrap_or(local)
            .and_utc()
    }
}
