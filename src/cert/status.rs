//! Time-based certificate validity classification.

use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

/// Certificates within this many days of expiry are reported as
/// [`CertificateStatus::ExpiringSoon`].
pub const EXPIRING_SOON_THRESHOLD_DAYS: i64 = 30;

const MILLIS_PER_DAY: i128 = 86_400_000;

/// Validity status of a certificate relative to a reference time.
///
/// There is no distinct not-yet-valid state: a certificate whose window has
/// not opened yet (`now < valid_from`) is reported as
/// [`CertificateStatus::Expired`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateStatus {
    /// Within the validity window with more than 30 days remaining.
    Valid,
    /// Within the validity window with 30 days or fewer remaining.
    ExpiringSoon,
    /// Outside the validity window.
    Expired,
}

impl Display for CertificateStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            CertificateStatus::Valid => "valid",
            CertificateStatus::ExpiringSoon => "expiring-soon",
            CertificateStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Result of classifying a certificate's validity window against a reference time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityStatus {
    /// `true` when `now` falls within `[valid_from, valid_until]`, bounds included.
    pub is_valid: bool,
    /// Derived status.
    pub status: CertificateStatus,
    /// Whole days until expiry, `None` when outside the validity window.
    pub days_remaining: Option<i64>,
}

/// Classifies a validity window against an explicit reference time.
///
/// The reference time is a parameter rather than an implicit wall-clock read
/// so the computation is deterministic and testable.
///
/// # Examples
///
/// ```
/// use spiffe_bundle_explorer::{classify_validity, CertificateStatus};
/// use time::{Duration, OffsetDateTime};
///
/// let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
/// let status = classify_validity(now - Duration::days(1), now + Duration::days(90), now);
///
/// assert_eq!(status.status, CertificateStatus::Valid);
/// assert_eq!(status.days_remaining, Some(90));
/// ```
pub fn classify_validity(
    valid_from: OffsetDateTime,
    valid_until: OffsetDateTime,
    now: OffsetDateTime,
) -> ValidityStatus {
    let is_valid = now >= valid_from && now <= valid_until;

    if !is_valid {
        return ValidityStatus {
            is_valid,
            status: CertificateStatus::Expired,
            days_remaining: None,
        };
    }

    let ms_remaining = (valid_until - now).whole_milliseconds();
    let days_remaining = (ms_remaining / MILLIS_PER_DAY) as i64;

    let status = if days_remaining > EXPIRING_SOON_THRESHOLD_DAYS {
        CertificateStatus::Valid
    } else {
        CertificateStatus::ExpiringSoon
    };

    ValidityStatus {
        is_valid,
        status,
        days_remaining: Some(days_remaining),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_756_000_000).unwrap()
    }

    fn window(days_until_expiry: i64) -> (OffsetDateTime, OffsetDateTime) {
        (
            now() - Duration::days(10),
            now() + Duration::days(days_until_expiry),
        )
    }

    #[test]
    fn test_valid_with_more_than_threshold_days() {
        let (from, until) = window(31);
        let status = classify_validity(from, until, now());

        assert!(status.is_valid);
        assert_eq!(status.status, CertificateStatus::Valid);
        assert_eq!(status.days_remaining, Some(31));
    }

    #[test]
    fn test_expiring_soon_at_threshold() {
        let (from, until) = window(30);
        let status = classify_validity(from, until, now());

        assert!(status.is_valid);
        assert_eq!(status.status, CertificateStatus::ExpiringSoon);
        assert_eq!(status.days_remaining, Some(30));
    }

    #[test]
    fn test_expiring_soon_on_last_day() {
        // Still inside the window but with less than a whole day left.
        let from = now() - Duration::days(10);
        let until = now() + Duration::hours(12);
        let status = classify_validity(from, until, now());

        assert!(status.is_valid);
        assert_eq!(status.status, CertificateStatus::ExpiringSoon);
        assert_eq!(status.days_remaining, Some(0));
    }

    #[test]
    fn test_expiry_instant_is_still_valid() {
        // The bounds are inclusive: now == valid_until is within the window.
        let from = now() - Duration::days(10);
        let status = classify_validity(from, now(), now());

        assert!(status.is_valid);
        assert_eq!(status.status, CertificateStatus::ExpiringSoon);
        assert_eq!(status.days_remaining, Some(0));
    }

    #[test]
    fn test_expired() {
        let from = now() - Duration::days(100);
        let until = now() - Duration::seconds(1);
        let status = classify_validity(from, until, now());

        assert!(!status.is_valid);
        assert_eq!(status.status, CertificateStatus::Expired);
        assert_eq!(status.days_remaining, None);
    }

    #[test]
    fn test_not_yet_valid_reports_expired() {
        // Not-yet-valid is indistinguishable from expired in this model.
        let from = now() + Duration::days(1);
        let until = now() + Duration::days(100);
        let status = classify_validity(from, until, now());

        assert!(!status.is_valid);
        assert_eq!(status.status, CertificateStatus::Expired);
        assert_eq!(status.days_remaining, None);
    }

    #[test]
    fn test_days_remaining_floors_partial_days() {
        let from = now() - Duration::days(1);
        let until = now() + Duration::days(45) + Duration::hours(23);
        let status = classify_validity(from, until, now());

        assert_eq!(status.days_remaining, Some(45));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CertificateStatus::Valid.to_string(), "valid");
        assert_eq!(CertificateStatus::ExpiringSoon.to_string(), "expiring-soon");
        assert_eq!(CertificateStatus::Expired.to_string(), "expired");
    }
}
