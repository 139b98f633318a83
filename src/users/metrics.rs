//! Time-derived account metrics.
//!
//! Nothing here is persisted: every read recomputes the day counts from the
//! stored calendar dates and the clock value handed in by the caller.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::warn;

use crate::users::dto::UserView;
use crate::users::repo_types::UserRecord;
use crate::users::snapshot::Snapshot;

/// Value reported when a metric cannot be computed.
pub const MISSING_DAYS: i64 = -1;

const SECONDS_PER_DAY: i64 = 86_400;

/// `"Jan 1 2023"`: short month, unpadded day, four digit year.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none] [year]");

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("date is empty")]
    Missing,
    #[error("malformed date: {0}")]
    Malformed(#[from] time::error::Parse),
}

pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s, DATE_FORMAT)
}

pub fn format_date(date: Date) -> String {
    let month = date.month().to_string();
    format!("{} {} {}", &month[..3], date.day(), date.year())
}

/// Whole days elapsed between `date` (taken as 00:00 UTC) and `now`, floored.
/// Dates in the future give negative values.
pub fn days_since(now: OffsetDateTime, date: &str) -> Result<i64, DateError> {
    if date.is_empty() {
        return Err(DateError::Missing);
    }
    let start = parse_date(date)?.midnight().assume_utc();
    Ok((now - start).whole_seconds().div_euclid(SECONDS_PER_DAY))
}

/// `(days, ok)`; `(-1, false)` for empty or malformed input.
pub fn derive(now: OffsetDateTime, date: &str) -> (i64, bool) {
    match days_since(now, date) {
        Ok(days) => (days, true),
        Err(_) => (MISSING_DAYS, false),
    }
}

fn metric_for(now: OffsetDateTime, user: &UserRecord, field: &'static str, date: &str) -> i64 {
    let (days, ok) = derive(now, date);
    if !ok && !date.is_empty() {
        warn!(user = %user.human_user, field, value = %date, "cannot derive metric from malformed date");
    }
    days
}

pub fn view_of(now: OffsetDateTime, user: &UserRecord) -> UserView {
    UserView {
        human_user: user.human_user.clone(),
        create_date: user.create_date.clone(),
        password_changed_date: user.password_changed_date.clone(),
        days_since_last_password_change: metric_for(
            now,
            user,
            "passwordChangedDate",
            &user.password_changed_date,
        ),
        last_access_date: user.last_access_date.clone(),
        days_since_last_access: metric_for(now, user, "lastAccessDate", &user.last_access_date),
        mfa_enabled: user.mfa_enabled,
    }
}

/// Snapshot plus freshly derived metrics, in snapshot order.
pub fn materialize(now: OffsetDateTime, snapshot: &Snapshot) -> Vec<UserView> {
    snapshot.users().iter().map(|u| view_of(now, u)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::MfaStatus;
    use time::macros::{date, datetime};
    use time::Duration;

    #[test]
    fn ten_days_ago_is_ten() {
        let now = datetime!(2025-03-15 13:45 UTC);
        let ten_days_ago = format_date(now.date() - Duration::days(10));
        assert_eq!(derive(now, &ten_days_ago), (10, true));
    }

    #[test]
    fn empty_date_is_sentinel() {
        let now = datetime!(2025-03-15 00:00 UTC);
        assert_eq!(derive(now, ""), (MISSING_DAYS, false));
        assert!(matches!(days_since(now, ""), Err(DateError::Missing)));
    }

    #[test]
    fn malformed_dates_are_sentinel() {
        let now = datetime!(2025-03-15 00:00 UTC);
        for bad in ["2025-03-01", "March 1 2025", "Mar 32 2025", "mar 1 2025", "Mar 1 2025 ", "garbage"] {
            assert_eq!(derive(now, bad), (MISSING_DAYS, false), "{bad}");
        }
    }

    #[test]
    fn future_dates_are_negative_and_floored() {
        let now = datetime!(2025-03-15 12:00 UTC);
        assert_eq!(derive(now, "Mar 16 2025"), (-1, true));
        assert_eq!(derive(now, "Mar 20 2025"), (-5, true));
        assert_eq!(derive(now, "Mar 15 2025"), (0, true));
    }

    #[test]
    fn canonical_format_round_trips() {
        assert_eq!(format_date(date!(2023 - 01 - 01)), "Jan 1 2023");
        assert_eq!(format_date(date!(2021 - 10 - 21)), "Oct 21 2021");
        assert_eq!(parse_date("Sep 22 2019").unwrap(), date!(2019 - 09 - 22));
    }

    #[test]
    fn view_keeps_record_and_reports_bad_fields_only() {
        let now = datetime!(2025-02-12 08:00 UTC);
        let user = UserRecord {
            human_user: "Foo2 Bar2".into(),
            create_date: "Feb 3 2022".into(),
            password_changed_date: "not a date".into(),
            last_access_date: "Feb 2 2025".into(),
            mfa_enabled: MfaStatus::No,
        };
        let before = user.clone();
        let view = view_of(now, &user);
        assert_eq!(view.days_since_last_password_change, MISSING_DAYS);
        assert_eq!(view.days_since_last_access, 10);
        assert_eq!(view.password_changed_date, "not a date");
        assert_eq!(user, before);
    }

    #[test]
    fn view_metrics_agree_with_derive() {
        let now = datetime!(2025-02-12 08:00 UTC);
        for value in ["Feb 2 2025", "", "Feb 30 2025"] {
            let user = UserRecord {
                human_user: "u".into(),
                create_date: String::new(),
                password_changed_date: value.into(),
                last_access_date: value.into(),
                mfa_enabled: MfaStatus::Yes,
            };
            let view = view_of(now, &user);
            let (days, _) = derive(now, value);
            assert_eq!(view.days_since_last_password_change, days, "{value:?}");
            assert_eq!(view.days_since_last_access, days, "{value:?}");
        }
    }
}
