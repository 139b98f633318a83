//! Search, filter and sort over the materialized directory.
//!
//! [`apply`] runs the stages in a fixed order: free-text search, date range,
//! MFA filter, then sort. It never touches its input; every call returns a
//! fresh list, so callers simply re-run it whenever a parameter changes.

use std::cmp::Ordering;
use std::str::FromStr;

use feruca::{Collator, Locale, Tailoring};
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::{format_description, time};
use time::{Date, PrimitiveDateTime, Time};

use crate::error::AppError;
use crate::users::dto::{DirectoryQuery, UserView};
use crate::users::metrics::parse_date;
use crate::users::repo_types::MfaStatus;

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const END_OF_DAY: Time = time!(23:59:59.999);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    HumanUser,
    CreateDate,
    PasswordChangedDate,
    DaysSinceLastPasswordChange,
    LastAccessDate,
    DaysSinceLastAccess,
    MfaEnabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Numeric,
    Date,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSpec {
    #[serde(skip)]
    pub column: Column,
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub searchable: bool,
}

/// Display columns, in `Column` declaration order.
pub static COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec {
        column: Column::HumanUser,
        key: "humanUser",
        label: "Human User",
        kind: ColumnKind::Text,
        searchable: true,
    },
    ColumnSpec {
        column: Column::CreateDate,
        key: "createDate",
        label: "Create Date",
        kind: ColumnKind::Date,
        searchable: true,
    },
    ColumnSpec {
        column: Column::PasswordChangedDate,
        key: "passwordChangedDate",
        label: "Password Changed Date",
        kind: ColumnKind::Date,
        searchable: true,
    },
    ColumnSpec {
        column: Column::DaysSinceLastPasswordChange,
        key: "daysSinceLastPasswordChange",
        label: "Days since Last Password Change",
        kind: ColumnKind::Numeric,
        searchable: true,
    },
    ColumnSpec {
        column: Column::LastAccessDate,
        key: "lastAccessDate",
        label: "Last Access Date",
        kind: ColumnKind::Date,
        searchable: true,
    },
    ColumnSpec {
        column: Column::DaysSinceLastAccess,
        key: "daysSinceLastAccess",
        label: "Days since Last Access",
        kind: ColumnKind::Numeric,
        searchable: true,
    },
    ColumnSpec {
        column: Column::MfaEnabled,
        key: "mfaEnabled",
        label: "MFA Enabled",
        kind: ColumnKind::Text,
        searchable: true,
    },
];

enum Cell<'a> {
    Text(&'a str),
    Number(i64),
}

impl Cell<'_> {
    fn to_search_text(&self) -> String {
        match self {
            Cell::Text(s) => s.to_lowercase(),
            Cell::Number(n) => n.to_string(),
        }
    }

    fn as_text(&self) -> &str {
        match self {
            Cell::Text(s) => s,
            Cell::Number(_) => "",
        }
    }

    fn as_number(&self) -> i64 {
        match self {
            Cell::Number(n) => *n,
            Cell::Text(_) => 0,
        }
    }
}

impl Column {
    pub fn spec(self) -> &'static ColumnSpec {
        &COLUMNS[self as usize]
    }

    pub fn kind(self) -> ColumnKind {
        self.spec().kind
    }

    fn cell(self, u: &UserView) -> Cell<'_> {
        match self {
            Column::HumanUser => Cell::Text(&u.human_user),
            Column::CreateDate => Cell::Text(&u.create_date),
            Column::PasswordChangedDate => Cell::Text(&u.password_changed_date),
            Column::DaysSinceLastPasswordChange => Cell::Number(u.days_since_last_password_change),
            Column::LastAccessDate => Cell::Text(&u.last_access_date),
            Column::DaysSinceLastAccess => Cell::Number(u.days_since_last_access),
            Column::MfaEnabled => Cell::Text(u.mfa_enabled.as_str()),
        }
    }
}

/// Inclusive calendar-day range over one date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub column: Column,
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, u: &UserView) -> bool {
        if !self.is_active() {
            return true;
        }
        let Ok(date) = parse_date(self.column.cell(u).as_text()) else {
            return false;
        };
        let at = date.midnight();
        if let Some(start) = self.start {
            if at < start.midnight() {
                return false;
            }
        }
        if let Some(end) = self.end {
            if at > PrimitiveDateTime::new(end, END_OF_DAY) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MfaFilter {
    #[default]
    All,
    Only(MfaStatus),
}

impl MfaFilter {
    pub fn matches(self, status: MfaStatus) -> bool {
        match self {
            MfaFilter::All => true,
            MfaFilter::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for MfaFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(MfaFilter::All),
            "Yes" => Ok(MfaFilter::Only(MfaStatus::Yes)),
            "No" => Ok(MfaFilter::Only(MfaStatus::No)),
            other => Err(AppError::Validation(format!(
                "mfa must be 'all', 'Yes' or 'No', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn orient(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Column,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(Column::HumanUser)
    }
}

impl SortState {
    pub fn new(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    /// Clicking the active column flips direction; any other column starts
    /// ascending.
    pub fn select(self, column: Column) -> Self {
        if column == self.column {
            Self {
                column,
                direction: self.direction.flipped(),
            }
        } else {
            Self::new(column)
        }
    }

    /// `collator` is only consulted for text columns.
    pub fn compare(&self, a: &UserView, b: &UserView, collator: &mut Collator) -> Ordering {
        let (ca, cb) = (self.column.cell(a), self.column.cell(b));
        match self.column.kind() {
            ColumnKind::Numeric => self.direction.orient(ca.as_number().cmp(&cb.as_number())),
            ColumnKind::Date => {
                match (parse_date(ca.as_text()).ok(), parse_date(cb.as_text()).ok()) {
                    (None, None) => Ordering::Equal,
                    // unparseable dates go last in either direction
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(x), Some(y)) => self.direction.orient(x.cmp(&y)),
                }
            }
            ColumnKind::Text => {
                self.direction.orient(collator.collate(ca.as_text(), cb.as_text()))
            }
        }
    }
}

/// Unicode collation (CLDR root order) with punctuation kept significant, so
/// `_x` < `1x` < `x`, `Émile` < `Fred`, and `a` < `A` on otherwise equal text.
pub fn text_collator() -> Collator {
    Collator::new(Tailoring::Cldr(Locale::Root), false, true)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub search: String,
    pub date_range: Option<DateRange>,
    pub mfa: MfaFilter,
    pub sort: Option<SortState>,
}

fn matches_search(u: &UserView, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    COLUMNS
        .iter()
        .filter(|c| c.searchable)
        .any(|c| c.column.cell(u).to_search_text().contains(needle))
}

/// Runs search, date range, MFA filter and sort over `rows`.
pub fn apply(rows: &[UserView], q: &QueryState) -> Vec<UserView> {
    let needle = q.search.to_lowercase();
    let mut out: Vec<UserView> = rows
        .iter()
        .filter(|u| matches_search(u, &needle))
        .filter(|u| q.date_range.map_or(true, |r| r.contains(u)))
        .filter(|u| q.mfa.matches(u.mfa_enabled))
        .cloned()
        .collect();
    if let Some(sort) = q.sort {
        let mut collator = text_collator();
        // stable: ties keep their input order
        out.sort_by(|a, b| sort.compare(a, b, &mut collator));
    }
    out
}

fn parse_bound(name: &str, value: Option<String>) -> Result<Option<Date>, AppError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Date::parse(s, ISO_DATE).map(Some).map_err(|e| {
            AppError::Validation(format!("{} must be a YYYY-MM-DD date: {}", name, e))
        }),
    }
}

impl TryFrom<DirectoryQuery> for QueryState {
    type Error = AppError;

    fn try_from(q: DirectoryQuery) -> Result<Self, Self::Error> {
        let column = q.date_field.unwrap_or(Column::LastAccessDate);
        if column.kind() != ColumnKind::Date {
            return Err(AppError::Validation(format!(
                "dateField must be a date column, got '{}'",
                column.spec().key
            )));
        }
        let range = DateRange {
            column,
            start: parse_bound("from", q.from)?,
            end: parse_bound("to", q.to)?,
        };

        Ok(QueryState {
            search: q.search.unwrap_or_default(),
            date_range: range.is_active().then_some(range),
            mfa: q.mfa.as_deref().unwrap_or("all").parse()?,
            sort: q.sort.map(|column| SortState {
                column,
                direction: q.direction.unwrap_or_default(),
            }),
        })
    }
}
