use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of `users_table` as stored. Every column but the key is nullable.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub human_user: String,
    pub create_date: Option<String>,
    pub password_changed_date: Option<String>,
    pub last_access_date: Option<String>,
    pub mfa_enabled: Option<bool>,
}

/// MFA state as surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MfaStatus {
    Yes,
    No,
}

impl MfaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MfaStatus::Yes => "Yes",
            MfaStatus::No => "No",
        }
    }

    pub fn as_bool(self) -> bool {
        self == MfaStatus::Yes
    }

    /// Case-insensitive match on `yes` / `no`.
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Some(MfaStatus::Yes),
            "no" => Some(MfaStatus::No),
            _ => None,
        }
    }
}

impl From<Option<bool>> for MfaStatus {
    fn from(v: Option<bool>) -> Self {
        match v {
            Some(true) => MfaStatus::Yes,
            _ => MfaStatus::No,
        }
    }
}

/// A user as held in a published snapshot. Absent dates are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub human_user: String,
    pub create_date: String,
    pub password_changed_date: String,
    pub last_access_date: String,
    pub mfa_enabled: MfaStatus,
}

impl From<UserRow> for UserRecord {
    fn from(r: UserRow) -> Self {
        Self {
            human_user: r.human_user,
            create_date: r.create_date.unwrap_or_default(),
            password_changed_date: r.password_changed_date.unwrap_or_default(),
            last_access_date: r.last_access_date.unwrap_or_default(),
            mfa_enabled: r.mfa_enabled.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_columns_become_empty_and_no() {
        let rec = UserRecord::from(UserRow {
            human_user: "Foo Bar1".into(),
            create_date: None,
            password_changed_date: Some("Oct 1 2021".into()),
            last_access_date: None,
            mfa_enabled: None,
        });
        assert_eq!(rec.create_date, "");
        assert_eq!(rec.password_changed_date, "Oct 1 2021");
        assert_eq!(rec.mfa_enabled, MfaStatus::No);
    }

    #[test]
    fn mfa_parse_is_case_insensitive() {
        assert_eq!(MfaStatus::parse_loose("YES"), Some(MfaStatus::Yes));
        assert_eq!(MfaStatus::parse_loose("no"), Some(MfaStatus::No));
        assert_eq!(MfaStatus::parse_loose("maybe"), None);
        assert_eq!(MfaStatus::parse_loose(""), None);
    }

    #[test]
    fn mfa_serializes_as_yes_no() {
        assert_eq!(serde_json::to_string(&MfaStatus::Yes).unwrap(), "\"Yes\"");
        assert_eq!(serde_json::to_string(&MfaStatus::No).unwrap(), "\"No\"");
    }
}
