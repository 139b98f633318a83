use serde::{Deserialize, Serialize};

use crate::users::query::{Column, SortDirection};
use crate::users::repo_types::MfaStatus;

/// A user as returned to clients, with derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub human_user: String,
    pub create_date: String,
    pub password_changed_date: String,
    pub days_since_last_password_change: i64,
    pub last_access_date: String,
    pub days_since_last_access: i64,
    pub mfa_enabled: MfaStatus,
}

/// Request body for adding a user. Missing fields read as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub human_user: String,
    pub create_date: String,
    pub password_changed_date: String,
    pub last_access_date: String,
    pub mfa_enabled: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
}

/// Query string of `GET /api/users`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryQuery {
    pub search: Option<String>,
    pub date_field: Option<Column>,
    /// `YYYY-MM-DD`
    pub from: Option<String>,
    /// `YYYY-MM-DD`
    pub to: Option<String>,
    pub mfa: Option<String>,
    pub sort: Option<Column>,
    pub direction: Option<SortDirection>,
}
