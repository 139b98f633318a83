use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::users::dto::{NewUser, UserView};
use crate::users::metrics::materialize;
use crate::users::query::{apply, QueryState};
use crate::users::repo::StoreError;
use crate::users::repo_types::{MfaStatus, UserRecord};

/// Checks the required fields and builds the record to store.
pub fn validate(input: NewUser) -> Result<UserRecord, AppError> {
    if input.human_user.is_empty() {
        return Err(AppError::Validation("humanUser cannot be empty".into()));
    }
    let mfa_enabled = MfaStatus::parse_loose(&input.mfa_enabled)
        .ok_or_else(|| AppError::Validation("mfaEnabled must be 'Yes' or 'No'".into()))?;
    Ok(UserRecord {
        human_user: input.human_user,
        create_date: input.create_date,
        password_changed_date: input.password_changed_date,
        last_access_date: input.last_access_date,
        mfa_enabled,
    })
}

/// Validate, persist, then reload the directory.
///
/// A failed reload does not undo the insert: the user is stored but stays
/// invisible until a later refresh succeeds, and the caller gets
/// [`AppError::StaleDirectory`].
pub async fn add_user(state: &AppState, input: NewUser) -> Result<UserRecord, AppError> {
    let record = validate(input)?;

    if let Err(e) = state.store.insert(&record).await {
        match &e {
            StoreError::Conflict(_) => warn!(user = %record.human_user, "user already exists"),
            StoreError::Unavailable(_) => {
                error!(user = %record.human_user, error = %e, "insert user failed")
            }
        }
        return Err(e.into());
    }

    if let Err(e) = state.directory.refresh().await {
        error!(user = %record.human_user, error = %e, "user stored but directory refresh failed");
        return Err(AppError::StaleDirectory {
            user: record.human_user,
            reason: e.to_string(),
        });
    }

    info!(user = %record.human_user, "user added");
    Ok(record)
}

/// Current directory with metrics as of `now`, run through `query`.
pub fn list_users(state: &AppState, now: OffsetDateTime, query: &QueryState) -> Vec<UserView> {
    let snapshot = state.directory.current();
    let rows = materialize(now, &snapshot);
    apply(&rows, query)
}
