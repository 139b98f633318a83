use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::{
    error::AppError,
    state::AppState,
    users::{
        dto::{CreatedResponse, DirectoryQuery, NewUser, UserView},
        query::{ColumnSpec, QueryState, COLUMNS},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users).post(create_user).options(preflight),
        )
        .route("/users/columns", get(list_columns))
}

/// Column table the directory view is built from.
pub async fn list_columns() -> Json<&'static [ColumnSpec]> {
    Json(&COLUMNS[..])
}

#[instrument(skip(state, query))]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<DirectoryQuery>, QueryRejection>,
) -> Result<Json<Vec<UserView>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let query = QueryState::try_from(query)?;
    let users = services::list_users(&state, OffsetDateTime::now_utc(), &query);
    debug!(returned = users.len(), "listed users");
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let Json(payload) = payload
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e.body_text())))?;
    services::add_user(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "User added successfully".into(),
        }),
    ))
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
