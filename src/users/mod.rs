use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod metrics;
pub mod query;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod snapshot;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
