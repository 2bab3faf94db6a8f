use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub(crate) mod extractors;
mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub mod repo_types;
mod reset;
pub mod roles;
mod services;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
