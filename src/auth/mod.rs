use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod pages;
pub mod password;
pub mod session;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::token_routes())
        .merge(pages::session_routes())
}
