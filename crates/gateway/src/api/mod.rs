pub mod health;
pub mod turn;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router. Two routes: the health check and the turn
/// endpoint the chat UI talks to.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::health))
        .route("/v1/turn", post(turn::turn))
}
