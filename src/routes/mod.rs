pub mod auth;
pub mod user;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub message: String,
}

pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        message: state.config.ping_message.clone(),
    })
}
