//! `/api/messages` route handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::message::{Message, MessageStore};

use super::errors::{ApiError, ApiResult};

/// Shared handler state: the one store handle.
pub struct AppState {
    pub store: MessageStore,
}

/// Build the message API router.
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/messages", get(list_messages).post(create_message))
        .route(
            "/messages/:id",
            get(get_message).delete(delete_message),
        )
        .with_state(state)
}

/// POST body for message creation.
#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub message: String,
}

fn parse_id(raw: &str) -> ApiResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::InvalidId(raw.to_string()))
}

async fn list_messages(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Message>>> {
    let messages = state.store.list()?;
    Ok(Json(messages))
}

async fn get_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id)?;
    let message = state.store.get(id)?;
    Ok(Json(message))
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    if body.message.is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let message = state.store.create(&body.message)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    state.store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
