//! Conversation HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/conversations                - Start a conversation
//! - POST /api/v1/conversations/{id}/messages  - Continue a conversation
//! - GET  /api/v1/conversations                - List conversations
//! - GET  /api/v1/conversations/{id}           - Describe one conversation

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use concierge_types::conversation::{ContinuedConversation, Conversation, StartedConversation};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Request body for starting or continuing a conversation.
#[derive(Debug, Default, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// A missing body counts as an empty message; the service decides what is blank.
fn message_from(body: Result<Json<MessageRequest>, JsonRejection>) -> Result<String, AppError> {
    let Json(request) = body?;
    Ok(request.message.unwrap_or_default())
}

/// POST /api/v1/conversations - Start a conversation and run its first turn.
pub async fn start_conversation(
    State(state): State<AppState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<StartedConversation>>), AppError> {
    let timer = RequestTimer::start();
    let message = message_from(body)?;
    tracing::debug!(request_id = timer.request_id(), "starting conversation");

    let started = state.chat_service.start_conversation(&message).await?;

    Ok((StatusCode::CREATED, Json(timer.finish(started))))
}

/// POST /api/v1/conversations/{id}/messages - Add a message and get the reply.
pub async fn continue_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ContinuedConversation>>, AppError> {
    let timer = RequestTimer::start();
    let message = message_from(body)?;
    tracing::debug!(request_id = timer.request_id(), conversation_id = %id, "continuing conversation");

    let continued = state
        .chat_service
        .continue_conversation(&id, &message)
        .await?;

    Ok(Json(timer.finish(continued)))
}

/// GET /api/v1/conversations - Conversations, most recently updated first.
pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Conversation>>>, AppError> {
    let timer = RequestTimer::start();
    let conversations = state.chat_service.list_conversations().await?;
    Ok(Json(timer.finish(conversations)))
}

/// GET /api/v1/conversations/{id} - One conversation with its messages.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let timer = RequestTimer::start();
    let conversation = state.chat_service.describe_conversation(&id).await?;
    Ok(Json(timer.finish(conversation)))
}
