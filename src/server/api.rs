use axum::{
    body::Bytes,
    extract::{ rejection::BytesRejection, State },
    response::{ IntoResponse, Response },
    Json,
};
use serde::Serialize;
use serde_json::Value;
use log::{ info, debug };

use super::error::{ ChatError, ContactError };
use super::AppState;
use crate::conversation::assemble;
use crate::mail::compose_notification;
use crate::models::{ validate_contact, ChatRequest };
use crate::relay::relay_response;

#[derive(Serialize)]
pub struct ContactAccepted {
    success: bool,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>
) -> Result<Response, ChatError> {
    let body = body.map_err(ChatError::UnreadableBody)?;
    let request: ChatRequest = serde_json::from_slice(&body).map_err(ChatError::InvalidBody)?;
    let messages = request.messages.unwrap_or_default();
    let conversation = assemble(&state.persona, &messages)?;

    let client = state.chat.as_ref().ok_or(ChatError::NotConfigured)?;
    debug!(
        "[Chat API] {} prior turns, forwarding to model {}",
        messages.len() - 1,
        client.model()
    );
    let upstream = client.stream_chat(&conversation).await?;

    Ok(relay_response(upstream))
}

pub async fn contact_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>
) -> Result<Json<ContactAccepted>, ContactError> {
    let body = body.map_err(ContactError::UnreadableBody)?;
    let payload: Value = serde_json::from_slice(&body).map_err(ContactError::InvalidJson)?;
    let submission = validate_contact(&payload).map_err(ContactError::Validation)?;

    let to_email = state.contact.to_email
        .as_deref()
        .ok_or(ContactError::Misconfigured("CONTACT_TO_EMAIL"))?;
    let mailer = state.mail.as_ref().ok_or(ContactError::Misconfigured("RESEND_API_KEY"))?;

    let email = compose_notification(&submission, to_email, &state.contact.from_email);
    mailer.send(&email).await?;

    info!("[Contact API] notification sent for subject '{}'", submission.subject);
    Ok(Json(ContactAccepted { success: true }))
}

pub async fn healthz() -> impl IntoResponse {
    "ok"
}
