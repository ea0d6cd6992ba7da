use axum::extract::rejection::BytesRejection;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use log::{ error, warn };

use crate::conversation::ConversationError;
use crate::llm::chat::ProviderError;
use crate::mail::MailError;
use crate::models::FieldErrors;

pub const RATE_LIMIT_MESSAGE: &str =
    "Xin lỗi, AI đang bận (giới hạn lượt gọi). Vui lòng thử lại sau vài giây nhé! 🙏";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request body could not be read: {0}")]
    UnreadableBody(#[source] BytesRejection),
    #[error("Invalid request body")]
    InvalidBody(#[source] serde_json::Error),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error("chat provider is not configured (GEMINI_API_KEY missing)")]
    NotConfigured,
    #[error("upstream provider failed: {0}")]
    Provider(#[from] ProviderError),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::UnreadableBody(_) | ChatError::InvalidBody(_) | ChatError::Conversation(_) => {
                StatusCode::BAD_REQUEST
            }
            ChatError::Provider(e) if e.is_rate_limited() => StatusCode::TOO_MANY_REQUESTS,
            ChatError::NotConfigured | ChatError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ChatError::UnreadableBody(e) => {
                warn!("[Chat API] {}", e);
                "Invalid request body".to_string()
            }
            ChatError::InvalidBody(e) => {
                warn!("[Chat API] rejected body: {}", e);
                "Invalid request body".to_string()
            }
            ChatError::Conversation(e) => e.to_string(),
            ChatError::Provider(e) if status == StatusCode::TOO_MANY_REQUESTS => {
                error!("[Chat API] rate limited by provider: {}", e);
                RATE_LIMIT_MESSAGE.to_string()
            }
            ChatError::NotConfigured | ChatError::Provider(_) => {
                error!("[Chat API] {}", self);
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };
        (status, [(CONTENT_TYPE, "text/plain; charset=utf-8")], message).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("request body could not be read: {0}")]
    UnreadableBody(#[source] BytesRejection),
    #[error("request body is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Invalid form data")]
    Validation(FieldErrors),
    #[error("{0} is not set")]
    Misconfigured(&'static str),
    #[error("mail provider failed: {0}")]
    SendFailed(#[from] MailError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<&'a FieldErrors>,
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ContactError::UnreadableBody(e) => {
                warn!("[Contact API] {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON body")
            }
            ContactError::InvalidJson(e) => {
                warn!("[Contact API] rejected body: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON body")
            }
            ContactError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid form data"),
            ContactError::Misconfigured(_) => {
                error!("[Contact API] {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server misconfiguration")
            }
            ContactError::SendFailed(e) => {
                error!("[Contact API] Resend error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email. Please try again.")
            }
        };
        let issues = match &self {
            ContactError::Validation(issues) => Some(issues),
            _ => None,
        };
        (status, Json(ErrorBody { error, issues })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_quota_maps_to_429() {
        let err = ChatError::Provider(ProviderError::Stream("[GoogleGenerativeAI Error]: 429 Too Many Requests".into()));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn other_provider_failure_maps_to_500() {
        let err = ChatError::Provider(ProviderError::Api {
            status: 500,
            code: Some("INTERNAL".into()),
            message: "backend exploded".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn empty_conversation_maps_to_400() {
        assert_eq!(ChatError::from(ConversationError::Empty).status(), StatusCode::BAD_REQUEST);
    }
}
