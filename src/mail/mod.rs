pub mod compose;
pub mod resend;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use compose::compose_notification;
pub use resend::ResendClient;

/// A fully rendered transactional email, ready for the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider rejected the message ({status}): {message}")]
    Rejected {
        status: u16,
        name: Option<String>,
        message: String,
    },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid mail provider configuration: {0}")]
    Config(String),
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Server-side addresses used by the contact endpoint.
#[derive(Clone, Debug)]
pub struct ContactSettings {
    pub to_email: Option<String>,
    pub from_email: String,
}
