//! Client side of `/api/chat`: an append-only transcript plus a consumer that
//! feeds streamed reply text into it.

pub mod consumer;
pub mod session;

use uuid::Uuid;

use crate::models::{ ChatMessage, Role };

pub use consumer::{ RelayClient, SendOutcome, Utf8Decoder };
pub use session::ChatSession;

pub const WELCOME_ID: &str = "welcome";
pub const WELCOME_TEXT: &str =
    "Xin chào! Mình là AI assistant của **Trần Hoàng Huy** 👋\n\nBạn có thể hỏi mình về kỹ năng, kinh nghiệm, dự án hoặc cách liên hệ với Huy nhé!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

/// Visible chat history. Only the message currently streaming can change, and
/// only by appending, until it is finalized or replaced by an error text.
#[derive(Clone, Debug)]
pub struct Transcript {
    messages: Vec<DisplayMessage>,
    streaming: Option<String>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: vec![DisplayMessage {
                id: WELCOME_ID.to_string(),
                role: Role::Assistant,
                content: WELCOME_TEXT.to_string(),
            }],
            streaming: None,
        }
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&DisplayMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn streaming_id(&self) -> Option<&str> {
        self.streaming.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.streaming.is_some()
    }

    /// History to send upstream: everything except the local welcome message.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.id != WELCOME_ID)
            .map(|m| ChatMessage { role: m.role, content: m.content.clone() })
            .collect()
    }

    pub fn push_user(&mut self, content: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.messages.push(DisplayMessage {
            id: id.clone(),
            role: Role::User,
            content: content.to_string(),
        });
        id
    }

    /// Opens an empty assistant message that subsequent chunks append to.
    pub fn begin_assistant(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.messages.push(DisplayMessage {
            id: id.clone(),
            role: Role::Assistant,
            content: String::new(),
        });
        self.streaming = Some(id.clone());
        id
    }

    pub fn append(&mut self, id: &str, chunk: &str) -> bool {
        if self.streaming.as_deref() != Some(id) {
            return false;
        }
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Swaps the in-progress content for an error text and finalizes the message.
    pub fn fail(&mut self, id: &str, fallback: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            message.content = fallback.to_string();
        }
        self.finalize(id);
    }

    pub fn finalize(&mut self, id: &str) {
        if self.streaming.as_deref() == Some(id) {
            self.streaming = None;
        }
    }

    /// Local reset only. [`ChatSession::clear`] also aborts the reply in flight.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
