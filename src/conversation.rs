//! Turns the browser's visible transcript into the two-role history the chat
//! provider expects.
//!
//! The provider has no system-instruction slot in the mode we use, so the
//! persona is injected as a synthetic opening exchange: a user turn carrying
//! the instruction followed by a model turn acknowledging it. The last client
//! message is kept apart as the input that triggers generation.

use thiserror::Error;

use crate::config::PersonaContext;
use crate::models::{ ChatMessage, Role };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderRole {
    User,
    Model,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderRole::User => "user",
            ProviderRole::Model => "model",
        }
    }
}

impl From<Role> for ProviderRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ProviderRole::User,
            Role::Assistant => ProviderRole::Model,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderTurn {
    pub role: ProviderRole,
    pub text: String,
}

pub type ProviderHistory = Vec<ProviderTurn>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledConversation {
    pub history: ProviderHistory,
    pub current_input: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Messages required")]
    Empty,
}

pub fn build_upstream_history(persona: &PersonaContext, prior_turns: &[ChatMessage]) -> ProviderHistory {
    let mut history = Vec::with_capacity(prior_turns.len() + 2);
    history.push(ProviderTurn { role: ProviderRole::User, text: persona.instruction() });
    history.push(ProviderTurn { role: ProviderRole::Model, text: persona.acknowledgement.clone() });
    history.extend(
        prior_turns.iter().map(|m| ProviderTurn { role: m.role.into(), text: m.content.clone() })
    );
    history
}

pub fn assemble(
    persona: &PersonaContext,
    messages: &[ChatMessage]
) -> Result<AssembledConversation, ConversationError> {
    let (last, prior) = messages.split_last().ok_or(ConversationError::Empty)?;
    Ok(AssembledConversation {
        history: build_upstream_history(persona, prior),
        current_input: last.content.clone(),
    })
}
