pub mod chat;
pub mod contact;

pub use chat::{ ChatMessage, ChatRequest, Role };
pub use contact::{ validate_contact, ContactSubmission, FieldErrors };
