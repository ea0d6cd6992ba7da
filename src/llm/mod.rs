pub mod chat;

use crate::cli::Args;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: String,
    pub base_url: String,
}

impl LlmConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            api_key: Args::non_empty(&args.chat_api_key),
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
        }
    }
}
