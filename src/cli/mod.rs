use clap::Parser;

/// Large enough for a long chat transcript, which the client resends in full on every turn.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API Key for the Gemini chat provider. Without it /api/chat answers 500.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub chat_api_key: Option<String>,

    /// Model name for chat completion (e.g., gemini-2.0-flash, gemini-1.5-pro)
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.0-flash")]
    pub chat_model: String,

    /// Base URL for the Gemini API (without the /v1beta suffix)
    #[arg(long, env = "CHAT_BASE_URL", default_value = "https://generativelanguage.googleapis.com")]
    pub chat_base_url: String,

    /// Optional path to a persona JSON file. The built-in persona is used when unset.
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    // --- Mail Provider Args ---
    /// API Key for the Resend transactional email API.
    #[arg(long, env = "RESEND_API_KEY")]
    pub resend_api_key: Option<String>,

    /// Base URL for the Resend API.
    #[arg(long, env = "RESEND_BASE_URL", default_value = "https://api.resend.com")]
    pub resend_base_url: String,

    /// Mailbox that receives contact form notifications.
    #[arg(long, env = "CONTACT_TO_EMAIL")]
    pub contact_to_email: Option<String>,

    /// Sender address used for contact form notifications.
    #[arg(long, env = "RESEND_FROM_EMAIL", default_value = "onboarding@resend.dev")]
    pub resend_from_email: String,

    // --- General App Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Maximum accepted request body size in bytes.
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    /// Treats blank environment values the same as unset ones.
    pub fn non_empty(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }
}
