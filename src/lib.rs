pub mod cli;
pub mod client;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod mail;
pub mod models;
pub mod relay;
pub mod server;

use cli::Args;
use config::load_persona;
use llm::LlmConfig;
use mail::{ ContactSettings, MailProvider, ResendClient };
use log::info;
use server::{ AppState, Server };
use std::error::Error;
use std::sync::Arc;

pub fn build_state(args: &Args) -> Result<AppState, Box<dyn Error + Send + Sync>> {
    let persona = load_persona(args.persona_path.as_deref())?;
    let chat = llm::chat::new_client(&LlmConfig::from_args(args))?;

    let mail: Option<Arc<dyn MailProvider>> = match Args::non_empty(&args.resend_api_key) {
        Some(key) => {
            let client = ResendClient::new(&key, args.resend_base_url.clone())?;
            Some(Arc::new(client) as Arc<dyn MailProvider>)
        }
        None => None,
    };

    Ok(AppState {
        chat,
        mail,
        persona,
        contact: ContactSettings {
            to_email: Args::non_empty(&args.contact_to_email),
            from_email: args.resend_from_email.clone(),
        },
    })
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Base URL: {}", args.chat_base_url);
    info!("Chat API Key: {}", if Args::non_empty(&args.chat_api_key).is_some() { "set" } else { "missing" });
    info!("Persona Path: {}", args.persona_path.as_deref().unwrap_or("<built-in>"));
    info!("Resend Base URL: {}", args.resend_base_url);
    info!("Resend API Key: {}", if Args::non_empty(&args.resend_api_key).is_some() { "set" } else { "missing" });
    info!("Contact Destination: {}", Args::non_empty(&args.contact_to_email).unwrap_or_else(|| "<unset>".into()));
    info!("Contact Sender: {}", args.resend_from_email);
    info!("Max Body Bytes: {}", args.max_body_bytes);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let state = build_state(&args)?;
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args);
    server.run().await?;

    Ok(())
}
