pub mod api;
pub mod error;

use crate::cli::Args;
use crate::config::PersonaContext;
use crate::llm::chat::ChatClient;
use crate::mail::{ ContactSettings, MailProvider };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{ extract::DefaultBodyLimit, routing::{ get, post }, Router };
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };

/// Read-only per-process state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub chat: Option<Arc<dyn ChatClient>>,
    pub mail: Option<Arc<dyn MailProvider>>,
    pub persona: Arc<PersonaContext>,
    pub contact: ContactSettings,
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(api::chat_handler))
        .route("/api/contact", post(api::contact_handler))
        .route("/healthz", get(api::healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        if state.chat.is_none() {
            warn!("Chat provider not configured. /api/chat will answer 500.");
        }
        if state.mail.is_none() || state.contact.to_email.is_none() {
            warn!("Mail relay not fully configured. /api/contact will answer 500 for valid submissions.");
        }
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let app = build_router(self.state.clone(), self.args.max_body_bytes);

        if self.args.enable_tls {
            let (cert_path, key_path) = match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert), Some(key)) => (cert, key),
                (Some(_), None) | (None, Some(_)) => {
                    error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                    return Err("Missing TLS certificate or key path".into());
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    return Err("TLS enabled without cert/key".into());
                }
            };
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
            let tls_config = axum_server::tls_rustls::RustlsConfig
                ::from_pem_file(cert_path, key_path).await
                .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

            info!("HTTPS server listening on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
        } else {
            let listener = tokio::net::TcpListener
                ::bind(addr).await
                .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
            info!("HTTP server listening on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }

        Ok(())
    }
}
