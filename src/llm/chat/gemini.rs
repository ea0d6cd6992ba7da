use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ HeaderMap, HeaderValue, CONTENT_TYPE };
use serde::{ Deserialize, Serialize };
use log::{ info, debug };

use super::{ ChatClient, ProviderError, TextStream };
use crate::conversation::{ AssembledConversation, ProviderRole };

#[derive(Serialize)]
struct GeminiStreamRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

impl<'a> GeminiContent<'a> {
    fn new(role: ProviderRole, text: &'a str) -> Self {
        Self { role: role.as_str(), parts: vec![GeminiPart { text }] }
    }
}

#[derive(Deserialize)]
struct GoogleChunk {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    error: Option<GoogleError>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GoogleError {
    fn into_provider_error(self, http_status: u16) -> ProviderError {
        ProviderError::Api {
            status: if self.code != 0 { self.code } else { http_status },
            code: self.status,
            message: self.message,
        }
    }
}

/// Decodes one SSE `data:` payload. Chunks without text (safety ratings,
/// usage metadata) yield `None`.
fn parse_gemini_event(data: &str) -> Result<Option<String>, ProviderError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    let chunk: GoogleChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(error.into_provider_error(0));
    }
    let text: String = chunk.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn parse_gemini_stream(response: reqwest::Response) -> TextStream {
    let events = response.bytes_stream().eventsource();
    let mapped = events.filter_map(|result| async move {
        match result {
            Ok(event) => parse_gemini_event(&event.data).transpose(),
            Err(e) => Some(Err(ProviderError::Stream(e.to_string()))),
        }
    });
    Box::pin(mapped)
}

pub struct GeminiChatClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&api_key).map_err(|e|
            ProviderError::Config(format!("invalid API key header value: {}", e))
        )?;
        headers.insert("x-goog-api-key", key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self { client, model, base_url })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn stream_chat(
        &self,
        conversation: &AssembledConversation
    ) -> Result<TextStream, ProviderError> {
        info!(
            "GeminiChatClient::stream_chat() → model={} history_turns={}",
            self.model,
            conversation.history.len()
        );

        let mut contents: Vec<GeminiContent> = conversation.history
            .iter()
            .map(|turn| GeminiContent::new(turn.role, &turn.text))
            .collect();
        contents.push(GeminiContent::new(ProviderRole::User, &conversation.current_input));

        let payload = GeminiStreamRequest { contents };
        let response = self.client.post(self.stream_url()).json(&payload).send().await?;

        let status = response.status();
        debug!("Gemini stream response status: {}", status);
        if status.is_success() {
            return Ok(parse_gemini_stream(response));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<GoogleErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.into_provider_error(status.as_u16()),
            Err(_) =>
                ProviderError::Api {
                    status: status.as_u16(),
                    code: None,
                    message: body,
                },
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
