use futures::StreamExt;
use reqwest::StatusCode;
use std::sync::{ Mutex, MutexGuard, PoisonError };
use tokio_util::sync::CancellationToken;
use log::{ debug, warn };

use super::Transcript;
use crate::models::{ ChatMessage, ChatRequest };

pub const BUSY_FALLBACK: &str =
    "AI đang bận (giới hạn lượt gọi). Vui lòng thử lại sau vài giây nhé! 🙏";
pub const UNAVAILABLE_FALLBACK: &str = "Model AI hiện không khả dụng. Vui lòng thử lại sau nhé! 🙏";
pub const GENERIC_FALLBACK: &str = "Xin lỗi, đã có lỗi xảy ra. Bạn thử lại nhé! 🙏";

/// Incremental UTF-8 decoder. A code point split across two network chunks is
/// held back until its remaining bytes arrive.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flushes a truncated trailing sequence as a replacement character.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, or a reply is already streaming.
    Ignored,
    Completed { id: String },
    Aborted { id: String },
    Failed { id: String },
}

fn fallback_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::TOO_MANY_REQUESTS => BUSY_FALLBACK,
        StatusCode::SERVICE_UNAVAILABLE => UNAVAILABLE_FALLBACK,
        _ => GENERIC_FALLBACK,
    }
}

/// Posts the transcript to a `/api/chat` endpoint and streams the reply into it.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), endpoint: endpoint.into() }
    }

    /// Cancelling `cancel` stops the read and leaves whatever text arrived so far.
    pub async fn send(
        &self,
        transcript: &mut Transcript,
        input: &str,
        cancel: &CancellationToken
    ) -> SendOutcome {
        let shared = Mutex::new(std::mem::take(transcript));
        let outcome = self.send_shared(&shared, input, cancel).await;
        *transcript = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        outcome
    }

    /// Same as [`RelayClient::send`], for a transcript other tasks may read or
    /// clear while the reply streams. The lock is never held across an await.
    pub async fn send_shared(
        &self,
        transcript: &Mutex<Transcript>,
        input: &str,
        cancel: &CancellationToken
    ) -> SendOutcome {
        let text = input.trim();
        let started = {
            let mut t = lock(transcript);
            if text.is_empty() || t.is_busy() || cancel.is_cancelled() {
                None
            } else {
                let mut history = t.history();
                history.push(ChatMessage::user(text));
                t.push_user(text);
                Some((t.begin_assistant(), history))
            }
        };
        let Some((id, history)) = started else {
            return SendOutcome::Ignored;
        };

        let request = self.http
            .post(&self.endpoint)
            .json(&ChatRequest { messages: Some(history) })
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return aborted(transcript, id),
            response = request => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                lock(transcript).fail(&id, GENERIC_FALLBACK);
                return SendOutcome::Failed { id };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return aborted(transcript, id),
                body = response.text() => body.unwrap_or_default(),
            };
            let message = if body.trim().is_empty() { fallback_for(status) } else { body.as_str() };
            lock(transcript).fail(&id, message);
            return SendOutcome::Failed { id };
        }

        let mut body = response.bytes_stream();
        let mut decoder = Utf8Decoder::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return aborted(transcript, id),
                next = body.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    let chunk = decoder.decode(&bytes);
                    if !chunk.is_empty() {
                        lock(transcript).append(&id, &chunk);
                    }
                }
                Some(Err(e)) => {
                    warn!("Chat stream read failed: {}", e);
                    lock(transcript).fail(&id, GENERIC_FALLBACK);
                    return SendOutcome::Failed { id };
                }
                None => {
                    let tail = decoder.finish();
                    let mut t = lock(transcript);
                    if !tail.is_empty() {
                        t.append(&id, &tail);
                    }
                    t.finalize(&id);
                    return SendOutcome::Completed { id };
                }
            }
        }
    }
}

fn aborted(transcript: &Mutex<Transcript>, id: String) -> SendOutcome {
    debug!("Chat request aborted by caller");
    lock(transcript).finalize(&id);
    SendOutcome::Aborted { id }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
