use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use log::debug;

use super::consumer::lock;
use super::{ DisplayMessage, RelayClient, SendOutcome, Transcript };

/// A chat widget's state: one transcript, at most one reply in flight, and a
/// `clear` that aborts that reply before wiping the transcript.
#[derive(Debug)]
pub struct ChatSession {
    client: RelayClient,
    transcript: Mutex<Transcript>,
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    next_request: AtomicU64,
}

impl ChatSession {
    pub fn new(client: RelayClient) -> Self {
        Self {
            client,
            transcript: Mutex::new(Transcript::new()),
            in_flight: Mutex::new(None),
            next_request: AtomicU64::new(0),
        }
    }

    pub fn messages(&self) -> Vec<DisplayMessage> {
        lock(&self.transcript).messages().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.transcript).is_busy()
    }

    pub async fn send(&self, input: &str) -> SendOutcome {
        let request = self.next_request.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        {
            let mut slot = lock(&self.in_flight);
            if slot.is_some() {
                return SendOutcome::Ignored;
            }
            *slot = Some((request, cancel.clone()));
        }

        let outcome = self.client.send_shared(&self.transcript, input, &cancel).await;

        let mut slot = lock(&self.in_flight);
        if matches!(slot.as_ref(), Some((current, _)) if *current == request) {
            *slot = None;
        }
        outcome
    }

    /// Aborts the reply in flight, if any, then resets to the welcome message.
    pub fn clear(&self) {
        if let Some((_, cancel)) = lock(&self.in_flight).take() {
            debug!("Clearing chat with a reply in flight");
            cancel.cancel();
        }
        lock(&self.transcript).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WELCOME_ID;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{ Mock, MockServer, ResponseTemplate };

    #[tokio::test]
    async fn clear_aborts_reply_in_flight_and_resets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("late").set_delay(Duration::from_secs(5)))
            .mount(&server).await;

        let session = Arc::new(ChatSession::new(RelayClient::new(server.uri())));
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.send("Hello").await })
        };

        tokio::time::timeout(Duration::from_secs(2), async {
            while !session.is_busy() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }).await.unwrap();
        session.clear();

        let outcome = tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(matches!(outcome, SendOutcome::Aborted { .. }), "got {:?}", outcome);
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, WELCOME_ID);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn session_accepts_a_new_turn_after_clear() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Xin chào!"))
            .mount(&server).await;

        let session = ChatSession::new(RelayClient::new(server.uri()));
        session.send("first").await;
        session.clear();
        let outcome = session.send("second").await;

        assert!(matches!(outcome, SendOutcome::Completed { .. }), "got {:?}", outcome);
        let contents: Vec<_> = session.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1], "second");
        assert_eq!(contents[2], "Xin chào!");
    }
}
