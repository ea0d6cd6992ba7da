use async_trait::async_trait;
use futures::{ stream, StreamExt };
use portfolio_relay::cli::DEFAULT_MAX_BODY_BYTES;
use portfolio_relay::client::consumer::GENERIC_FALLBACK;
use portfolio_relay::client::{ ChatSession, RelayClient, SendOutcome, Transcript, WELCOME_ID };
use portfolio_relay::config::persona::builtin_persona;
use portfolio_relay::conversation::AssembledConversation;
use portfolio_relay::llm::chat::{ ChatClient, ProviderError, TextStream };
use portfolio_relay::mail::ContactSettings;
use portfolio_relay::server::{ build_router, AppState };
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct ScriptedChat {
    chunks: Vec<&'static str>,
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn stream_chat(&self, _: &AssembledConversation) -> Result<TextStream, ProviderError> {
        let chunks: Vec<String> = self.chunks.iter().map(|c| c.to_string()).collect();
        let paced = stream::iter(chunks).then(|chunk| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ProviderError>(chunk)
        });
        Ok(Box::pin(paced))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Emits one chunk, then fails after the response has started.
struct BrokenChat;

#[async_trait]
impl ChatClient for BrokenChat {
    async fn stream_chat(&self, _: &AssembledConversation) -> Result<TextStream, ProviderError> {
        let items = stream::iter(vec![
            Ok("partial".to_string()),
            Err(ProviderError::Stream("connection reset by upstream".into())),
        ]).then(|item| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            item
        });
        Ok(Box::pin(items))
    }

    fn model(&self) -> &str {
        "broken"
    }
}

struct Ticker {
    produced: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

struct EndlessChat {
    produced: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl ChatClient for EndlessChat {
    async fn stream_chat(&self, _: &AssembledConversation) -> Result<TextStream, ProviderError> {
        let ticker = Ticker { produced: self.produced.clone(), dropped: self.dropped.clone() };
        let ticks = stream::unfold(ticker, |ticker| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ticker.produced.fetch_add(1, Ordering::SeqCst);
            Some((Ok::<_, ProviderError>("tick ".to_string()), ticker))
        });
        Ok(Box::pin(ticks))
    }

    fn model(&self) -> &str {
        "endless"
    }
}

async fn spawn_app(chat: Arc<dyn ChatClient>) -> String {
    let state = AppState {
        chat: Some(chat),
        mail: None,
        persona: builtin_persona().unwrap(),
        contact: ContactSettings { to_email: None, from_email: "onboarding@resend.dev".into() },
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state, DEFAULT_MAX_BODY_BYTES);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/chat", addr)
}

#[tokio::test]
async fn streamed_chunks_are_reconstructed_in_order() {
    let endpoint = spawn_app(Arc::new(ScriptedChat { chunks: vec!["Xin", " chào", "!"] })).await;
    let client = RelayClient::new(endpoint);
    let mut transcript = Transcript::new();

    let outcome = client.send(&mut transcript, "Hello", &CancellationToken::new()).await;

    let SendOutcome::Completed { id } = &outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    assert_eq!(transcript.get(id).unwrap().content, "Xin chào!");
    assert!(!transcript.is_busy());
}

#[tokio::test]
async fn follow_up_turn_carries_history() {
    let endpoint = spawn_app(Arc::new(ScriptedChat { chunks: vec!["ok"] })).await;
    let client = RelayClient::new(endpoint);
    let mut transcript = Transcript::new();

    client.send(&mut transcript, "first", &CancellationToken::new()).await;
    client.send(&mut transcript, "second", &CancellationToken::new()).await;

    let contents: Vec<_> = transcript.history().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["first", "ok", "second", "ok"]);
}

#[tokio::test]
async fn aborting_mid_stream_is_silent_and_stops_upstream() {
    let produced = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicBool::new(false));
    let endpoint = spawn_app(
        Arc::new(EndlessChat { produced: produced.clone(), dropped: dropped.clone() })
    ).await;

    let client = RelayClient::new(endpoint);
    let mut transcript = Transcript::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let outcome = client.send(&mut transcript, "Hello", &cancel).await;

    let SendOutcome::Aborted { id } = &outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    let content = &transcript.get(id).unwrap().content;
    assert!(content.is_empty() || content.starts_with("tick"), "got: {content}");
    assert!(!transcript.is_busy());

    tokio::time::timeout(Duration::from_secs(5), async {
        while !dropped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }).await.expect("relay should stop reading upstream after the client aborts");

    let settled = produced.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(produced.load(Ordering::SeqCst), settled);
}

#[tokio::test]
async fn upstream_failure_mid_stream_shows_generic_fallback() {
    let endpoint = spawn_app(Arc::new(BrokenChat)).await;
    let client = RelayClient::new(endpoint);
    let mut transcript = Transcript::new();

    let outcome = client.send(&mut transcript, "Hello", &CancellationToken::new()).await;

    let SendOutcome::Failed { id } = &outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    assert_eq!(transcript.get(id).unwrap().content, GENERIC_FALLBACK);
    assert!(!transcript.is_busy());
}

#[tokio::test]
async fn clearing_the_session_mid_stream_stops_upstream() {
    let produced = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicBool::new(false));
    let endpoint = spawn_app(
        Arc::new(EndlessChat { produced: produced.clone(), dropped: dropped.clone() })
    ).await;

    let session = Arc::new(ChatSession::new(RelayClient::new(endpoint)));
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send("Hello").await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while produced.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }).await.expect("stream should start");
    session.clear();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert!(matches!(outcome, SendOutcome::Aborted { .. }), "got {:?}", outcome);
    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, WELCOME_ID);
    assert!(!session.is_busy());

    tokio::time::timeout(Duration::from_secs(5), async {
        while !dropped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }).await.expect("relay should stop reading upstream after the session is cleared");
}
