//! Forwards provider text increments to the HTTP response as they arrive.
//!
//! A producer task drains the upstream stream into a bounded channel and the
//! response body drains the channel. Dropping the body (client went away)
//! closes the channel, which stops the producer and drops the upstream
//! stream with it.

use axum::body::Body;
use axum::http::header::{ CACHE_CONTROL, CONTENT_TYPE };
use axum::response::{ IntoResponse, Response };
use bytes::Bytes;
use futures::StreamExt;
use std::io;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use log::{ debug, error, info };

use crate::llm::chat::TextStream;

const RELAY_BUFFER: usize = 32;

pub type RelayFrame = Result<Bytes, io::Error>;

pub fn spawn_relay(mut upstream: TextStream) -> mpsc::Receiver<RelayFrame> {
    let (tx, rx) = mpsc::channel::<RelayFrame>(RELAY_BUFFER);

    tokio::spawn(async move {
        let mut forwarded = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => {
                    info!("Client disconnected after {} chunks; dropping upstream stream", forwarded);
                    break;
                }
                next = upstream.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    if tx.send(Ok(Bytes::from(text))).await.is_err() {
                        info!("Client disconnected after {} chunks; dropping upstream stream", forwarded);
                        break;
                    }
                    forwarded += 1;
                }
                Some(Err(e)) => {
                    error!("[Chat API] upstream stream failed after {} chunks: {}", forwarded, e);
                    let _ = tx.send(Err(io::Error::other("upstream stream interrupted"))).await;
                    break;
                }
                None => {
                    debug!("Upstream stream finished after {} chunks", forwarded);
                    break;
                }
            }
        }
    });

    rx
}

/// Plain-text response whose body is fed by the relay channel. The headers keep
/// proxies from buffering or caching partial output.
pub fn streaming_response(rx: mpsc::Receiver<RelayFrame>) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx));
    (
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
            (axum::http::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    ).into_response()
}

pub fn relay_response(upstream: TextStream) -> Response {
    streaming_response(spawn_relay(upstream))
}
