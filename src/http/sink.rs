//! Transport response sink.
//!
//! # Responsibilities
//! - Accept status, headers, body chunks and an explicit close
//! - Deliver the response head to axum as soon as the body starts
//! - Report a closed connection to the writer so it can stop pumping
//!
//! # Design Decisions
//! - Head travels through a oneshot, body chunks through a bounded channel
//!   (backpressure follows the client)
//! - A body written in one `end` call is sent as a full body, not a stream
//! - Dropping an unfinished sink still delivers whatever head it holds

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{response::Parts, HeaderName, HeaderValue, Response, StatusCode};
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

/// Chunks buffered between the writer task and the connection.
const CHANNEL_CAPACITY: usize = 16;

/// The connection went away before the body was fully written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("response sink closed")]
pub struct SinkClosed;

/// Writable side of a transport response.
#[async_trait]
pub trait ResponseSink: Send {
    fn set_status(&mut self, status: StatusCode);

    /// Add a header value, keeping existing values for the name.
    fn append_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Replace every value for the name.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Write one body chunk. Fails once the connection is gone.
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;

    /// Finish the response, optionally with a final chunk.
    async fn end(&mut self, chunk: Option<Bytes>);
}

/// A [`ResponseSink`] that produces an axum [`Response`].
pub struct ChannelSink {
    head: Option<(Parts, oneshot::Sender<Response<Body>>)>,
    body: Option<mpsc::Sender<Result<Bytes, std::io::Error>>>,
}

impl ChannelSink {
    /// Create a sink and the receiver that yields its response once the head
    /// is committed.
    pub fn new() -> (Self, oneshot::Receiver<Response<Body>>) {
        let (tx, rx) = oneshot::channel();
        let (parts, ()) = Response::new(()).into_parts();
        (
            Self {
                head: Some((parts, tx)),
                body: None,
            },
            rx,
        )
    }

    fn parts_mut(&mut self) -> Option<&mut Parts> {
        self.head.as_mut().map(|(parts, _)| parts)
    }

    /// Send the head with `body`. No-op once committed.
    fn commit(&mut self, body: Body) {
        if let Some((parts, tx)) = self.head.take() {
            // The receiver is gone only if the request was abandoned.
            let _ = tx.send(Response::from_parts(parts, body));
        }
    }

    fn is_committed(&self) -> bool {
        self.head.is_none()
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    fn set_status(&mut self, status: StatusCode) {
        if let Some(parts) = self.parts_mut() {
            parts.status = status;
        }
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if let Some(parts) = self.parts_mut() {
            parts.headers.append(name, value);
        }
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if let Some(parts) = self.parts_mut() {
            parts.headers.insert(name, value);
        }
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        if !self.is_committed() {
            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            self.body = Some(tx);
            self.commit(Body::from_stream(ReceiverStream::new(rx)));
        }

        match &self.body {
            Some(tx) => tx.send(Ok(chunk)).await.map_err(|_| SinkClosed),
            None => Err(SinkClosed),
        }
    }

    async fn end(&mut self, chunk: Option<Bytes>) {
        if !self.is_committed() {
            self.commit(chunk.map(Body::from).unwrap_or_else(Body::empty));
            return;
        }

        if let (Some(chunk), Some(tx)) = (chunk, &self.body) {
            let _ = tx.send(Ok(chunk)).await;
        }
        // Dropping the sender ends the body stream.
        self.body = None;
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        self.commit(Body::empty());
    }
}
