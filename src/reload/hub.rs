//! Reload broadcast hub and its HTTP endpoints.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures_util::future::Either;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};

use crate::lifecycle::Shutdown;

const CLIENT_TEMPLATE: &str = include_str!("../../assets/reload-client.js");
const EVENTS_PLACEHOLDER: &str = "__BRIDGE_EVENTS_PATH__";

/// Message pushed to browsers over the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadEvent {
    /// First event on every stream.
    Connected,
    /// A watched file changed; `path` is relative to the project root.
    FullReload { path: String },
}

/// Fan-out point between the watcher and connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
    shutdown: Option<Shutdown>,
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, shutdown: None }
    }

    /// End every event stream when `shutdown` fires, so open browser tabs
    /// do not hold the server open.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event. Returns how many subscribers received it.
    pub fn notify(&self, event: ReloadEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("No reload subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stream of SSE events: `connected`, then everything broadcast after.
    pub fn event_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        let updates = BroadcastStream::new(self.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Reload subscriber lagged");
                None
            }
        });

        let stop = match &self.shutdown {
            Some(shutdown) => Either::Left(shutdown.wait()),
            None => Either::Right(std::future::pending::<()>()),
        };

        let events = tokio_stream::once(ReloadEvent::Connected)
            .chain(updates)
            .filter_map(|event| Event::default().json_data(&event).ok())
            .map(Ok::<_, Infallible>);
        futures_util::StreamExt::take_until(events, stop)
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(16)
    }
}

/// `GET {events_path}`.
pub async fn events_handler(State(hub): State<ReloadHub>) -> impl IntoResponse {
    tracing::debug!(subscribers = hub.subscriber_count() + 1, "Reload client connected");

    Sse::new(hub.event_stream()).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Client script with the event stream URL filled in.
pub fn render_client_script(events_path: &str) -> String {
    CLIENT_TEMPLATE.replace(EVENTS_PLACEHOLDER, events_path)
}

/// `GET {client_script}`.
pub async fn client_script_handler(State(script): State<Arc<str>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        assert_eq!(
            serde_json::to_string(&ReloadEvent::Connected).unwrap(),
            r#"{"type":"connected"}"#
        );
        assert_eq!(
            serde_json::to_string(&ReloadEvent::FullReload {
                path: "src/app.ts".into()
            })
            .unwrap(),
            r#"{"type":"full-reload","path":"src/app.ts"}"#
        );
    }

    #[test]
    fn test_notify_without_subscribers() {
        let hub = ReloadHub::default();
        assert_eq!(hub.notify(ReloadEvent::Connected), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let hub = ReloadHub::default();
        let mut rx = hub.subscribe();

        let event = ReloadEvent::FullReload {
            path: "index.html".into(),
        };
        assert_eq!(hub.notify(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_ends_on_shutdown() {
        let shutdown = Shutdown::new();
        let hub = ReloadHub::default().with_shutdown(shutdown.clone());
        let mut stream = Box::pin(hub.event_stream());

        assert!(stream.next().await.is_some());
        shutdown.trigger();

        let end = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
        assert!(matches!(end, Ok(None)));
    }

    #[test]
    fn test_client_script_uses_events_path() {
        let script = render_client_script("/@bridge/events");

        assert!(script.contains(r#""/@bridge/events""#));
        assert!(!script.contains(EVENTS_PLACEHOLDER));
    }
}
