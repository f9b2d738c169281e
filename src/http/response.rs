//! Response handling and transformation.
//!
//! # Responsibilities
//! - Copy a handler response (status, headers) onto a [`ResponseSink`]
//! - Inject the live-reload client script into HTML documents
//! - Stream every other body through chunk by chunk
//!
//! # Design Decisions
//! - HTML with injection enabled is fully buffered; everything else is fully
//!   streamed, never a mix
//! - Stream failures close the sink and are reported in the outcome, never
//!   raised
//! - A document without `</head>` is passed through unmodified

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::http::sink::ResponseSink;
use crate::module::FetchResponse;

/// Response header carrying the CSP nonce for injected scripts.
pub const CSP_NONCE_HEADER: &str = "content-security-policy-nonce";

/// Marker the client script is inserted in front of.
pub const HEAD_CLOSE: &str = "</head>";

/// The dev server's live-reload client script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientScript {
    src: String,
}

impl ClientScript {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    /// Module script tag, carrying `nonce` when one is given.
    pub fn tag(&self, nonce: Option<&str>) -> String {
        match nonce {
            Some(nonce) => format!(
                r#"<script type="module" nonce="{}" src="{}"></script>"#,
                nonce, self.src
            ),
            None => format!(r#"<script type="module" src="{}"></script>"#, self.src),
        }
    }

    /// Insert the tag before the first `</head>`. Returns `None` when the
    /// document has no `</head>`. Works on raw bytes, so documents in any
    /// ASCII-compatible charset come out byte-identical around the tag.
    pub fn inject(&self, html: &[u8], nonce: Option<&str>) -> Option<Bytes> {
        let marker = HEAD_CLOSE.as_bytes();
        let pos = html.windows(marker.len()).position(|w| w == marker)?;
        let tag = self.tag(nonce);

        let mut out = BytesMut::with_capacity(html.len() + tag.len());
        out.extend_from_slice(&html[..pos]);
        out.extend_from_slice(tag.as_bytes());
        out.extend_from_slice(&html[pos..]);
        Some(out.freeze())
    }
}

/// What the writer ended up doing with the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// HTML materialized and written in one piece.
    Buffered { bytes: usize, injected: bool },
    /// Body pumped chunk by chunk. `complete` is false when a read or write
    /// failed part way.
    Streamed { bytes: usize, complete: bool },
    /// No body; the sink was closed immediately.
    Empty,
}

/// Writes handler responses onto the transport.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    client_script: Option<ClientScript>,
}

impl ResponseWriter {
    /// A writer that injects `client_script` into HTML responses, or passes
    /// everything through when `None`.
    pub fn new(client_script: Option<ClientScript>) -> Self {
        Self { client_script }
    }

    pub fn client_script(&self) -> Option<&ClientScript> {
        self.client_script.as_ref()
    }

    pub async fn write<S: ResponseSink>(&self, response: FetchResponse, sink: &mut S) -> WriteOutcome {
        let (parts, body) = response.into_parts();

        sink.set_status(parts.status);
        for (name, value) in parts.headers.iter() {
            sink.append_header(name.clone(), value.clone());
        }

        if let Some(script) = &self.client_script {
            if is_html(&parts.headers) {
                let nonce = parts
                    .headers
                    .get(CSP_NONCE_HEADER)
                    .and_then(|v| v.to_str().ok());
                return write_html(script, nonce, body, sink).await;
            }
        }

        if body.is_end_stream() {
            sink.end(None).await;
            return WriteOutcome::Empty;
        }

        pump(body, sink).await
    }
}

fn is_html(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"))
}

async fn write_html<S: ResponseSink>(
    script: &ClientScript,
    nonce: Option<&str>,
    body: Body,
    sink: &mut S,
) -> WriteOutcome {
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read HTML response body");
            sink.end(None).await;
            return WriteOutcome::Streamed {
                bytes: 0,
                complete: false,
            };
        }
    };

    let (html, injected) = match script.inject(&bytes, nonce) {
        Some(injected) => (injected, true),
        None => {
            tracing::debug!("HTML response has no </head>, client script not injected");
            (bytes, false)
        }
    };

    let len = html.len();
    sink.set_header(header::CONTENT_LENGTH, HeaderValue::from(len));
    sink.end(Some(html)).await;

    WriteOutcome::Buffered { bytes: len, injected }
}

async fn pump<S: ResponseSink>(body: Body, sink: &mut S) -> WriteOutcome {
    let mut stream = body.into_data_stream();
    let mut written = 0;
    let mut complete = true;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                let len = chunk.len();
                if sink.write(chunk).await.is_err() {
                    tracing::debug!(bytes = written, "Client went away, stopping response stream");
                    complete = false;
                    break;
                }
                written += len;
            }
            Err(e) => {
                tracing::warn!(error = %e, bytes = written, "Response stream failed");
                complete = false;
                break;
            }
        }
    }

    sink.end(None).await;
    WriteOutcome::Streamed {
        bytes: written,
        complete,
    }
}
