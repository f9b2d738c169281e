//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID for tracing
//! - Convert an incoming transport request into a standards-shaped
//!   [`FetchRequest`] with an absolute URL
//! - Preserve header multiplicity when copying
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - GET and HEAD never carry a body, whatever the transport delivered
//! - Bodies are streamed through untouched and marked half-duplex
//! - Header values are copied unvalidated

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::module::FetchRequest;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Host used when the request carries no `Host` header.
pub const DEFAULT_HOST: &str = "localhost";

/// UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the request ID assigned by the host, if any.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Connection facts inserted into request extensions by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// True when the connection is TLS.
    pub encrypted: bool,
}

/// Duplex mode declared on a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    /// The request body is fully sent before the response is read.
    Half,
}

/// Returns true for methods whose requests never carry a body.
pub fn is_bodyless(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Convert an incoming request into a [`FetchRequest`].
pub fn adapt_request(request: Request<Body>) -> FetchRequest {
    let (parts, body) = request.into_parts();

    let encrypted = parts
        .extensions
        .get::<ConnectionInfo>()
        .map(|info| info.encrypted)
        .unwrap_or(false);
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_HOST);
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut fetch = Request::builder().method(parts.method.clone());
    if let Some(headers) = fetch.headers_mut() {
        copy_headers(&parts.headers, headers);
    }

    let body = if is_bodyless(&parts.method) {
        Body::empty()
    } else {
        fetch = fetch.extension(Duplex::Half);
        body
    };

    let uri = absolute_uri(encrypted, host, path_and_query);
    match fetch.uri(uri).body(body) {
        Ok(request) => request,
        // Only reachable if a header name/value failed to convert, which
        // cannot happen for values already parsed by the transport.
        Err(e) => {
            tracing::warn!(error = %e, "Failed to assemble fetch request");
            let mut request = Request::new(Body::empty());
            *request.method_mut() = parts.method;
            request
        }
    }
}

/// Build `protocol://host/path?query`, falling back to the default host when
/// the `Host` header cannot form a valid URI.
pub fn absolute_uri(encrypted: bool, host: &str, path_and_query: &str) -> Uri {
    let protocol = if encrypted { "https" } else { "http" };
    let url = format!("{}://{}{}", protocol, host, path_and_query);

    url.parse::<Uri>().unwrap_or_else(|e| {
        tracing::debug!(host = %host, error = %e, "Invalid host header, using default host");
        format!("{}://{}{}", protocol, DEFAULT_HOST, path_and_query)
            .parse()
            .unwrap_or_default()
    })
}

/// Copy headers key by key: several values are appended one by one, a single
/// value is set.
pub fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        let mut values = from.get_all(name).iter();
        match (values.next(), values.next()) {
            (Some(only), None) => {
                to.insert(name.clone(), only.clone());
            }
            _ => {
                for value in from.get_all(name) {
                    to.append(name.clone(), value.clone());
                }
            }
        }
    }
}
