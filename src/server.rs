//! Axum router construction and route mapping.
//!
//! `spec.md` §4.6 describes the dispatcher in transport-neutral terms:
//! parse the URL into a resource, construct the matching action, call
//! `start()`. This module is the only place that knows about axum --
//! it builds an [`AxumRequestPort`](crate::backend::AxumRequestPort) per
//! request, hands it to `crate::action::registry`, then turns whatever
//! the registry staged on that port into a real [`Response`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    routing::{put, post},
    Router,
};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::action::registry;
use crate::backend::AxumRequestPort;
use crate::errors::generate_request_id;
use crate::metrics::{healthz_handler, metrics_handler};
use crate::AppState;

/// Build the axum [`Router`]. Only the two routes `spec.md` names get a
/// real action; everything else (including every other S3 verb) falls
/// to axum's own 404, since no handler is registered for it.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", axum::routing::get(healthz_handler))
        .route("/metrics", axum::routing::get(metrics_handler))
        .route("/:bucket", post(handle_bucket_post))
        .route("/:bucket/*key", put(handle_object_put))
        .with_state(state)
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(DefaultBodyLimit::disable())
}

/// `POST /:bucket` -- currently only `?delete` (DeleteMultipleObjects).
async fn handle_bucket_post(
    State(state): State<Arc<AppState>>,
    Path(bucket): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = parse_query(raw_query);
    let resource_uri = format!("/{bucket}");
    let port = AxumRequestPort::new(generate_request_id(), resource_uri, headers, body);

    registry::dispatch_bucket_post(&port, &state.backends, &state.config, &bucket, &query).await;

    into_response(port)
}

/// `PUT /:bucket/*key` -- currently only `?keyval` (PutKeyValue).
async fn handle_object_put(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = parse_query(raw_query);
    let resource_uri = format!("/{bucket}/{key}");
    let port = AxumRequestPort::new(generate_request_id(), resource_uri, headers, body);

    registry::dispatch_object_put(&port, &state.backends, &bucket, &key, &query).await;

    into_response(port)
}

/// Turn whatever the action staged on the port into a real axum
/// [`Response`]. A port with nothing staged (should never happen --
/// every action path terminates through `crate::action::response::emit`)
/// renders as 500, logged loudly since it means a verb returned early.
fn into_response(port: AxumRequestPort) -> Response {
    let (out_headers, sent) = port.into_response_parts();
    let (status, body) = match sent {
        Some((status, body)) => (status, body),
        None => {
            tracing::error!("action returned without emitting a response");
            (500, Bytes::from_static(b"internal error"))
        }
    };

    let mut builder = Response::builder().status(status);
    for (name, value) in out_headers {
        builder = builder.header(name, value);
    }
    builder
        .body(axum::body::Body::from(body))
        .expect("response builder with only trusted headers cannot fail")
}

/// Parse a raw query string into a map, percent-decoding keys and
/// values the same way the dialect's sub-resource selectors (`?delete`,
/// `?keyval`) are written over the wire.
fn parse_query(raw: Option<String>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some(raw) = raw else { return map };
    for part in raw.split('&') {
        if part.is_empty() {
            continue;
        }
        if let Some((k, v)) = part.split_once('=') {
            let k = percent_decode_str(k).decode_utf8_lossy().into_owned();
            let v = percent_decode_str(v).decode_utf8_lossy().into_owned();
            map.insert(k, v);
        } else {
            let k = percent_decode_str(part).decode_utf8_lossy().into_owned();
            map.insert(k, String::new());
        }
    }
    map
}

/// Stamps `x-amz-request-id`, `x-amz-id-2`, `Date`, and `Server` on every
/// response, matching the headers S3 clients expect regardless of which
/// action (or none) handled the request.
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-amz-request-id") {
        headers.insert(
            "x-amz-request-id",
            HeaderValue::from_str(&generate_request_id()).unwrap(),
        );
    }

    if !headers.contains_key("x-amz-id-2") {
        let random_bytes: [u8; 24] = rand::random();
        let id2 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, random_bytes);
        headers.insert("x-amz-id-2", HeaderValue::from_str(&id2).unwrap());
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    headers.insert("date", HeaderValue::from_str(&date).unwrap());
    headers.insert("server", HeaderValue::from_static("gatekv"));

    debug!(status = %response.status(), "request handled");
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_decodes_bare_and_valued_params() {
        let query = parse_query(Some("delete&marker=a%2Fb".to_string()));
        assert_eq!(query.get("delete"), Some(&String::new()));
        assert_eq!(query.get("marker"), Some(&"a/b".to_string()));
    }

    #[test]
    fn parse_query_handles_absent_query_string() {
        let query = parse_query(None);
        assert!(query.is_empty());
    }
}
