//! Concrete backend wiring.
//!
//! `spec.md` §9 "dynamic polymorphism over ports": the action core never
//! names a concrete backend type, only the traits in `crate::ports`. This
//! module supplies the two implementations the binary actually uses: the
//! in-memory fake ([`memory::MemoryBackend`], also the crate's default
//! runnable backend -- a real Motr/Clovis client is an external
//! collaborator per `spec.md` §1) and the axum transport adapter
//! ([`AxumRequestPort`]).

pub mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::HeaderMap;

use crate::ports::{BucketMetadataPort, KvReaderPort, KvWriterPort, ObjectWriterPort, RequestPort};

/// The full capability set an action needs, bundled for convenient
/// passing through `crate::action::registry`.
#[derive(Clone)]
pub struct Backends {
    pub kv_reader: Arc<dyn KvReaderPort>,
    pub kv_writer: Arc<dyn KvWriterPort>,
    pub object_writer: Arc<dyn ObjectWriterPort>,
    pub bucket_metadata: Arc<dyn BucketMetadataPort>,
}

impl Backends {
    pub fn memory(backend: &memory::MemoryBackend) -> Self {
        Backends {
            kv_reader: backend.clone_reader(),
            kv_writer: backend.clone_writer(),
            object_writer: backend.clone_object_writer(),
            bucket_metadata: backend.clone_bucket_metadata(),
        }
    }
}

struct SentResponse {
    status: u16,
    body: Bytes,
}

/// [`RequestPort`] over an already-buffered axum request. Production
/// requests reach the handler with the body fully read by axum's
/// extractor (`spec.md` names chunked body transport itself an external
/// collaborator, §1), so `has_full_body` is always true here and
/// `recv_chunk` is never awaited -- it exists to satisfy the trait for
/// verbs that do stream (none currently reach that branch in this
/// binary's routes).
pub struct AxumRequestPort {
    request_id: String,
    resource_uri: String,
    headers: HeaderMap,
    body: Bytes,
    out_headers: Mutex<Vec<(&'static str, String)>>,
    sent: Mutex<Option<SentResponse>>,
}

impl AxumRequestPort {
    pub fn new(request_id: String, resource_uri: String, headers: HeaderMap, body: Bytes) -> Self {
        AxumRequestPort {
            request_id,
            resource_uri,
            headers,
            body,
            out_headers: Mutex::new(Vec::new()),
            sent: Mutex::new(None),
        }
    }

    /// Consume the port after the action has run, returning the staged
    /// response headers plus whatever `send_response` recorded.
    pub fn into_response_parts(self) -> (Vec<(&'static str, String)>, Option<(u16, Bytes)>) {
        let headers = self.out_headers.into_inner().unwrap();
        let sent = self.sent.into_inner().unwrap().map(|r| (r.status, r.body));
        (headers, sent)
    }
}

impl RequestPort for AxumRequestPort {
    fn content_length(&self) -> u64 {
        self.body.len() as u64
    }

    fn has_full_body(&self) -> bool {
        true
    }

    fn full_body_as_bytes(&self) -> Bytes {
        self.body.clone()
    }

    fn recv_chunk(&self) -> Pin<Box<dyn Future<Output = Option<Bytes>> + Send + '_>> {
        Box::pin(async move { None })
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    fn set_out_header(&self, name: &'static str, value: String) {
        self.out_headers.lock().unwrap().push((name, value));
    }

    fn send_response(&self, status: u16, body: Bytes) {
        *self.sent.lock().unwrap() = Some(SentResponse { status, body });
    }

    fn resume(&self) {}

    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn resource_uri(&self) -> &str {
        &self.resource_uri
    }
}
