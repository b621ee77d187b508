//! In-memory fake backend.
//!
//! Grounded on the teacher's `metadata/memory.rs` and `storage/memory.rs`:
//! an `RwLock<HashMap<..>>` standing in for the real backing store.
//! Doubles as the test harness for `crate::action` (every port trait gets
//! one fake implementation here) and as the crate's runnable
//! out-of-the-box backend -- `spec.md` §9 "dynamic polymorphism over
//! ports": no concrete backend library type appears in `crate::action`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use base64::Engine;
use bytes::Bytes;
use md5::{Digest, Md5};

use crate::ports::{
    BucketMetadataPort, BucketMetadataState, IndexId, KvEntries, KvReadOutcome, KvReaderPort,
    KvWriteOutcome, KvWriterPort, ObjectDeleteOutcome, ObjectOpCode, ObjectWriterPort, Oid,
    RequestPort,
};

#[derive(Default)]
struct Inner {
    buckets: HashMap<String, BucketMetadataState>,
    indexes: HashMap<IndexId, HashMap<String, Bytes>>,
    failing_oids: std::collections::HashSet<u128>,
    not_found_oids: std::collections::HashSet<u128>,
    bucket_load_counts: HashMap<String, usize>,
}

/// A single shared in-memory backend implementing every port trait.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn seed_bucket(&self, bucket: &str) {
        self.inner
            .write()
            .unwrap()
            .buckets
            .insert(bucket.to_string(), BucketMetadataState::Present);
    }

    pub fn seed_bucket_missing(&self, bucket: &str) {
        self.inner
            .write()
            .unwrap()
            .buckets
            .insert(bucket.to_string(), BucketMetadataState::Missing);
    }

    /// Seed one object-metadata record `{"object_name": key, "oid": hex(oid)}`
    /// into the bucket's object index.
    pub fn seed_object(&self, bucket: &str, key: &str, oid: u128) {
        let value = Bytes::from(format!(r#"{{"object_name":"{key}","oid":"{oid:032x}"}}"#));
        let index = IndexId::for_bucket(bucket);
        self.inner
            .write()
            .unwrap()
            .indexes
            .entry(index)
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn fail_object_delete(&self, oid: u128) {
        self.inner.write().unwrap().failing_oids.insert(oid);
    }

    /// Make `oid`'s delete sub-op return the backing store's not-found
    /// sentinel rather than `Success` -- spec.md §8: still reported as a
    /// successful deletion.
    pub fn not_found_object_delete(&self, oid: u128) {
        self.inner.write().unwrap().not_found_oids.insert(oid);
    }

    pub fn index_has_key(&self, bucket: &str, key: &str) -> bool {
        let index = IndexId::for_bucket(bucket);
        self.inner
            .read()
            .unwrap()
            .indexes
            .get(&index)
            .is_some_and(|m| m.contains_key(key))
    }

    pub fn raw_index_value(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let index = IndexId::for_bucket(bucket);
        self.inner
            .read()
            .unwrap()
            .indexes
            .get(&index)
            .and_then(|m| m.get(key))
            .cloned()
    }

    pub fn bucket_metadata_load_count(&self, bucket: &str) -> usize {
        *self
            .inner
            .read()
            .unwrap()
            .bucket_load_counts
            .get(bucket)
            .unwrap_or(&0)
    }

    pub fn clone_reader(&self) -> Arc<dyn KvReaderPort> {
        Arc::new(self.clone())
    }

    pub fn clone_writer(&self) -> Arc<dyn KvWriterPort> {
        Arc::new(self.clone())
    }

    pub fn clone_object_writer(&self) -> Arc<dyn ObjectWriterPort> {
        Arc::new(self.clone())
    }

    pub fn clone_bucket_metadata(&self) -> Arc<dyn BucketMetadataPort> {
        Arc::new(self.clone())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketMetadataPort for MemoryBackend {
    fn load<'a>(
        &'a self,
        bucket: &'a str,
    ) -> Pin<Box<dyn Future<Output = BucketMetadataState> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.write().unwrap();
            *inner.bucket_load_counts.entry(bucket.to_string()).or_insert(0) += 1;
            inner
                .buckets
                .get(bucket)
                .copied()
                .unwrap_or(BucketMetadataState::Missing)
        })
    }
}

impl KvReaderPort for MemoryBackend {
    fn get<'a>(
        &'a self,
        index: &'a IndexId,
        keys: &'a [String],
    ) -> Pin<Box<dyn Future<Output = KvReadOutcome> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.read().unwrap();
            let Some(map) = inner.indexes.get(index) else {
                return KvReadOutcome::Missing;
            };
            let entries = keys
                .iter()
                .map(|k| (k.clone(), map.get(k).cloned()))
                .collect();
            KvReadOutcome::Ok(KvEntries(entries))
        })
    }
}

impl KvWriterPort for MemoryBackend {
    fn put<'a>(
        &'a self,
        index: &'a IndexId,
        key: &'a str,
        value: Bytes,
    ) -> Pin<Box<dyn Future<Output = KvWriteOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.inner
                .write()
                .unwrap()
                .indexes
                .entry(index.clone())
                .or_default()
                .insert(key.to_string(), value);
            KvWriteOutcome::Ok
        })
    }

    fn delete<'a>(
        &'a self,
        index: &'a IndexId,
        keys: &'a [String],
    ) -> Pin<Box<dyn Future<Output = KvWriteOutcome> + Send + 'a>> {
        Box::pin(async move {
            if let Some(map) = self.inner.write().unwrap().indexes.get_mut(index) {
                for key in keys {
                    map.remove(key);
                }
            }
            KvWriteOutcome::Ok
        })
    }
}

impl ObjectWriterPort for MemoryBackend {
    fn delete_objects<'a>(
        &'a self,
        oids: &'a [Oid],
    ) -> Pin<Box<dyn Future<Output = ObjectDeleteOutcome> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.read().unwrap();
            let codes = oids
                .iter()
                .map(|oid| {
                    if inner.failing_oids.contains(&oid.0) {
                        ObjectOpCode::Failed(-5)
                    } else if inner.not_found_oids.contains(&oid.0) {
                        ObjectOpCode::NotFound
                    } else {
                        ObjectOpCode::Success
                    }
                })
                .collect();
            ObjectDeleteOutcome::Ok(codes)
        })
    }
}

// -- Fake request/response transport -----------------------------------------

struct SentResponseInner {
    pub status: u16,
    pub body: Bytes,
}

/// Test double for [`RequestPort`]. Supports both a fully-buffered body
/// and a streamed one (a queue of chunks drained by `recv_chunk`), so
/// `crate::action::body` can be exercised both ways.
pub struct FakeRequest {
    request_id: String,
    resource_uri: String,
    headers: HashMap<String, String>,
    full_body: Option<Bytes>,
    content_length: u64,
    chunks: Mutex<Vec<Bytes>>,
    out_headers: Mutex<Vec<(&'static str, String)>>,
    sent: Mutex<Option<SentResponseInner>>,
}

pub struct SentResponse {
    pub status: u16,
    pub body: Bytes,
}

impl FakeRequest {
    pub fn new(request_id: &str, resource_uri: &str) -> Self {
        FakeRequest {
            request_id: request_id.to_string(),
            resource_uri: resource_uri.to_string(),
            headers: HashMap::new(),
            full_body: None,
            content_length: 0,
            chunks: Mutex::new(Vec::new()),
            out_headers: Mutex::new(Vec::new()),
            sent: Mutex::new(None),
        }
    }

    pub fn with_full_body(mut self, body: Bytes) -> Self {
        self.content_length = body.len() as u64;
        self.full_body = Some(body);
        self
    }

    pub fn with_streamed_body(mut self, chunks: Vec<Bytes>) -> Self {
        self.content_length = chunks.iter().map(|c| c.len() as u64).sum();
        self.chunks = Mutex::new(chunks.into_iter().rev().collect());
        self
    }

    pub fn with_md5_header(mut self, body: &Bytes) -> Self {
        let digest = Md5::digest(body);
        let encoded = base64::engine::general_purpose::STANDARD.encode(digest);
        self.headers.insert("content-md5".to_string(), encoded);
        self
    }

    pub fn sent_response(&self) -> Option<SentResponse> {
        self.sent
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| SentResponse {
                status: r.status,
                body: r.body.clone(),
            })
    }
}

impl RequestPort for FakeRequest {
    fn content_length(&self) -> u64 {
        self.content_length
    }

    fn has_full_body(&self) -> bool {
        self.full_body.is_some() || self.chunks.lock().unwrap().is_empty()
    }

    fn full_body_as_bytes(&self) -> Bytes {
        self.full_body.clone().unwrap_or_default()
    }

    fn recv_chunk(&self) -> Pin<Box<dyn Future<Output = Option<Bytes>> + Send + '_>> {
        Box::pin(async move { self.chunks.lock().unwrap().pop() })
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).cloned()
    }

    fn set_out_header(&self, name: &'static str, value: String) {
        self.out_headers.lock().unwrap().push((name, value));
    }

    fn send_response(&self, status: u16, body: Bytes) {
        *self.sent.lock().unwrap() = Some(SentResponseInner { status, body });
    }

    fn resume(&self) {}

    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn resource_uri(&self) -> &str {
        &self.resource_uri
    }
}
