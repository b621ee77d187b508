//! Metadata record ports: bucket metadata (a backend call) and object
//! metadata (a value decoded from a KV read, not a call of its own).

use super::Oid;
use std::future::Future;
use std::pin::Pin;

/// State of a loaded bucket-metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketMetadataState {
    Present,
    Missing,
    Failed,
}

/// Loads a bucket's metadata record. One call per action that needs it
/// (`fetch_bucket_info` in `spec.md` §4.4.1).
pub trait BucketMetadataPort: Send + Sync {
    fn load<'a>(
        &'a self,
        bucket: &'a str,
    ) -> Pin<Box<dyn Future<Output = BucketMetadataState> + Send + 'a>>;
}

/// State of an in-memory object-metadata record decoded from a KV value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMetadataState {
    Valid,
    Invalid,
}

/// Object metadata record decoded from the bucket's object index.
///
/// Unlike [`BucketMetadataPort`] this is not a backend call: the bytes
/// are already in hand (they came back from a [`crate::ports::KvReaderPort::get`]
/// call), so `from_json` is synchronous. `spec.md` §4.4.1 `delete_objects`
/// decodes one of these per non-empty KV entry in the current window.
#[derive(Debug, Clone)]
pub struct ObjectMetadataRecord {
    object_name: String,
    oid: Oid,
    state: ObjectMetadataState,
}

/// Malformed JSON for a stored object-metadata record.
#[derive(Debug, thiserror::Error)]
#[error("object metadata record is not valid JSON: {0}")]
pub struct ObjectMetadataDecodeError(#[from] serde_json::Error);

#[derive(serde::Deserialize)]
struct Wire {
    object_name: String,
    oid: String,
}

impl ObjectMetadataRecord {
    /// Decode a stored `{"object_name": ..., "oid": "<hex>"}` JSON value.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ObjectMetadataDecodeError> {
        let wire: Wire = serde_json::from_slice(bytes)?;
        let oid = u128::from_str_radix(&wire.oid, 16).unwrap_or(0);
        Ok(ObjectMetadataRecord {
            object_name: wire.object_name,
            oid: Oid(oid),
            state: ObjectMetadataState::Valid,
        })
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn state(&self) -> ObjectMetadataState {
        self.state
    }

    /// Exclude this record from the follow-up metadata delete batch
    /// (`spec.md` §4.4.1 `delete_objects_metadata`): the backing object
    /// delete failed for this key, so its metadata entry must survive.
    pub fn mark_invalid(&mut self) {
        self.state = ObjectMetadataState::Invalid;
    }
}
