//! Indexed key-value reader/writer ports.
//!
//! `spec.md` §4.1: `get(index, keys, on_success, on_failure)` with
//! post-completion accessors `state()`/`entries()`. The async translation
//! folds the post-completion accessors into the future's resolved value:
//! there is nothing left to query once the future completes, which is
//! exactly the "success and failure callbacks are mutually exclusive"
//! invariant the port promises, just enforced by the type instead of by
//! discipline.

use super::IndexId;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Ordered mapping from a requested key to its optional value. `None`
/// (equivalently, an empty value on the wire) means the key is absent
/// from the index -- `spec.md` §4.4.1 treats that as deletion-success,
/// not as an error.
#[derive(Debug, Clone, Default)]
pub struct KvEntries(pub Vec<(String, Option<Bytes>)>);

impl KvEntries {
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Bytes>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// Outcome of a KV read. `Missing` means the index itself does not exist
/// (e.g. the bucket's object index was never created) -- distinct from a
/// present index returning an absent key, which shows up as `Ok` with a
/// `None` value for that key.
pub enum KvReadOutcome {
    Ok(KvEntries),
    Missing,
    Failed,
}

/// Read-only access to one index.
pub trait KvReaderPort: Send + Sync {
    fn get<'a>(
        &'a self,
        index: &'a IndexId,
        keys: &'a [String],
    ) -> Pin<Box<dyn Future<Output = KvReadOutcome> + Send + 'a>>;
}

/// Outcome of a KV mutation (put or delete).
pub enum KvWriteOutcome {
    Ok,
    Failed,
}

/// Write access to one index.
pub trait KvWriterPort: Send + Sync {
    fn put<'a>(
        &'a self,
        index: &'a IndexId,
        key: &'a str,
        value: Bytes,
    ) -> Pin<Box<dyn Future<Output = KvWriteOutcome> + Send + 'a>>;

    fn delete<'a>(
        &'a self,
        index: &'a IndexId,
        keys: &'a [String],
    ) -> Pin<Box<dyn Future<Output = KvWriteOutcome> + Send + 'a>>;
}
