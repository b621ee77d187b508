//! Backend client ports.
//!
//! These traits are the capability set an [`crate::action::Action`]
//! consumes from the outside world: a request/response transport, an
//! indexed key-value reader and writer, an object writer, and a bucket
//! metadata record. No concrete backend type appears anywhere in
//! `crate::action` -- every verb is written against these traits, so a
//! test build can substitute in-memory fakes (see [`crate::backend::memory`])
//! and a production build can substitute a real Motr/Clovis client without
//! touching a single action.
//!
//! Every port method that schedules backend work returns a plain
//! `Pin<Box<dyn Future>>` rather than using `async-trait`, matching the
//! style of a trait object boundary: callers always reach these ports
//! through `Arc<dyn Port>`, never a concrete generic, so there is nothing
//! for an associated-type-returning `async fn` to buy here.

pub mod kv;
pub mod metadata;
pub mod object;
pub mod request;

pub use kv::{KvEntries, KvReaderPort, KvWriterPort};
pub use metadata::{BucketMetadataPort, BucketMetadataState, ObjectMetadataRecord, ObjectMetadataState};
pub use object::{ObjectOpCode, ObjectWriterPort};
pub use request::RequestPort;

/// The backing store's opaque object identifier (a Motr `m0_uint128` analogue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(pub u128);

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// A named key-value namespace in the backing store. Each bucket has one
/// associated object index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexId(pub String);

impl IndexId {
    /// The object index backing a given bucket's key -> object-metadata map.
    pub fn for_bucket(bucket: &str) -> Self {
        IndexId(format!("bucket-object-index/{bucket}"))
    }
}
