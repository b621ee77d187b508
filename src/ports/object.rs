//! Object writer port: batched object deletion against the backing store.

use super::Oid;
use std::future::Future;
use std::pin::Pin;

/// Per-sub-operation return code from a batched object delete.
///
/// `spec.md` §4.4.1 ties this to a specific "not found" sentinel from the
/// backing store (a Motr `-ENOENT` in the original); we keep it as a
/// distinct variant rather than collapsing it into `Success` so a real
/// backend binding has something concrete to map its sentinel onto
/// (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOpCode {
    Success,
    NotFound,
    Failed(i32),
}

impl ObjectOpCode {
    /// `spec.md` §4.4.1: success (`0`) or `not_found` both count as a
    /// successful deletion from the S3 client's point of view.
    pub fn is_delete_success(self) -> bool {
        matches!(self, ObjectOpCode::Success | ObjectOpCode::NotFound)
    }
}

/// Outcome of a batched object delete. `Ok` carries one [`ObjectOpCode`]
/// per requested OID, positionally aligned with the input slice.
pub enum ObjectDeleteOutcome {
    Ok(Vec<ObjectOpCode>),
    Failed,
}

/// Object data-path writer: only the delete path is in scope for this
/// core (`spec.md` §4.1).
pub trait ObjectWriterPort: Send + Sync {
    fn delete_objects<'a>(
        &'a self,
        oids: &'a [Oid],
    ) -> Pin<Box<dyn Future<Output = ObjectDeleteOutcome> + Send + 'a>>;
}
