//! Response Emitter (`spec.md` §4.5).
//!
//! Every verb funnels into [`decide`] to pick the terminal outcome by the
//! fixed priority ladder, then [`emit`] to actually write it. Splitting
//! the two means a verb's terminal step can log or test the decision
//! before anything touches the transport.

use crate::errors::GatewayError;
use crate::metrics;
use crate::ports::{BucketMetadataState, RequestPort};
use bytes::Bytes;

/// Pre-flight and backend-outcome flags accumulated while a verb's steps
/// ran. Mirrors the per-verb state fragments in `spec.md` §3.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalFlags {
    pub content_corrupt: bool,
    pub too_large: bool,
    pub invalid_request: bool,
    pub backend_failed: bool,
}

impl TerminalFlags {
    pub fn is_pre_flight_error(&self) -> bool {
        self.content_corrupt || self.too_large || self.invalid_request
    }
}

/// What the Response Emitter decided to send.
pub enum Outcome {
    Error(GatewayError),
    Success { body: Bytes },
}

/// `spec.md` §4.5 priority ladder: content-corrupt, too-large,
/// invalid-request, bucket-missing, any-backend-failed, else success.
/// `bucket` is `None` for verbs that never need the bucket's metadata
/// record loaded (none currently; kept for verbs added later).
pub fn decide(
    flags: TerminalFlags,
    bucket: Option<BucketMetadataState>,
    success_body: impl FnOnce() -> Bytes,
) -> Outcome {
    if flags.content_corrupt {
        return Outcome::Error(GatewayError::BadDigest);
    }
    if flags.too_large {
        return Outcome::Error(GatewayError::MaxMessageLengthExceeded);
    }
    if flags.invalid_request {
        return Outcome::Error(GatewayError::MalformedRequest);
    }
    if matches!(bucket, Some(BucketMetadataState::Missing)) {
        return Outcome::Error(GatewayError::NoSuchBucket);
    }
    if flags.backend_failed || matches!(bucket, Some(BucketMetadataState::Failed)) {
        return Outcome::Error(GatewayError::InternalError);
    }
    Outcome::Success {
        body: success_body(),
    }
}

/// Write the decided outcome to the transport and resume it. `spec.md`
/// §4.5: `Content-Type: application/xml`, `Content-Length` set to the
/// body's byte length, transmit, resume -- `done()` is the caller's
/// responsibility, since it is the task queue's state, not the
/// emitter's. `verb` labels the completion metric (`SPEC_FULL.md` §2.4).
pub fn emit(request: &dyn RequestPort, verb: &'static str, outcome: Outcome) {
    let (status, body, metric_outcome) = match &outcome {
        Outcome::Error(err) => (err.status_code(), err.render_body(request), err.code()),
        Outcome::Success { body } => (200, body.clone(), "Success"),
    };

    request.set_out_header("content-type", "application/xml".to_string());
    request.set_out_header("content-length", body.len().to_string());
    request.send_response(status, body);
    request.resume();
    metrics::record_completed(verb, metric_outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_corrupt_wins_over_everything_else() {
        let flags = TerminalFlags {
            content_corrupt: true,
            too_large: true,
            invalid_request: true,
            backend_failed: true,
        };
        let outcome = decide(flags, Some(BucketMetadataState::Missing), || {
            Bytes::from_static(b"<ok/>")
        });
        assert!(matches!(outcome, Outcome::Error(GatewayError::BadDigest)));
    }

    #[test]
    fn bucket_missing_beats_backend_failed() {
        let outcome = decide(
            TerminalFlags::default(),
            Some(BucketMetadataState::Missing),
            || Bytes::new(),
        );
        assert!(matches!(
            outcome,
            Outcome::Error(GatewayError::NoSuchBucket)
        ));
    }

    #[test]
    fn success_when_nothing_failed() {
        let outcome = decide(TerminalFlags::default(), Some(BucketMetadataState::Present), || {
            Bytes::from_static(b"<ok/>")
        });
        assert!(matches!(outcome, Outcome::Success { .. }));
    }
}
