//! Request Body Aggregator (`spec.md` §4.3).
//!
//! When the transport has not yet delivered the full body at dispatch
//! time, a verb's "consume body" step awaits [`RequestPort::recv_chunk`]
//! in a loop instead of registering an `on_chunk` callback and returning.
//! If the body is already fully buffered, [`collect_body`] returns
//! immediately without ever awaiting -- matching the "validator runs
//! synchronously, `next()` called in-line" branch of §4.3.

use crate::ports::RequestPort;
use bytes::{Bytes, BytesMut};

/// Collect the whole request body, suspending on [`RequestPort::recv_chunk`]
/// for whatever has not already arrived.
pub async fn collect_body(request: &dyn RequestPort) -> Bytes {
    if request.has_full_body() {
        return request.full_body_as_bytes();
    }

    let mut buf = BytesMut::with_capacity(request.content_length() as usize);
    while let Some(chunk) = request.recv_chunk().await {
        buf.extend_from_slice(&chunk);
        if request.has_full_body() {
            break;
        }
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::FakeRequest;

    #[tokio::test]
    async fn returns_immediately_when_body_already_buffered() {
        let req = FakeRequest::new("req-1", "/b/k").with_full_body(Bytes::from_static(b"hello"));
        let body = collect_body(&req).await;
        assert_eq!(body, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn drains_streamed_chunks_until_full() {
        let req = FakeRequest::new("req-2", "/b/k")
            .with_streamed_body(vec![Bytes::from_static(b"he"), Bytes::from_static(b"llo")]);
        let body = collect_body(&req).await;
        assert_eq!(body, Bytes::from_static(b"hello"));
    }
}
