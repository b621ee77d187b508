//! The request/response transport port.
//!
//! `spec.md` §4.1 describes this port in callback terms
//! (`subscribe_body(on_chunk, expected_length)`, `send_response`, `resume`).
//! The async/await translation keeps every method name and its meaning but
//! turns the "subscribe, then get called back" suspension point into an
//! `await` on [`RequestPort::recv_chunk`] -- the genuine suspension point
//! is still there, it is just driven by the executor instead of a raw
//! function pointer.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Abstract HTTP request/response handle. One instance per action.
///
/// Implementations are expected to hand the action a snapshot of headers
/// and (if already buffered by the HTTP layer) the full body, and to
/// support streaming the remainder of the body chunk by chunk when it
/// has not fully arrived yet.
pub trait RequestPort: Send + Sync {
    /// The `Content-Length` header value, or 0 if absent.
    fn content_length(&self) -> u64;

    /// True once every byte of the body described by `content_length` has
    /// been observed, whether that happened before this port was
    /// constructed or via [`RequestPort::recv_chunk`].
    fn has_full_body(&self) -> bool;

    /// The full body, if [`RequestPort::has_full_body`] is true. Actions
    /// must not call this before checking `has_full_body`.
    fn full_body_as_bytes(&self) -> Bytes;

    /// Await the next chunk of a not-yet-fully-received body. Resolves to
    /// `None` once the transport has delivered `content_length` bytes.
    /// This is the async counterpart of `subscribe_body`'s callback: the
    /// action's "consume body" step awaits this in a loop instead of
    /// registering an `on_chunk` handler.
    fn recv_chunk(&self) -> Pin<Box<dyn Future<Output = Option<Bytes>> + Send + '_>>;

    /// Read a request header by lowercase name.
    fn header(&self, name: &str) -> Option<String>;

    /// Stage a response header to be sent with the terminal response.
    fn set_out_header(&self, name: &'static str, value: String);

    /// Write the terminal HTTP response and consider the connection's
    /// obligation to this request discharged. Called exactly once, by
    /// the Response Emitter (`spec.md` §4.5).
    fn send_response(&self, status: u16, body: Bytes);

    /// Resume the underlying transport (e.g. re-enable reads) after the
    /// response has been queued. A no-op for transports that do not
    /// require it.
    fn resume(&self);

    /// The request ID assigned at connection accept time, used in both
    /// success and error response bodies.
    fn request_id(&self) -> &str;

    /// The resource URI this request targets, used in `<Error><Resource>`.
    fn resource_uri(&self) -> &str;
}
