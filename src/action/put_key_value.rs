//! `PutKeyValue` (`spec.md` §4.4.2).
//!
//! Grounded on `original_source/server/motr_put_key_value_action.h`: an
//! administrative verb on the key-value subsystem that stores a raw JSON
//! value verbatim under a path-derived key in the bucket's object index.

use std::pin::Pin;

use bytes::Bytes;
use tracing::debug;

use crate::action::queue::{StepOutcome, TaskQueue};
use crate::action::response::{self, TerminalFlags};
use crate::action::{self, Backends};
use crate::metrics;
use crate::ports::{IndexId, KvWriteOutcome, RequestPort};

struct State<'a> {
    request: &'a dyn RequestPort,
    backends: &'a Backends,
    index: IndexId,
    key: String,

    flags: TerminalFlags,
    value: Bytes,
}

/// Entry point invoked by `crate::action::registry`.
pub async fn run(request: &dyn RequestPort, backends: &Backends, bucket: &str, key: String) {
    let mut state = State {
        request,
        backends,
        index: IndexId::for_bucket(bucket),
        key,
        flags: TerminalFlags::default(),
        value: Bytes::new(),
    };

    let mut queue: TaskQueue<State<'_>> = TaskQueue::new();
    queue.enqueue("consume_incoming_content", consume_incoming_content);
    queue.enqueue("read_and_validate_key_value", read_and_validate_key_value);
    queue.enqueue("put_key_value", put_key_value);
    queue.enqueue("send_response", send_response);

    queue.run(&mut state).await;
}

fn consume_incoming_content<'a>(
    state: &'a mut State,
) -> Pin<Box<dyn std::future::Future<Output = StepOutcome> + Send + 'a>> {
    Box::pin(async move {
        state.value = action::body::collect_body(state.request).await;
        StepOutcome::Next
    })
}

fn read_and_validate_key_value<'a>(
    state: &'a mut State,
) -> Pin<Box<dyn std::future::Future<Output = StepOutcome> + Send + 'a>> {
    Box::pin(async move {
        if serde_json::from_slice::<serde_json::Value>(&state.value).is_err() {
            state.flags.invalid_request = true;
            send_response_now(state);
            return StepOutcome::Terminated;
        }
        StepOutcome::Next
    })
}

fn put_key_value<'a>(state: &'a mut State) -> Pin<Box<dyn std::future::Future<Output = StepOutcome> + Send + 'a>> {
    Box::pin(async move {
        let outcome = state
            .backends
            .kv_writer
            .put(&state.index, &state.key, state.value.clone())
            .await;
        metrics::record_backend_call(
            "kv_writer",
            match outcome {
                KvWriteOutcome::Ok => "Ok",
                KvWriteOutcome::Failed => "Failed",
            },
        );
        match outcome {
            KvWriteOutcome::Ok => StepOutcome::Next,
            KvWriteOutcome::Failed => {
                state.flags.backend_failed = true;
                send_response_now(state);
                StepOutcome::Terminated
            }
        }
    })
}

fn send_response<'a>(state: &'a mut State) -> Pin<Box<dyn std::future::Future<Output = StepOutcome> + Send + 'a>> {
    Box::pin(async move {
        send_response_now(state);
        StepOutcome::Terminated
    })
}

fn send_response_now(state: &mut State) {
    let outcome = response::decide(state.flags, None, Bytes::new);
    debug!(key = %state.key, "put-key-value terminal");
    response::emit(state.request, "PutKeyValue", outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{FakeRequest, MemoryBackend};

    fn backends(memory: &MemoryBackend) -> Backends {
        Backends {
            kv_reader: memory.clone_reader(),
            kv_writer: memory.clone_writer(),
            object_writer: memory.clone_object_writer(),
            bucket_metadata: memory.clone_bucket_metadata(),
        }
    }

    #[tokio::test]
    async fn valid_json_is_stored_verbatim() {
        let memory = MemoryBackend::new();
        let body = Bytes::from_static(br#"{"x":1}"#);
        let request = FakeRequest::new("req-1", "/b/k").with_full_body(body.clone());
        let backends = backends(&memory);

        run(&request, &backends, "b", "k".to_string()).await;

        let resp = request.sent_response().expect("response sent");
        assert_eq!(resp.status, 200);
        assert_eq!(memory.raw_index_value("b", "k").unwrap(), body);
    }

    #[tokio::test]
    async fn invalid_json_rejected_without_kv_write() {
        let memory = MemoryBackend::new();
        let body = Bytes::from_static(br#"{"x":"#);
        let request = FakeRequest::new("req-2", "/b/k").with_full_body(body);
        let backends = backends(&memory);

        run(&request, &backends, "b", "k".to_string()).await;

        let resp = request.sent_response().expect("response sent");
        assert_eq!(resp.status, 400);
        assert!(String::from_utf8(resp.body.to_vec())
            .unwrap()
            .contains("MalformedRequest"));
        assert!(memory.raw_index_value("b", "k").is_none());
    }
}
