//! Action Registry / Dispatch (`spec.md` §4.6).
//!
//! A small table mapping `(verb, resource pattern)` to an action
//! constructor. `axum` already classifies the resource into bucket vs.
//! object by path template (`crate::server`'s routes); what is left for
//! this module is the query-string sub-resource selector S3 layers on
//! top, exactly the shape `spec.md` §4.6 describes: "parses the URL to
//! classify the resource... constructs the matching action... calls
//! `start()`. If no action matches, the dispatcher itself emits an error
//! response without constructing any action."

use std::collections::HashMap;

use crate::action::{delete_multiple_objects, put_key_value, Backends};
use crate::config::Config;
use crate::errors::GatewayError;
use crate::metrics;
use crate::ports::RequestPort;

/// `POST /{bucket}` sub-resource dispatch. Only `?delete` is wired to an
/// action; anything else falls through to the registry's own
/// `NoSuchAction` response, matching the "no action matches" branch.
pub async fn dispatch_bucket_post(
    request: &dyn RequestPort,
    backends: &Backends,
    config: &Config,
    bucket: &str,
    query: &HashMap<String, String>,
) {
    if query.contains_key("delete") {
        metrics::record_dispatched("DeleteMultipleObjects");
        delete_multiple_objects::run(request, backends, &config.action, bucket.to_string()).await;
        return;
    }
    reject_unmatched(request);
}

/// `PUT /{bucket}/{key}` sub-resource dispatch. Only `?keyval` is wired.
pub async fn dispatch_object_put(
    request: &dyn RequestPort,
    backends: &Backends,
    bucket: &str,
    key: &str,
    query: &HashMap<String, String>,
) {
    if query.contains_key("keyval") {
        metrics::record_dispatched("PutKeyValue");
        put_key_value::run(request, backends, bucket, key.to_string()).await;
        return;
    }
    reject_unmatched(request);
}

fn reject_unmatched(request: &dyn RequestPort) {
    let body = GatewayError::NoSuchAction.render_body(request);
    request.set_out_header("content-type", "application/xml".to_string());
    request.set_out_header("content-length", body.len().to_string());
    request.send_response(GatewayError::NoSuchAction.status_code(), body);
    request.resume();
    metrics::record_completed("Unmatched", GatewayError::NoSuchAction.code());
}
