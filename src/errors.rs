//! Gateway error kinds.
//!
//! Every variant maps to one of the S3 error codes named in `spec.md`
//! §4.5/§6. The enum renders its own `<Error>` body so the Response
//! Emitter (`crate::action::response`) and the dispatch-level 404/405
//! fallback in `crate::server` share one rendering path.

use crate::ports::RequestPort;
use crate::xml::render_error;
use bytes::Bytes;
use thiserror::Error;

/// Generate a 16-character hex request ID, matching the shape of the
/// `x-amz-request-id` header real S3 assigns at connection accept time.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    /// Content-MD5 did not match the received body (`spec.md` §4.4.1 `validate_request`).
    #[error("The Content-MD5 you specified did not match what we received.")]
    BadDigest,

    /// Delete-multi batch exceeded the 1000-key cap.
    #[error("Your request was too big.")]
    MaxMessageLengthExceeded,

    /// Body failed to parse against the verb's expected schema.
    #[error("The request was malformed.")]
    MalformedRequest,

    /// The bucket-metadata record came back `missing`.
    #[error("The specified bucket does not exist")]
    NoSuchBucket,

    /// No registered action matches the request's method and resource pattern.
    #[error("The specified method is not allowed against this resource.")]
    NoSuchAction,

    /// Any backend handle reached state `failed`.
    #[error("We encountered an internal error, please try again.")]
    InternalError,
}

impl GatewayError {
    pub fn code(self) -> &'static str {
        match self {
            GatewayError::BadDigest => "BadDigest",
            GatewayError::MaxMessageLengthExceeded => "MaxMessageLengthExceeded",
            GatewayError::MalformedRequest => "MalformedRequest",
            GatewayError::NoSuchBucket => "NoSuchBucket",
            GatewayError::NoSuchAction => "MethodNotAllowed",
            GatewayError::InternalError => "InternalError",
        }
    }

    pub fn status_code(self) -> u16 {
        match self {
            GatewayError::BadDigest => 400,
            GatewayError::MaxMessageLengthExceeded => 400,
            GatewayError::MalformedRequest => 400,
            GatewayError::NoSuchBucket => 404,
            GatewayError::NoSuchAction => 405,
            GatewayError::InternalError => 500,
        }
    }

    /// Render the `<Error>` body, tagging it with the request's own ID
    /// and resource URI (`spec.md` §6: "Error: the standard S3 `<Error>`
    /// document with Code, Message, RequestId, Resource").
    pub fn render_body(self, request: &dyn RequestPort) -> Bytes {
        Bytes::from(render_error(
            self.code(),
            &self.to_string(),
            request.resource_uri(),
            request.request_id(),
        ))
    }
}
