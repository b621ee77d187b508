//! The Action State Machine (`spec.md` §4.2-§4.4) and the two verbs it
//! specifies in full.

pub mod body;
pub mod delete_multiple_objects;
pub mod put_key_value;
pub mod queue;
pub mod registry;
pub mod response;

pub use crate::backend::Backends;
