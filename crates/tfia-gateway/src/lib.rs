//! HTTP surface of the action server: dialogue-engine webhook, action
//! listing, test-result uploads and health.
pub mod action_server;

pub use action_server::*;
