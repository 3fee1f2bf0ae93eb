//! sw_message tool implementation.
//!
//! Accepts the same JSON payloads a page would post to the worker.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::worker::{ControlMessage, MessageReply, Worker};

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message payload, e.g. `{"type": "GET_VERSION"}`.
    pub message: serde_json::Value,
}

/// Output structure for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// False when the message type was not recognised.
    pub handled: bool,
    /// Reply posted back to the page, if the message has one.
    pub reply: Option<MessageReply>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let Some(message) = ControlMessage::from_value(&params.message) else {
        tracing::debug!(payload = %params.message, "ignoring unrecognised message");
        return json_result(&SwMessageOutput { handled: false, reply: None });
    };

    let reply = worker.handle_message(message).await?;
    json_result(&SwMessageOutput { handled: true, reply })
}
