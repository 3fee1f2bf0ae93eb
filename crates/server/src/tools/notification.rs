//! sw_push and sw_notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::worker::Worker;

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Plain-text push payload. Omit for an empty push.
    #[serde(default)]
    pub text: Option<String>,
}

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Clicked action ("explore" or "close"). Omit for a click on the body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &Worker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    json_result(&worker.on_push(params.text.as_deref()))
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl(worker: &Worker, params: SwNotificationClickParams) -> Result<CallToolResult, McpError> {
    json_result(&worker.on_notification_click(params.action.as_deref()))
}
