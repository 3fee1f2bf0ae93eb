//! Page companion tools: permission, notifications, network status, updates
//! and app data.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;
use crate::page::{Permission, PwaTools, UpdateDecision};
use crate::worker::Notification;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageSetPermissionParams {
    /// "granted", "denied" or "default".
    pub permission: Permission,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageSendNotificationParams {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Notifications sharing a tag replace each other.
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageNetworkStatusParams {
    /// True when the page came online, false when it went offline.
    pub online: bool,
}

/// Notification result shared by the notification-producing page tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageNotificationOutput {
    /// Absent when notifications are disabled or not permitted.
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageUpdateOutput {
    pub decision: UpdateDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageClearDataOutput {
    pub success: bool,
}

pub async fn set_permission_impl(
    page: &PwaTools, params: PageSetPermissionParams,
) -> Result<CallToolResult, McpError> {
    page.set_permission(params.permission).await?;
    json_result(&page.config().await.notifications)
}

pub async fn send_notification_impl(
    page: &PwaTools, params: PageSendNotificationParams,
) -> Result<CallToolResult, McpError> {
    if params.title.trim().is_empty() {
        return Err(ToolError::InvalidInput("title cannot be empty".into()).into());
    }

    let notification = page
        .send_notification(&params.title, &params.body, params.tag.as_deref())
        .await?;
    json_result(&PageNotificationOutput { notification })
}

pub async fn network_status_impl(
    page: &PwaTools, params: PageNetworkStatusParams,
) -> Result<CallToolResult, McpError> {
    let notification = page.network_status_changed(params.online).await?;
    json_result(&PageNotificationOutput { notification })
}

pub async fn update_available_impl(page: &PwaTools) -> Result<CallToolResult, McpError> {
    let decision = page.update_available().await?;
    json_result(&PageUpdateOutput { decision })
}

pub async fn clear_data_impl(page: &PwaTools) -> Result<CallToolResult, McpError> {
    let success = page.clear_app_data().await?;
    json_result(&PageClearDataOutput { success })
}
