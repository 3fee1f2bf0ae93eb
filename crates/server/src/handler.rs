//! MCP server handler implementation.
//!
//! Every tool call is one event delivered to the worker or the page
//! companion. Both are shared, so concurrent calls see the same cache and
//! lifecycle state.

use std::sync::Arc;

use crate::page::PwaTools;
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};
use crate::tools::message::{SwMessageParams, message_impl};
use crate::tools::notification::{SwNotificationClickParams, SwPushParams, click_impl, push_impl};
use crate::tools::page::{
    PageNetworkStatusParams, PageSendNotificationParams, PageSetPermissionParams, clear_data_impl,
    network_status_impl, send_notification_impl, set_permission_impl, update_available_impl,
};
use crate::tools::sync::{SwSyncParams, sync_impl};
use crate::worker::Worker;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for offline-proxy.
#[derive(Clone)]
pub struct OfflineProxyServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
    page: Arc<PwaTools>,
}

#[tool_router]
impl OfflineProxyServer {
    pub fn new(worker: Arc<Worker>, page: Arc<PwaTools>) -> Self {
        Self { tool_router: Self::tool_router(), worker, page }
    }

    #[tool(
        description = "Install the worker: cache every manifest URL into the current bucket. Activates immediately when skip-waiting is set. Reports cached and failed URLs."
    )]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate an installed worker: delete every cache bucket except the current one and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Route one request through the interceptor.
    ///
    /// Same-origin GETs are answered cache-first; a network miss is stored,
    /// and a network failure falls back to the offline or root page.
    #[tool(
        description = "Fetch a URL through the offline worker. Same-origin GET requests are served cache-first with network fallback; failures return the offline page for documents and the root page otherwise."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Post a control message to the worker. Supported types: SKIP_WAITING, GET_VERSION (replies with the cache name), CLEAR_CACHE (replies with success)."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Returns the notification the worker would show.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Deliver a notification click. 'close' dismisses; 'explore' or a body click opens the application root."
    )]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a background sync event. Only the 'background-sync' tag is acted on.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Record the notification permission granted by the user (granted, denied or default).")]
    async fn page_set_permission(
        &self, params: Parameters<PageSetPermissionParams>,
    ) -> Result<CallToolResult, McpError> {
        set_permission_impl(&self.page, params.0).await
    }

    #[tool(description = "Build a page notification if notifications are enabled and permitted.")]
    async fn page_send_notification(
        &self, params: Parameters<PageSendNotificationParams>,
    ) -> Result<CallToolResult, McpError> {
        send_notification_impl(&self.page, params.0).await
    }

    #[tool(description = "Report a page network status change. Coming back online yields a 'network restored' notification.")]
    async fn page_network_status(
        &self, params: Parameters<PageNetworkStatusParams>,
    ) -> Result<CallToolResult, McpError> {
        network_status_impl(&self.page, params.0).await
    }

    #[tool(description = "Announce that a new version is available. Returns prompt, reload or ignore per the update policy.")]
    async fn page_update_available(&self) -> Result<CallToolResult, McpError> {
        update_available_impl(&self.page).await
    }

    #[tool(description = "Clear all application data: delete every cache bucket.")]
    async fn page_clear_data(&self) -> Result<CallToolResult, McpError> {
        clear_data_impl(&self.page).await
    }
}

impl ServerHandler for OfflineProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offline-proxy".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
