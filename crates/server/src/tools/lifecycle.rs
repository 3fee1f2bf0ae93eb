//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::*};

use super::json_result;
use crate::worker::Worker;

/// Install the worker, activating straight away when skip-waiting is set.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.start().await?;
    json_result(&report)
}

/// Activate the worker, retiring every older bucket.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}
