//! sw_fetch tool implementation.
//!
//! Delivers one request to the worker's interceptor and reports how it was
//! answered.

use offline_client::{FetchResponse, Method};
use offline_core::{CachedResponse, ResponseType};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;
use crate::worker::intercept::PassThroughReason;
use crate::worker::{Destination, FetchOutcome, InterceptRequest, Worker};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the application root.
    pub url: String,

    /// HTTP method (default: GET). Anything else passes through uncached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination, e.g. "document" for a navigation (default: empty).
    #[serde(default)]
    pub destination: Destination,
}

fn default_method() -> String {
    "GET".into()
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Fallback,
    Passthrough,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub source: Source,
    /// Canonical request URL.
    pub url: String,
    /// HTTP status; absent when a fallback page was not cached.
    pub status: Option<u16>,
    pub response_type: Option<ResponseType>,
    pub content_type: Option<String>,
    /// Whether a network response was written to the cache.
    pub stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough_reason: Option<PassThroughReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_page: Option<String>,
    /// Network error behind a fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
}

impl SwFetchOutput {
    fn empty(source: Source, url: String) -> Self {
        Self {
            source,
            url,
            status: None,
            response_type: None,
            content_type: None,
            stored: false,
            passthrough_reason: None,
            fallback_page: None,
            error: None,
            body: None,
        }
    }

    fn with_cached(mut self, cached: &CachedResponse) -> Self {
        self.status = Some(cached.status);
        self.response_type = Some(cached.response_type);
        self.content_type = cached.content_type().map(str::to_string);
        self.body = Some(String::from_utf8_lossy(&cached.body).into_owned());
        self
    }

    fn with_fetched(mut self, response: &FetchResponse) -> Self {
        self.status = Some(response.status.as_u16());
        self.response_type = Some(response.response_type);
        self.content_type = response.content_type().map(str::to_string);
        self.body = Some(String::from_utf8_lossy(&response.bytes).into_owned());
        self
    }

    fn from_outcome(url: String, outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Cache(cached) => Self::empty(Source::Cache, url).with_cached(&cached),
            FetchOutcome::Fallback { page, response, error } => {
                let mut output = Self::empty(Source::Fallback, url);
                if let Some(cached) = &response {
                    output = output.with_cached(cached);
                }
                output.fallback_page = Some(page);
                output.error = Some(error);
                output
            }
            FetchOutcome::Network { response, stored } => {
                let mut output = Self::empty(Source::Network, url).with_fetched(&response);
                output.stored = stored;
                output
            }
            FetchOutcome::PassThrough { reason, response } => {
                let mut output = Self::empty(Source::Passthrough, url).with_fetched(&response);
                output.passthrough_reason = Some(reason);
                output
            }
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = worker
        .origin()
        .resolve(&params.url)
        .map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let method = Method::from_bytes(params.method.trim().to_uppercase().as_bytes())
        .map_err(|e| ToolError::InvalidInput(format!("invalid method {:?}: {}", params.method, e)))?;

    let request = InterceptRequest { method, url, destination: params.destination };
    let key = request.url.to_string();
    let outcome = worker.handle_fetch(request).await?;

    json_result(&SwFetchOutput::from_outcome(key, outcome))
}
