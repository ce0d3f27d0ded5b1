//! CloudFormation custom resource events and completion callbacks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{Error, Result};

/// Lifecycle operation requested by CloudFormation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Custom resource request as delivered to the Lambda.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_properties: Option<Value>,
    /// Anything else CloudFormation sent (ServiceToken, OldResourceProperties, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome reported back to CloudFormation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Body PUT to the pre-signed response URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Map<String, Value>,
}

impl CustomResourceResponse {
    /// Build the response for `event`, pointing operators at the invocation's log stream.
    pub fn for_event(event: &CustomResourceEvent, status: ResponseStatus, log_stream: &str) -> Self {
        Self {
            status,
            reason: format!("See the details in CloudWatch Log Stream: {}", log_stream),
            physical_resource_id: event
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| log_stream.to_string()),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data: Map::new(),
        }
    }
}

/// Delivers custom resource outcomes to CloudFormation.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(&self, response_url: &str, response: &CustomResourceResponse) -> Result<()>;
}

/// Notifier that PUTs the response to the pre-signed S3 URL.
pub struct HttpCompletionNotifier {
    http: reqwest::Client,
}

impl HttpCompletionNotifier {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Build the PUT carrying `response` to the pre-signed URL.
    pub fn response_request(
        &self,
        response_url: &str,
        response: &CustomResourceResponse,
    ) -> Result<reqwest::Request> {
        let body = serde_json::to_string(response)?;

        // The URL is pre-signed with an empty content type
        Ok(self
            .http
            .put(response_url)
            .header("content-type", "")
            .body(body)
            .build()?)
    }
}

#[async_trait]
impl CompletionNotifier for HttpCompletionNotifier {
    async fn notify(&self, response_url: &str, response: &CustomResourceResponse) -> Result<()> {
        let request = self.response_request(response_url, response)?;
        let result = self.http.execute(request).await?;

        let status = result.status();
        if !status.is_success() {
            let text = result.text().await.unwrap_or_default();
            return Err(Error::Aws(format!(
                "CloudFormation response rejected with {}: {}",
                status, text
            )));
        }

        info!(status = ?response.status, "CloudFormation response sent");
        Ok(())
    }
}
