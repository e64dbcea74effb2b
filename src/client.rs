use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::ClientError;
use crate::protocol::{PrioritizationRequest, PrioritizationResult};

/// HTTP client for the prioritization service
#[derive(Debug, Clone)]
pub struct PrioritizationClient {
    url: String,
    http_client: reqwest::Client,
}

impl PrioritizationClient {
    /// Create a client for the configured service. A zero timeout means
    /// requests wait as long as the service takes.
    pub fn new(service: &ServiceConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if service.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(service.timeout_secs));
        }
        let http_client = builder.build()?;

        Ok(Self {
            url: service.prioritize_url(),
            http_client,
        })
    }

    /// Full URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST requirements and ratings, returning the ranked result.
    pub async fn prioritize(
        &self,
        request: &PrioritizationRequest,
    ) -> Result<PrioritizationResult, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        info!(
            url = %self.url,
            requirements = request.requirements.len(),
            "prioritize_request"
        );

        let response = self
            .http_client
            .post(&self.url)
            .headers(headers)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "prioritize_http_error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "prioritize_response_received");

        let result: PrioritizationResult =
            serde_json::from_str(&body).map_err(ClientError::Decode)?;
        info!(
            prioritized = result.prioritized.len(),
            information_requests = result.information_requests().len(),
            "prioritize_response"
        );
        Ok(result)
    }
}
