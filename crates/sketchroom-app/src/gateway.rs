//! HTTP persistence gateway.

use reqwest::header::CONTENT_TYPE;
use sketchroom_core::persistence::{BoxFuture, PersistenceResult};
use sketchroom_core::{PersistenceError, PersistenceGateway, SaveRequest};

/// Posts artwork as JSON to `{base_url}/visualart`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/visualart", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PersistenceGateway for HttpGateway {
    fn save(&self, request: SaveRequest) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            let body = serde_json::to_vec(&request)
                .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

            let response = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| PersistenceError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PersistenceError::Rejected {
                    status: status.as_u16(),
                });
            }
            log::debug!("POST {} -> {}", self.endpoint, status);
            Ok(())
        })
    }
}
