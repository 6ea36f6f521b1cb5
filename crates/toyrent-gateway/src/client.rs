//! HTTP client for the hosted-checkout gateway

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use toyrent_core::{
    config::GatewayConfig,
    models::{GatewayTransaction, GatewayTransactionRequest, GatewayTransactionStatus},
    traits::PaymentGateway,
    AppError,
};
use tracing::{debug, error, info, instrument};

use crate::types::{SnapTransactionRequest, SnapTransactionResponse, StatusResponse};

/// Gateway client errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: status {0}: {1}")]
    HttpError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Rejected by gateway: {0}")]
    Rejected(String),

    #[error("Unknown transaction status: {0}")]
    UnknownStatus(String),

    #[error("Timeout: request took longer than {0}s")]
    Timeout(u64),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout(secs) => AppError::GatewayTimeout(secs),
            other => AppError::Gateway(other.to_string()),
        }
    }
}

/// Snap-style gateway client
pub struct SnapGatewayClient {
    http_client: Client,
    snap_base_url: String,
    api_base_url: String,
    server_key: String,
    timeout_secs: u64,
}

impl SnapGatewayClient {
    /// Create a client for the configured environment
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        info!(
            "Gateway client configured for {:?} ({})",
            config.environment,
            config.snap_base_url()
        );

        Ok(Self {
            http_client,
            snap_base_url: config.snap_base_url(),
            api_base_url: config.api_base_url(),
            server_key: config.server_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Checkout creation endpoint
    pub fn transactions_url(&self) -> String {
        format!("{}/snap/v1/transactions", self.snap_base_url)
    }

    /// Status endpoint for one order
    pub fn status_url(&self, order_id: &str) -> String {
        format!("{}/v2/{}/status", self.api_base_url, order_id)
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::Connection(e.to_string())
        }
    }

    async fn read_json<R: DeserializeOwned>(&self, response: Response) -> Result<R, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::ParseError(format!("Failed to read response body: {}", e)))?;

        debug!("Gateway response: status={}, body={}", status, body);

        if !status.is_success() {
            error!("Gateway HTTP error: status={}", status);
            return Err(GatewayError::HttpError(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::ParseError(format!("Failed to parse JSON: {} - Body: {}", e, body))
        })
    }

    async fn create_snap(
        &self,
        request: &GatewayTransactionRequest,
    ) -> Result<GatewayTransaction, GatewayError> {
        let payload = SnapTransactionRequest::from_request(request)?;

        let response = self
            .http_client
            .post(self.transactions_url())
            .basic_auth(&self.server_key, Some(""))
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let reply: SnapTransactionResponse = self.read_json(response).await?;

        match (reply.token, reply.redirect_url) {
            (Some(token), Some(redirect_url)) => Ok(GatewayTransaction {
                token,
                redirect_url,
            }),
            _ => Err(GatewayError::Rejected(reply.error_messages.join("; "))),
        }
    }

    async fn fetch_status(&self, order_id: &str) -> Result<GatewayTransactionStatus, GatewayError> {
        let response = self
            .http_client
            .get(self.status_url(order_id))
            .basic_auth(&self.server_key, Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let reply: StatusResponse = self.read_json(response).await?;
        reply.into_status(order_id)
    }
}

#[async_trait]
impl PaymentGateway for SnapGatewayClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_transaction(
        &self,
        request: &GatewayTransactionRequest,
    ) -> Result<GatewayTransaction, AppError> {
        let transaction = self.create_snap(request).await.map_err(|e| {
            error!("Failed to create gateway transaction: {}", e);
            AppError::from(e)
        })?;

        info!("Gateway transaction created");
        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn check_transaction_status(
        &self,
        order_id: &str,
    ) -> Result<GatewayTransactionStatus, AppError> {
        let status = self.fetch_status(order_id).await.map_err(|e| {
            error!("Failed to check transaction status: {}", e);
            AppError::from(e)
        })?;

        debug!("Gateway reports {} for {}", status.transaction_status, order_id);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toyrent_core::config::GatewayEnvironment;

    fn config() -> GatewayConfig {
        GatewayConfig {
            server_key: "SB-Mid-server-test".to_string(),
            environment: GatewayEnvironment::Sandbox,
            snap_url: None,
            api_url: Some("http://127.0.0.1:9/".to_string()),
            timeout_secs: 1,
            expiry_hours: 24,
            strict_callback_verification: false,
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(SnapGatewayClient::new(&config()).is_ok());
    }

    #[test]
    fn test_endpoints() {
        let client = SnapGatewayClient::new(&config()).unwrap();
        assert_eq!(
            client.transactions_url(),
            "https://app.sandbox.midtrans.com/snap/v1/transactions"
        );
        assert_eq!(
            client.status_url("abc-123"),
            "http://127.0.0.1:9/v2/abc-123/status"
        );
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            AppError::from(GatewayError::Timeout(15)),
            AppError::GatewayTimeout(15)
        ));
        assert!(matches!(
            AppError::from(GatewayError::HttpError(401, "unauthorized".to_string())),
            AppError::Gateway(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_an_error() {
        let client = SnapGatewayClient::new(&config()).unwrap();
        let result = client.check_transaction_status("abc-123").await;
        assert!(matches!(
            result,
            Err(AppError::Gateway(_)) | Err(AppError::GatewayTimeout(_))
        ));
    }
}
