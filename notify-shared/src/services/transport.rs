use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::Method;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::models::errors::ConfigError;
use crate::models::notifications::FetchOptions;
use crate::utilities::config::SyncConfig;
use crate::utilities::requests::bearer_header;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError(format!("request timed out: {}", err))
        } else {
            TransportError(err.to_string())
        }
    }
}

/// Interface to the identity and notification services.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn fetch_token(&self) -> Result<TransportResponse, TransportError>;

    async fn get_notifications(
        &self,
        token: &str,
        options: &FetchOptions,
    ) -> Result<TransportResponse, TransportError>;

    async fn send_action(
        &self,
        method: &Method,
        url: &Url,
        token: &str,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed implementation
pub struct HttpTransport {
    client: Client,
    user_info_url: Url,
    notification_api_url: Url,
}

impl HttpTransport {
    pub fn new(config: &SyncConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &SyncConfig) -> Self {
        Self {
            client,
            user_info_url: config.user_info_url.clone(),
            notification_api_url: config.notification_api_url.clone(),
        }
    }

    async fn into_response(res: reqwest::Response) -> Result<TransportResponse, TransportError> {
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl NotificationTransport for HttpTransport {
    async fn fetch_token(&self) -> Result<TransportResponse, TransportError> {
        let res = self.client.get(self.user_info_url.clone()).send().await?;
        Self::into_response(res).await
    }

    async fn get_notifications(
        &self,
        token: &str,
        options: &FetchOptions,
    ) -> Result<TransportResponse, TransportError> {
        let res = self
            .client
            .get(self.notification_api_url.clone())
            .header(AUTHORIZATION, bearer_header(token))
            .query(&options.query_pairs())
            .send()
            .await?;

        Self::into_response(res).await
    }

    async fn send_action(
        &self,
        method: &Method,
        url: &Url,
        token: &str,
    ) -> Result<TransportResponse, TransportError> {
        let res = self
            .client
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, bearer_header(token))
            .send()
            .await?;

        Self::into_response(res).await
    }
}
