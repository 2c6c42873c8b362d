use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::{
    api::types::{ApiError, RemoteErrorBody},
    config::ClientConfig,
    utils::storage::{KeyValueStore, TOKEN_KEY},
};

const TENANT_HEADER: &str = "__tenant";

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Arc<ClientConfig>,
    token_store: Option<Arc<dyn KeyValueStore>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
            token_store: None,
        }
    }

    /// Authenticated calls read the bearer string from `store` on every request.
    pub fn with_token_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url(), path)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}{}", self.config.auth_base_url(), path)
    }

    pub(crate) fn tenant_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(tenant) = &self.config.tenant {
            headers.insert(
                TENANT_HEADER,
                HeaderValue::from_str(tenant)
                    .map_err(|_| ApiError::validation("Invalid tenant name"))?,
            );
        }
        Ok(headers)
    }

    pub(crate) fn get_auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = self.tenant_headers()?;
        let token = self
            .token_store
            .as_ref()
            .and_then(|store| store.get(TOKEN_KEY))
            .filter(|token| !token.is_empty());
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&token)
                    .map_err(|_| ApiError::validation("Invalid token format"))?,
            );
        }
        Ok(headers)
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::request_failed(format!("Request failed: {}", e)))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            if status == StatusCode::UNAUTHORIZED {
                log::warn!("request to {} was rejected as unauthorized", response.url());
            }
            Err(Self::error_from_response(response).await)
        }
    }

    pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))
    }

    async fn error_from_response(response: Response) -> ApiError {
        let status = response.status();
        match response.json::<RemoteErrorBody>().await {
            Ok(body) => body.into(),
            Err(_) => ApiError::request_failed(format!("Request failed with status {}", status)),
        }
    }
}
