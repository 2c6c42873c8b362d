use async_trait::async_trait;

use super::{
    client::ApiClient,
    types::{ApiError, ApplicationConfiguration},
};

/// Source of the global/user configuration snapshot hydrated after login.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigurationLoader: Send + Sync {
    async fn load(&self) -> Result<ApplicationConfiguration, ApiError>;
}

#[async_trait]
impl ConfigurationLoader for ApiClient {
    async fn load(&self) -> Result<ApplicationConfiguration, ApiError> {
        let request = self
            .http_client()
            .get(self.api_url("/api/abp/application-configuration"))
            .headers(self.get_auth_headers()?);
        let response = self.send(request).await?;
        let configuration: ApplicationConfiguration = Self::parse_json(response).await?;
        log::debug!(
            "loaded application configuration (authenticated: {})",
            configuration.current_user.is_authenticated
        );
        Ok(configuration)
    }
}
