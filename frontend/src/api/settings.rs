use super::{
    client::ApiClient,
    types::{ApiError, ListResultDto, Setting, SettingsUpdate},
};

impl ApiClient {
    async fn fetch_settings(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ListResultDto<Setting>, ApiError> {
        let request = self
            .http_client()
            .get(self.api_url(path))
            .headers(self.get_auth_headers()?)
            .query(query);
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }

    /// Settings of one provider, e.g. `("G", "")` for global or `("U", user_id)`.
    pub async fn get_settings(
        &self,
        provider_name: &str,
        provider_key: &str,
    ) -> Result<ListResultDto<Setting>, ApiError> {
        self.fetch_settings(
            "/api/settings",
            &[("providerName", provider_name), ("providerKey", provider_key)],
        )
        .await
    }

    pub async fn get_global_settings(&self) -> Result<ListResultDto<Setting>, ApiError> {
        self.fetch_settings("/api/settings/by-global", &[]).await
    }

    pub async fn get_current_tenant_settings(&self) -> Result<ListResultDto<Setting>, ApiError> {
        self.fetch_settings("/api/settings/by-current-tenant", &[])
            .await
    }

    pub async fn get_current_user_settings(&self) -> Result<ListResultDto<Setting>, ApiError> {
        self.fetch_settings("/api/settings/by-current-user", &[])
            .await
    }

    pub async fn get_user_settings(&self, user_id: &str) -> Result<ListResultDto<Setting>, ApiError> {
        self.fetch_settings("/api/settings/by-user", &[("userId", user_id)])
            .await
    }

    pub async fn set_settings(
        &self,
        provider_name: &str,
        provider_key: &str,
        payload: &SettingsUpdate,
    ) -> Result<(), ApiError> {
        if payload.settings.is_empty() {
            return Err(ApiError::validation("No settings to update"));
        }
        let request = self
            .http_client()
            .put(self.api_url("/api/settings"))
            .headers(self.get_auth_headers()?)
            .query(&[("providerName", provider_name), ("providerKey", provider_key)])
            .json(payload);
        self.send(request).await?;
        log::info!(
            "updated {} setting(s) for provider {}:{}",
            payload.settings.len(),
            provider_name,
            provider_key
        );
        Ok(())
    }
}
