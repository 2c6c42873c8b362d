//! Token exchange against the identity server's `/connect` endpoints.
//!
//! The session state only sees the [`IdentityApi`] trait, so it can be
//! mocked with mockall in tests.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use super::{
    client::ApiClient,
    types::{ApiError, TokenResponse, UserLoginData, UserLoginPhoneData},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Resource-owner password exchange.
    async fn login(&self, data: &UserLoginData) -> Result<TokenResponse, ApiError>;

    /// Phone number + verification code exchange.
    async fn login_with_phone(&self, data: &UserLoginPhoneData)
        -> Result<TokenResponse, ApiError>;

    /// Revokes the refresh token server side.
    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError>;

    async fn refresh_token(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError>;
}

impl ApiClient {
    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, ApiError> {
        let config = self.config();
        let mut form = vec![
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let request = self
            .http_client()
            .post(self.auth_url("/connect/token"))
            .headers(self.tenant_headers()?)
            .form(&form);
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }
}

#[async_trait]
impl IdentityApi for ApiClient {
    async fn login(&self, data: &UserLoginData) -> Result<TokenResponse, ApiError> {
        let scope = self.config().scope.clone();
        self.request_token(&[
            ("grant_type", "password"),
            ("username", data.user_name.as_str()),
            ("password", data.password.as_str()),
            ("scope", scope.as_str()),
        ])
        .await
    }

    async fn login_with_phone(
        &self,
        data: &UserLoginPhoneData,
    ) -> Result<TokenResponse, ApiError> {
        let scope = self.config().scope.clone();
        self.request_token(&[
            ("grant_type", "phone_verify"),
            ("phone_number", data.phone_number.as_str()),
            ("phone_verify_code", data.verify_code.as_str()),
            ("scope", scope.as_str()),
        ])
        .await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let config = self.config();
        let request = self
            .http_client()
            .post(self.auth_url("/connect/revocation"))
            .headers(self.tenant_headers()?)
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("token", refresh_token),
                ("token_type_hint", "refresh_token"),
            ]);
        self.send(request).await?;
        Ok(())
    }

    async fn refresh_token(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        let config = self.config();
        let mut headers = self.tenant_headers()?;
        if !access_token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(access_token)
                    .map_err(|_| ApiError::validation("Invalid token format"))?,
            );
        }
        let request = self
            .http_client()
            .post(self.auth_url("/connect/token"))
            .headers(headers)
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ]);
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }
}
