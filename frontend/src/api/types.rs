use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLoginData {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLoginPhoneData {
    pub phone_number: String,
    pub verify_code: String,
}

/// Token endpoint response shared by every grant the admin client uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// `"<token_type> <access_token>"`, the value sent as `Authorization`.
    pub fn bearer(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&TokenResponse> for TokenPair {
    fn from(response: &TokenResponse) -> Self {
        Self {
            access_token: response.bearer(),
            refresh_token: response.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentUser {
    pub is_authenticated: bool,
    pub id: Option<String>,
    pub tenant_id: Option<String>,
    pub user_name: Option<String>,
    pub name: Option<String>,
    pub sur_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentTenant {
    pub id: Option<String>,
    pub name: Option<String>,
    pub is_available: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrantedPolicies {
    pub granted_policies: HashMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingValues {
    pub values: HashMap<String, Option<String>>,
}

/// Snapshot returned by `/api/abp/application-configuration`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationConfiguration {
    pub current_user: CurrentUser,
    pub current_tenant: CurrentTenant,
    pub auth: GrantedPolicies,
    pub setting: SettingValues,
}

impl ApplicationConfiguration {
    pub fn is_granted(&self, policy: &str) -> bool {
        self.auth
            .granted_policies
            .get(policy)
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListResultDto<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Setting {
    pub name: String,
    pub value: Option<Value>,
    pub display_name: String,
    pub description: Option<String>,
    pub default_value: Option<String>,
}

impl Setting {
    /// Current value, falling back to the default when the value is falsy:
    /// unset, `null`, `false`, zero or an empty string.
    pub fn get_value(&self) -> Option<Value> {
        match &self.value {
            Some(value) if is_truthy(value) => Some(value.clone()),
            _ => self.default_value.clone().map(Value::String),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingUpdate {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub settings: Vec<SettingUpdate>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.settings.push(SettingUpdate {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "VALIDATION_ERROR".to_string(),
            details: None,
        }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "UNKNOWN".to_string(),
            details: None,
        }
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "REQUEST_FAILED".to_string(),
            details: None,
        }
    }
}

/// Error payloads the identity host sends back: OAuth token errors from
/// `/connect/*` and the ABP remote-service envelope from `/api/*`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RemoteErrorBody {
    Abp { error: AbpRemoteError },
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct AbpRemoteError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl From<RemoteErrorBody> for ApiError {
    fn from(body: RemoteErrorBody) -> Self {
        match body {
            RemoteErrorBody::Abp { error } => ApiError {
                error: error
                    .message
                    .unwrap_or_else(|| "Remote service error".to_string()),
                code: error.code.unwrap_or_else(|| "REMOTE_ERROR".to_string()),
                details: error.details.map(Value::String),
            },
            RemoteErrorBody::OAuth {
                error,
                error_description,
            } => ApiError {
                error: error_description.unwrap_or_else(|| error.clone()),
                code: error,
                details: None,
            },
        }
    }
}
