use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:30000";
pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub auth_base_url: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub tenant: Option<String>,
    pub storage_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: None,
            client_id: "vue-admin-element".to_string(),
            client_secret: "1q2w3e*".to_string(),
            scope: "openid offline_access".to_string(),
            tenant: None,
            storage_path: PathBuf::from(".platform-admin/storage.json"),
        }
    }
}

/// Shape of the optional JSON settings file. Sections mirror the host's
/// `appsettings.json` so one file can serve both sides.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SettingsFile {
    remote_services: RemoteServices,
    auth_server: AuthServer,
    tenant: Option<String>,
    storage: StorageSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RemoteServices {
    default: Option<RemoteService>,
    identity: Option<RemoteService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RemoteService {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AuthServer {
    client_id: Option<String>,
    client_secret: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct StorageSection {
    path: Option<PathBuf>,
}

impl ClientConfig {
    /// Defaults, then the JSON settings file (if present), then environment
    /// variables (including a `.env` file).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = env::var("PLATFORM_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if file.exists() {
            Self::from_file(&file)?
        } else {
            Self::default()
        };
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SettingsFile =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::default();
        if let Some(url) = file.remote_services.default.and_then(|s| s.base_url) {
            config.api_base_url = url;
        }
        config.auth_base_url = file.remote_services.identity.and_then(|s| s.base_url);
        if let Some(client_id) = file.auth_server.client_id {
            config.client_id = client_id;
        }
        if let Some(secret) = file.auth_server.client_secret {
            config.client_secret = secret;
        }
        if let Some(scope) = file.auth_server.scope {
            config.scope = scope;
        }
        config.tenant = file.tenant;
        if let Some(path) = file.storage.path {
            config.storage_path = path;
        }
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PLATFORM_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = lookup("PLATFORM_AUTH_BASE_URL") {
            self.auth_base_url = Some(url);
        }
        if let Some(client_id) = lookup("PLATFORM_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Some(secret) = lookup("PLATFORM_CLIENT_SECRET") {
            self.client_secret = secret;
        }
        if let Some(scope) = lookup("PLATFORM_SCOPE") {
            self.scope = scope;
        }
        if let Some(tenant) = lookup("PLATFORM_TENANT") {
            self.tenant = Some(tenant).filter(|t| !t.trim().is_empty());
        }
        if let Some(path) = lookup("PLATFORM_STORAGE_PATH") {
            self.storage_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Empty("api_base_url"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Empty("client_id"));
        }
        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Identity server root; the API host doubles as one when unset.
    pub fn auth_base_url(&self) -> &str {
        self.auth_base_url
            .as_deref()
            .unwrap_or(&self.api_base_url)
            .trim_end_matches('/')
    }
}
