pub mod api;
pub mod config;
pub mod state;
pub mod utils;

pub use api::{ApiClient, ApiError, ConfigurationLoader, IdentityApi};
pub use config::ClientConfig;
pub use state::{SessionDeps, SessionError, SessionManager, SessionState, SessionStatus};
