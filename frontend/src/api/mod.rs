mod auth;
pub mod client;
mod configuration;
mod settings;
pub mod types;

pub use auth::IdentityApi;
pub use client::*;
pub use configuration::ConfigurationLoader;
pub use types::*;

#[cfg(test)]
pub(crate) use auth::MockIdentityApi;
#[cfg(test)]
pub(crate) use configuration::MockConfigurationLoader;

#[cfg(all(test, not(coverage)))]
mod tests;
