use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use platform_admin_frontend::{
    api::{ApiClient, ListResultDto, Setting, SettingsUpdate},
    config::ClientConfig,
    state::{NoopDependents, SessionDeps, SessionManager},
    utils::storage::{FileStore, KeyValueStore},
};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "platform-admin", version, about = "Platform admin session and settings client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with user name and password
    Login {
        username: String,
        #[arg(long, env = "PLATFORM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with a phone verification code
    PhoneLogin {
        phone_number: String,
        verify_code: String,
    },
    Logout,
    /// Exchange the stored refresh token for a new token pair
    Refresh,
    /// Show the signed-in user
    Whoami,
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Settings of one provider (G, T, U, ...)
    Get {
        provider_name: String,
        #[arg(default_value = "")]
        provider_key: String,
    },
    Global,
    Tenant,
    Me,
    User {
        user_id: String,
    },
    /// Update settings given as NAME=VALUE pairs
    Set {
        provider_name: String,
        provider_key: String,
        #[arg(required = true, value_parser = parse_setting)]
        values: Vec<(String, String)>,
    },
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", raw))
}

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(10).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

fn print_settings(settings: &ListResultDto<Setting>) {
    if settings.items.is_empty() {
        println!("(no settings)");
        return;
    }
    for setting in &settings.items {
        let value = setting
            .get_value()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default();
        println!("{} = {}", setting.name, value);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or("platform_admin_frontend=info,platform_admin=info"),
    )
    .init();

    let cli = Cli::parse();

    let config = ClientConfig::load().context("failed to load client configuration")?;
    log::info!(
        "api: {}, identity: {}, client: {}, secret: {}, storage: {}",
        config.api_base_url(),
        config.auth_base_url(),
        config.client_id,
        mask_secret(&config.client_secret),
        config.storage_path.display()
    );

    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&config.storage_path).context("failed to open session storage")?,
    );
    let client = Arc::new(ApiClient::new(config).with_token_store(store.clone()));
    let session = SessionManager::new(SessionDeps {
        identity: client.clone(),
        configuration: client.clone(),
        store,
        dependents: Arc::new(NoopDependents),
    });

    match cli.command {
        Command::Login { username, password } => {
            session.login(&username, &password).await?;
            println!("Logged in as {}", username);
        }
        Command::PhoneLogin {
            phone_number,
            verify_code,
        } => {
            session.phone_login(&phone_number, &verify_code).await?;
            let state = session.snapshot();
            println!(
                "Logged in as {}",
                state.username.as_deref().unwrap_or(&phone_number)
            );
        }
        Command::Logout => {
            session.logout().await?;
            println!("Logged out");
        }
        Command::Refresh => {
            let bearer = session.refresh_session().await?;
            if bearer.is_empty() {
                println!("No refresh token stored; nothing to refresh");
            } else {
                println!("Session refreshed: {}", mask_secret(&bearer));
            }
        }
        Command::Whoami => {
            if !session.is_authenticated() {
                bail!("not logged in");
            }
            session.post_login_hydration().await?;
            let mut state = session.snapshot();
            state.access_token = mask_secret(&state.access_token);
            state.refresh_token = mask_secret(&state.refresh_token);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Settings(command) => match command {
            SettingsCommand::Get {
                provider_name,
                provider_key,
            } => print_settings(&client.get_settings(&provider_name, &provider_key).await?),
            SettingsCommand::Global => print_settings(&client.get_global_settings().await?),
            SettingsCommand::Tenant => {
                print_settings(&client.get_current_tenant_settings().await?)
            }
            SettingsCommand::Me => print_settings(&client.get_current_user_settings().await?),
            SettingsCommand::User { user_id } => {
                print_settings(&client.get_user_settings(&user_id).await?)
            }
            SettingsCommand::Set {
                provider_name,
                provider_key,
                values,
            } => {
                let mut update = SettingsUpdate::new();
                for (name, value) in values {
                    update.push(name, value);
                }
                client
                    .set_settings(&provider_name, &provider_key, &update)
                    .await?;
                println!("Updated {} setting(s)", update.settings.len());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_setting_splits_on_first_equals() {
        assert_eq!(
            parse_setting("App.Title=a=b").unwrap(),
            ("App.Title".to_string(), "a=b".to_string())
        );
        assert!(parse_setting("novalue").is_err());
        assert!(parse_setting("=x").is_err());
    }

    #[test]
    fn mask_secret_hides_tail() {
        assert_eq!(mask_secret(""), "<empty>");
        assert_eq!(mask_secret("Bearer abcdefgh"), "Bearer abc*** (len=15)");
    }
}
