//! Authentication session: the bearer/refresh token pair plus the identity
//! snapshot of the signed-in user.
//!
//! One [`SessionManager`] is built at startup and shared behind an `Arc`.
//! All collaborators come in through [`SessionDeps`]. State sits behind a
//! short-lived `RwLock` that is never held across an await point.

use log::{debug, info, warn};
use serde::Serialize;
use std::{
    collections::BTreeSet,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    api::{
        ApiError, ApplicationConfiguration, ConfigurationLoader, CurrentUser, IdentityApi, TokenPair, TokenResponse,
        UserLoginData, UserLoginPhoneData,
    },
    state::dependents::DependentStateReset,
    utils::storage::{KeyValueStore, REFRESH_TOKEN_KEY, TOKEN_KEY},
};

pub const LOGOUT_WITHOUT_TOKEN: &str = "LogOut: token is undefined!";
pub const REFRESH_SUPERSEDED: &str = "RefreshSession: session changed while refreshing";
pub const HYDRATION_SUPERSEDED: &str = "PostLogin: session changed while loading configuration";

#[derive(Debug, Error)]
pub enum SessionError {
    /// Credential or transport failure from the identity host, unchanged.
    #[error(transparent)]
    Auth(#[from] ApiError),
    /// Operation not valid for the current session state.
    #[error("{0}")]
    State(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub surname: Option<String>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub roles: BTreeSet<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn set_identity(&mut self, user: &CurrentUser) {
        self.user_id = user.id.clone();
        self.display_name = user.name.clone();
        self.surname = user.sur_name.clone();
        self.username = user.user_name.clone();
        self.phone_number = user.phone_number.clone();
        self.email = user.email.clone();
        self.roles = user.roles.iter().cloned().collect();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    Refreshing,
}

pub struct SessionDeps {
    pub identity: Arc<dyn IdentityApi>,
    pub configuration: Arc<dyn ConfigurationLoader>,
    pub store: Arc<dyn KeyValueStore>,
    pub dependents: Arc<dyn DependentStateReset>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    // Last configuration loaded for this session; dropped on logout.
    configuration: Option<ApplicationConfiguration>,
    // Bumped by every login/logout/reset; a refresh or hydration that started
    // under an older epoch must not write its result.
    epoch: u64,
    refreshing: bool,
}

fn read_inner(lock: &RwLock<Inner>) -> RwLockReadGuard<'_, Inner> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_inner(lock: &RwLock<Inner>) -> RwLockWriteGuard<'_, Inner> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a refresh exchange as in flight until dropped, including when the
/// refresh future itself is dropped mid-exchange.
struct RefreshInFlight<'a> {
    inner: &'a RwLock<Inner>,
}

impl<'a> RefreshInFlight<'a> {
    fn start(inner: &'a RwLock<Inner>) -> Self {
        write_inner(inner).refreshing = true;
        Self { inner }
    }
}

impl Drop for RefreshInFlight<'_> {
    fn drop(&mut self) {
        write_inner(self.inner).refreshing = false;
    }
}

pub struct SessionManager {
    identity: Arc<dyn IdentityApi>,
    configuration: Arc<dyn ConfigurationLoader>,
    store: Arc<dyn KeyValueStore>,
    dependents: Arc<dyn DependentStateReset>,
    inner: RwLock<Inner>,
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    /// Builds the manager and seeds the token pair from the persisted copies.
    pub fn new(deps: SessionDeps) -> Self {
        let state = SessionState {
            access_token: deps.store.get(TOKEN_KEY).unwrap_or_default(),
            refresh_token: deps.store.get(REFRESH_TOKEN_KEY).unwrap_or_default(),
            ..SessionState::default()
        };
        if state.is_authenticated() {
            debug!("restored persisted session token");
        }

        Self {
            identity: deps.identity,
            configuration: deps.configuration,
            store: deps.store,
            dependents: deps.dependents,
            inner: RwLock::new(Inner {
                state,
                ..Inner::default()
            }),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn access_token(&self) -> String {
        read_inner(&self.inner).state.access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        read_inner(&self.inner).state.refresh_token.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        read_inner(&self.inner).state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        read_inner(&self.inner).state.is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        let inner = read_inner(&self.inner);
        if !inner.state.is_authenticated() {
            SessionStatus::Anonymous
        } else if inner.refreshing {
            SessionStatus::Refreshing
        } else {
            SessionStatus::Authenticated
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, SessionError> {
        let data = UserLoginData {
            user_name: username.to_string(),
            password: password.to_string(),
        };
        debug!("password login for {}", username);
        let response = self.identity.login(&data).await?;
        let pair = self.commit_login(&response);
        info!("user {} logged in", username);
        self.post_login_hydration().await?;
        Ok(pair)
    }

    pub async fn phone_login(
        &self,
        phone_number: &str,
        verify_code: &str,
    ) -> Result<TokenPair, SessionError> {
        let data = UserLoginPhoneData {
            phone_number: phone_number.to_string(),
            verify_code: verify_code.to_string(),
        };
        debug!("phone login for {}", phone_number);
        let response = self.identity.login_with_phone(&data).await?;
        let pair = self.commit_login(&response);
        info!("phone {} logged in", phone_number);
        self.post_login_hydration().await?;
        Ok(pair)
    }

    /// Copies `current_user` of a freshly loaded configuration into the session.
    ///
    /// The result is dropped with a `State` error if a login, logout or token
    /// reset happened while the configuration was loading.
    pub async fn post_login_hydration(&self) -> Result<(), SessionError> {
        let epoch = read_inner(&self.inner).epoch;
        let configuration = self.configuration.load().await?;

        let mut inner = write_inner(&self.inner);
        if inner.epoch != epoch {
            warn!("discarding loaded configuration, session changed while loading");
            return Err(SessionError::State(HYDRATION_SUPERSEDED));
        }
        inner.state.set_identity(&configuration.current_user);
        inner.configuration = Some(configuration);
        Ok(())
    }

    /// Re-projects the identity snapshot from the last loaded configuration
    /// without fetching it again. With nothing loaded the snapshot is emptied.
    pub fn refresh_current_user(&self) {
        let mut inner = write_inner(&self.inner);
        let user = inner
            .configuration
            .as_ref()
            .map(|configuration| configuration.current_user.clone())
            .unwrap_or_default();
        inner.state.set_identity(&user);
    }

    pub fn configuration(&self) -> Option<ApplicationConfiguration> {
        read_inner(&self.inner).configuration.clone()
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        let refresh_token = {
            let inner = read_inner(&self.inner);
            if !inner.state.is_authenticated() {
                return Err(SessionError::State(LOGOUT_WITHOUT_TOKEN));
            }
            inner.state.refresh_token.clone()
        };

        if !refresh_token.is_empty() {
            if let Err(e) = self.identity.logout(&refresh_token).await {
                warn!("logout notification failed, clearing local session anyway: {}", e);
            }
        }

        {
            let mut inner = write_inner(&self.inner);
            inner.epoch += 1;
            inner.state = SessionState::default();
            inner.configuration = None;
        }
        self.forget(TOKEN_KEY);
        self.forget(REFRESH_TOKEN_KEY);

        self.dependents.reset_views();
        self.dependents.reset_permissions();
        self.dependents.reset_routes();
        info!("session terminated");
        Ok(())
    }

    /// Drops only the bearer string; the refresh token and identity stay.
    pub fn reset_token(&self) {
        {
            let mut inner = write_inner(&self.inner);
            inner.epoch += 1;
            inner.state.access_token.clear();
        }
        self.forget(TOKEN_KEY);
        debug!("bearer token reset");
    }

    /// Exchanges the refresh token for a new pair and returns the new bearer
    /// string, or `""` when there is nothing to refresh.
    ///
    /// Concurrent calls are serialised; a caller that waited behind a
    /// successful refresh gets that result without a second exchange.
    pub async fn refresh_session(&self) -> Result<String, SessionError> {
        let observed = self.access_token();
        let _gate = self.refresh_gate.lock().await;

        let (access_token, refresh_token, epoch) = {
            let inner = read_inner(&self.inner);
            (
                inner.state.access_token.clone(),
                inner.state.refresh_token.clone(),
                inner.epoch,
            )
        };
        if refresh_token.is_empty() {
            debug!("no refresh token, nothing to refresh");
            return Ok(String::new());
        }
        if access_token != observed && !access_token.is_empty() {
            debug!("session was refreshed while waiting, reusing new token");
            return Ok(access_token);
        }

        let in_flight = RefreshInFlight::start(&self.inner);
        let result = self
            .identity
            .refresh_token(&access_token, &refresh_token)
            .await;
        drop(in_flight);

        let response = result.map_err(|e| {
            warn!("session refresh failed: {}", e);
            e
        })?;
        let pair = TokenPair::from(&response);
        {
            let mut inner = write_inner(&self.inner);
            if inner.epoch != epoch {
                warn!("discarding refresh result, session changed while refreshing");
                return Err(SessionError::State(REFRESH_SUPERSEDED));
            }
            inner.state.access_token = pair.access_token.clone();
            inner.state.refresh_token = pair.refresh_token.clone();
        }
        self.persist_tokens(&pair);
        info!("session refreshed");
        Ok(pair.access_token)
    }

    fn commit_login(&self, response: &TokenResponse) -> TokenPair {
        let pair = TokenPair::from(response);
        {
            let mut inner = write_inner(&self.inner);
            inner.epoch += 1;
            inner.state.access_token = pair.access_token.clone();
            inner.state.refresh_token = pair.refresh_token.clone();
        }
        self.persist_tokens(&pair);
        pair
    }

    // Persisted copies are a cache; failures are logged, not surfaced.
    fn persist_tokens(&self, pair: &TokenPair) {
        for (key, value) in [
            (TOKEN_KEY, &pair.access_token),
            (REFRESH_TOKEN_KEY, &pair.refresh_token),
        ] {
            if let Err(e) = self.store.set(key, value) {
                warn!("failed to persist {}: {}", key, e);
            }
        }
    }

    fn forget(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("failed to remove persisted {}: {}", key, e);
        }
    }
}
