//! Login handshake with optional second factor, and logout

use crate::client::{ExecutionContext, SpeedrunClient};
use crate::codec::NoParams;
use crate::endpoints::{LoginParams, LoginResponse};
use crate::error::SpeedrunError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Where a client stands in the login protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    /// No login attempted, login failed, or logged out
    #[default]
    Unauthenticated,
    /// Credentials accepted, a token was emailed; call `set_token`
    AwaitingSecondFactor,
    /// The server confirmed the login
    Authenticated,
}

impl AuthState {
    /// State implied by a login response
    fn from_login(response: &LoginResponse) -> Self {
        if response.logged_in {
            AuthState::Authenticated
        } else if response.token_challenge_sent {
            AuthState::AwaitingSecondFactor
        } else {
            AuthState::Unauthenticated
        }
    }
}

/// Credentials of the last login, kept only for the second-factor step
struct PendingCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl fmt::Debug for PendingCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
struct AuthSession {
    state: AuthState,
    pending: Option<PendingCredentials>,
}

/// Login state shared by a client and its clones
#[derive(Clone, Debug, Default)]
pub(crate) struct AuthSlot {
    inner: Arc<Mutex<AuthSession>>,
}

impl AuthSlot {
    pub fn new(state: AuthState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuthSession {
                state,
                pending: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> AuthState {
        self.lock().state
    }

    /// Remember credentials for a later `set_token`, replacing older ones
    fn remember(&self, username: &str, password: &str) {
        self.lock().pending = Some(PendingCredentials {
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
        });
    }

    /// Copy of the pending credentials
    fn pending(&self) -> Option<(String, Zeroizing<String>)> {
        self.lock()
            .pending
            .as_ref()
            .map(|p| (p.username.clone(), p.password.clone()))
    }

    /// Apply a login response; credentials are dropped once logged in
    fn complete(&self, response: &LoginResponse) -> AuthState {
        let state = AuthState::from_login(response);
        let mut session = self.lock();
        session.state = state;
        if state == AuthState::Authenticated {
            session.pending = None;
        }
        state
    }

    pub fn reset(&self) {
        let mut session = self.lock();
        session.state = AuthState::Unauthenticated;
        session.pending = None;
    }
}

impl SpeedrunClient {
    /// Current position in the login protocol
    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    /// Log in with a username and password
    ///
    /// Returns [`AuthState::AwaitingSecondFactor`] when the account has
    /// two-factor authentication and a token was emailed. Finish with
    /// [`SpeedrunClient::set_token`]; the password does not need to be given
    /// again.
    ///
    /// # Errors
    ///
    /// * `SpeedrunError::Rejected` - Wrong credentials or other refusal
    /// * `SpeedrunError::Transport` - No response received
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthState, SpeedrunError> {
        self.auth.remember(username, password);

        let params = LoginParams {
            name: username,
            password,
            token: None,
        };
        let response = self.put_auth_login(&params).await?;

        let state = self.auth.complete(&response);
        debug!(?state, "Login answered");
        Ok(state)
    }

    /// Supply the emailed second-factor token for the last login
    ///
    /// # Errors
    ///
    /// * `SpeedrunError::NoPendingLogin` - No `login` happened before, or it already succeeded
    /// * `SpeedrunError::Rejected` - Wrong token or other refusal
    /// * `SpeedrunError::Transport` - No response received
    #[instrument(skip(self, token))]
    pub async fn set_token(&self, token: &str) -> Result<AuthState, SpeedrunError> {
        let (username, password) = self.auth.pending().ok_or(SpeedrunError::NoPendingLogin)?;

        let params = LoginParams {
            name: &username,
            password: &password,
            token: Some(token),
        };
        let response = self.put_auth_login(&params).await?;

        let state = self.auth.complete(&response);
        debug!(?state, "Token answered");
        Ok(state)
    }

    /// End the session
    ///
    /// In a native context the session cookie lives in this client, so it is
    /// dropped locally without a network call. In a browser the cookie jar
    /// belongs to the platform and only the server can clear it, so the logout
    /// endpoint is called.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), SpeedrunError> {
        match self.context {
            ExecutionContext::Browser => {
                self.put_auth_logout(&NoParams::default()).await?;
            }
            ExecutionContext::Native => self.session.clear(),
        }
        self.auth.reset();
        debug!("Logged out");
        Ok(())
    }
}
