use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;

use super::http::ServiceClient;
use crate::config::{load_state, save_state, SessionRecord};
use crate::error::{InvoiceError, Result};

/// Profile key used for signed-out downloads.
pub const GUEST_ID: &str = "guest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Who is acting: passed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Guest,
    Member(User),
}

impl Identity {
    pub fn from_user(user: Option<User>) -> Self {
        user.map(Identity::Member).unwrap_or_default()
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Identity::Member(_))
    }

    /// Key for profile and activity records.
    pub fn user_id(&self) -> &str {
        match self {
            Identity::Guest => GUEST_ID,
            Identity::Member(user) => &user.id,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Guest => None,
            Identity::Member(user) => Some(user),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.user().map(|u| u.email.as_str())
    }
}

pub type IdentityListener = Box<dyn Fn(&Identity)>;

/// Hosted authentication provider.
pub trait IdentityService {
    fn current_user(&self) -> Option<User>;

    fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Returns the new user. When the provider requires email confirmation
    /// no session is started.
    fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User>;

    fn sign_out(&self) -> Result<()>;

    /// Register a callback invoked after every session change.
    fn subscribe(&self, listener: IdentityListener);
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: RemoteUser,
}

#[derive(Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Deserialize, Default)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,
}

impl RemoteUser {
    fn into_user(self, fallback_email: &str) -> User {
        User {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            name: self.user_metadata.name,
        }
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    name: &'a str,
}

/// Identity provider speaking the hosted auth REST API. The session is kept
/// in state.toml so it survives between CLI runs.
pub struct HostedIdentity {
    client: ServiceClient,
    base_url: String,
    config_dir: PathBuf,
    listeners: RefCell<Vec<IdentityListener>>,
}

impl HostedIdentity {
    pub fn new(client: ServiceClient, base_url: impl Into<String>, config_dir: PathBuf) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config_dir,
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn store_session(&self, session: Option<SessionRecord>) -> Result<()> {
        let mut state = load_state(&self.config_dir)?;
        state.session = session;
        save_state(&self.config_dir, &state)
    }

    fn notify(&self, identity: &Identity) {
        for listener in self.listeners.borrow().iter() {
            listener(identity);
        }
    }

    fn start_session(&self, token: TokenResponse, email: &str) -> Result<User> {
        let user = token.user.into_user(email);
        self.store_session(Some(SessionRecord {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: user.clone(),
        }))?;
        tracing::info!(user_id = %user.id, "signed in");
        self.notify(&Identity::Member(user.clone()));
        Ok(user)
    }
}

impl IdentityService for HostedIdentity {
    fn current_user(&self) -> Option<User> {
        match load_state(&self.config_dir) {
            Ok(state) => state.session.map(|s| s.user),
            Err(e) => {
                tracing::warn!(error = %e, "could not read session");
                None
            }
        }
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let reply = self.client.post_json(
            &self.endpoint("token?grant_type=password"),
            &Credentials { email, password },
            None,
        )?;
        if !reply.is_success() {
            return Err(InvoiceError::Auth(reply.error_message()));
        }
        let token: TokenResponse = serde_json::from_slice(&reply.body)
            .map_err(|e| InvoiceError::Auth(format!("unexpected response: {e}")))?;
        self.start_session(token, email)
    }

    fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let body = SignUpBody {
            email,
            password,
            data: SignUpData { name },
        };
        let reply = self.client.post_json(&self.endpoint("signup"), &body, None)?;
        if !reply.is_success() {
            return Err(InvoiceError::Auth(reply.error_message()));
        }

        let json: serde_json::Value = serde_json::from_slice(&reply.body)
            .map_err(|e| InvoiceError::Auth(format!("unexpected response: {e}")))?;
        if json.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(json)
                .map_err(|e| InvoiceError::Auth(format!("unexpected response: {e}")))?;
            return self.start_session(token, email);
        }

        // Confirmation pending: the body is the user itself (or wraps it).
        let raw = json.get("user").cloned().unwrap_or(json);
        let remote: RemoteUser = serde_json::from_value(raw)
            .map_err(|e| InvoiceError::Auth(format!("unexpected response: {e}")))?;
        let mut user = remote.into_user(email);
        if user.name.is_none() && !name.trim().is_empty() {
            user.name = Some(name.trim().to_string());
        }
        tracing::info!(user_id = %user.id, "account created, confirmation pending");
        Ok(user)
    }

    fn sign_out(&self) -> Result<()> {
        let state = load_state(&self.config_dir)?;
        let Some(session) = state.session else {
            return Ok(());
        };

        // The local session is dropped even if the provider call fails; the
        // token simply expires server-side.
        let result = self.client.post_json(
            &self.endpoint("logout"),
            &serde_json::json!({}),
            Some(&session.access_token),
        );
        match result {
            Ok(reply) if reply.is_success() => {}
            Ok(reply) => tracing::warn!(error = %reply.error_message(), "remote sign-out failed"),
            Err(e) => tracing::warn!(error = %e, "remote sign-out failed"),
        }

        self.store_session(None)?;
        tracing::info!(user_id = %session.user.id, "signed out");
        self.notify(&Identity::Guest);
        Ok(())
    }

    fn subscribe(&self, listener: IdentityListener) {
        self.listeners.borrow_mut().push(listener);
    }
}
