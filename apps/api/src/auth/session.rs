//! Login, logout and the per-request session context.
//!
//! A session is an opaque token handed out at login. The token scopes a small
//! set of flags in the [`FlagStore`]; the session counts as logged in only while
//! its `authenticated` flag holds [`AUTHENTICATED_SENTINEL`] byte for byte.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::credentials::CredentialStore;
use crate::auth::flags::FlagStore;
use crate::auth::throttle::LoginThrottle;
use crate::auth::{AuthError, DEMO_DISPLAY_NAME, DEMO_PASSWORD, DEMO_USERNAME};
use crate::config::Config;
use crate::crypto::{digest, digests_match, CryptoHelper};

pub const AUTHENTICATED_SENTINEL: &str = "authenticated";

const FLAG_AUTHENTICATED: &str = "authenticated";
const FLAG_SUBJECT: &str = "subject";
const FLAG_THEME: &str = "theme";
const FLAG_ACTIVE_TAB: &str = "active_tab";

fn flag_key(token: Uuid, name: &str) -> String {
    format!("session:{token}:{name}")
}

fn all_flag_keys(token: Uuid) -> Vec<String> {
    [FLAG_AUTHENTICATED, FLAG_SUBJECT, FLAG_THEME, FLAG_ACTIVE_TAB]
        .iter()
        .map(|name| flag_key(token, name))
        .collect()
}

/// `LoggedOut -> Authenticating -> LoggedIn -> LoggedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub authenticated: bool,
    pub subject_name: Option<String>,
}

/// What the flag store says about one request's token. Built fresh for each
/// request and handed to the route guard.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    token: Option<Uuid>,
    flag: Option<String>,
    subject_name: Option<String>,
}

impl SessionContext {
    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn new(token: Uuid, flag: Option<String>, subject_name: Option<String>) -> Self {
        Self {
            token: Some(token),
            flag,
            subject_name,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.flag.as_deref() == Some(AUTHENTICATED_SENTINEL)
    }

    pub fn token(&self) -> Option<Uuid> {
        self.token.filter(|_| self.is_authenticated())
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }

    pub fn session(&self) -> Session {
        let authenticated = self.is_authenticated();
        Session {
            authenticated,
            subject_name: if authenticated {
                self.subject_name.clone()
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: Uuid,
    pub state: SessionState,
    pub session: Session,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Preferences {
    pub theme: Theme,
    pub active_tab: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub demo_login_enabled: bool,
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ttl: config.session_ttl,
            demo_login_enabled: config.demo_login_enabled,
            max_attempts: config.login_max_attempts,
            lockout: config.login_lockout,
        }
    }
}

pub struct SessionManager {
    credentials: Arc<dyn CredentialStore>,
    flags: Arc<dyn FlagStore>,
    crypto: Arc<CryptoHelper>,
    throttle: LoginThrottle,
    ttl: Duration,
    demo_login_enabled: bool,
}

impl SessionManager {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        flags: Arc<dyn FlagStore>,
        crypto: Arc<CryptoHelper>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            credentials,
            flags,
            crypto,
            throttle: LoginThrottle::new(settings.max_attempts, settings.lockout),
            ttl: settings.ttl,
            demo_login_enabled: settings.demo_login_enabled,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        // Only usernames that can log in are counted, so the map stays bounded.
        let tracked = self.can_log_in(&username);
        if tracked {
            if let Err(retry_after) = self.throttle.try_acquire(&username) {
                warn!("Login rejected: too many failed attempts");
                return Err(AuthError::TooManyAttempts { retry_after });
            }
        }

        debug!(state = ?SessionState::Authenticating, "Verifying credentials");
        let Some(subject_name) = self.verify(&username, password).await? else {
            warn!("Login failed");
            return Err(AuthError::InvalidCredentials);
        };
        if tracked {
            self.throttle.reset(&username);
        }

        let token = Uuid::new_v4();
        self.flags
            .set(&flag_key(token, FLAG_AUTHENTICATED), AUTHENTICATED_SENTINEL, self.ttl)
            .await?;
        self.flags
            .set(&flag_key(token, FLAG_SUBJECT), &subject_name, self.ttl)
            .await?;

        info!("Login succeeded");
        Ok(LoginOutcome {
            token,
            state: SessionState::LoggedIn,
            session: Session {
                authenticated: true,
                subject_name: Some(subject_name),
            },
        })
    }

    fn can_log_in(&self, username: &str) -> bool {
        (self.demo_login_enabled && username == DEMO_USERNAME) || self.credentials.accepts(username)
    }

    /// Returns the display name when the pair is valid.
    async fn verify(&self, username: &str, password: &str) -> Result<Option<String>, AuthError> {
        let offered = digest(password);

        if self.demo_login_enabled && username == DEMO_USERNAME {
            let valid = digests_match(&offered, &digest(DEMO_PASSWORD));
            return Ok(valid.then(|| DEMO_DISPLAY_NAME.to_string()));
        }

        let Some(record) = self.credentials.find(username).await? else {
            return Ok(None);
        };
        let Some(stored) = self.crypto.decrypt_string(&record.password_digest_encrypted) else {
            warn!("Stored password digest could not be decrypted");
            return Ok(None);
        };
        if !digests_match(&offered, stored.trim()) {
            return Ok(None);
        }

        let display_name = self
            .crypto
            .decrypt_string(&record.display_name_encrypted)
            .unwrap_or_else(|| record.username.clone());
        Ok(Some(display_name))
    }

    /// Resolves a raw token into a context. Anything that is not a live,
    /// untampered session yields a logged-out context.
    pub async fn context(&self, raw_token: Option<&str>) -> Result<SessionContext, AuthError> {
        let Some(token) = raw_token.and_then(|raw| Uuid::parse_str(raw.trim()).ok()) else {
            return Ok(SessionContext::logged_out());
        };

        let flag = self.flags.get(&flag_key(token, FLAG_AUTHENTICATED)).await?;
        match flag.as_deref() {
            Some(AUTHENTICATED_SENTINEL) => {}
            None => return Ok(SessionContext::logged_out()),
            Some(_) => {
                warn!("Session flag holds an unexpected value; destroying session");
                self.flags.clear(&all_flag_keys(token)).await?;
                return Ok(SessionContext::logged_out());
            }
        }

        let subject_name = self.flags.get(&flag_key(token, FLAG_SUBJECT)).await?;
        Ok(SessionContext::new(token, flag, subject_name))
    }

    pub async fn logout(&self, token: Uuid) -> Result<(), AuthError> {
        self.flags.clear(&all_flag_keys(token)).await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn preferences(&self, token: Uuid) -> Result<Preferences, AuthError> {
        let theme = self
            .flags
            .get(&flag_key(token, FLAG_THEME))
            .await?
            .and_then(|raw| Theme::parse(&raw))
            .unwrap_or_default();
        let active_tab = self.flags.get(&flag_key(token, FLAG_ACTIVE_TAB)).await?;
        Ok(Preferences { theme, active_tab })
    }

    pub async fn set_theme(&self, token: Uuid, theme: Theme) -> Result<(), AuthError> {
        self.flags
            .set(&flag_key(token, FLAG_THEME), theme.as_str(), self.ttl)
            .await?;
        Ok(())
    }

    /// The caller checks that the tab exists.
    pub async fn set_active_tab(&self, token: Uuid, tab_id: &str) -> Result<(), AuthError> {
        self.flags
            .set(&flag_key(token, FLAG_ACTIVE_TAB), tab_id, self.ttl)
            .await?;
        Ok(())
    }
}
