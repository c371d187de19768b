pub mod credentials;
pub mod flags;
pub mod guard;
pub mod handlers;
pub mod session;
pub mod throttle;

use std::time::Duration;

use thiserror::Error;

/// The single demo account that bypasses the credential store.
pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo1234";
pub const DEMO_DISPLAY_NAME: &str = "Demo User";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password and blank input all look the same.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("too many failed attempts")]
    TooManyAttempts { retry_after: Duration },

    #[error("credential or session store failure: {0}")]
    Store(#[from] anyhow::Error),
}
