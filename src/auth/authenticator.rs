//! Identity verification for inbound requests.

use std::fmt;
use std::sync::Arc;

use crate::auth::directory::UserDirectory;
use crate::auth::session::SessionPolicy;
use crate::errors::GatewayError;
use crate::http::request::{QueryParams, PASSWORD_PARAM, USER_PARAM};

/// Who a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Credentials were checked against the directory in this exchange.
    User(String),
    /// A previously issued session cookie was presented.
    Session,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(name) => write!(f, "user:{name}"),
            Identity::Session => f.write_str("session"),
        }
    }
}

/// Username and password supplied as query parameters.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    /// Both `user` and `password` must be present.
    pub fn from_query(query: &QueryParams) -> Option<Self> {
        Some(Self {
            username: query.get(USER_PARAM)?.to_string(),
            password: query.get(PASSWORD_PARAM)?.to_string(),
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Checks a request's identity claim.
pub struct Authenticator {
    directory: Arc<dyn UserDirectory>,
    session: SessionPolicy,
}

impl Authenticator {
    pub fn new(directory: Arc<dyn UserDirectory>, session: SessionPolicy) -> Self {
        Self { directory, session }
    }

    pub fn session(&self) -> &SessionPolicy {
        &self.session
    }

    /// A valid session cookie wins without touching the directory. Otherwise
    /// the query credentials are compared against the stored password.
    pub async fn authenticate(
        &self,
        query: &QueryParams,
        session_cookie: Option<&str>,
    ) -> Result<Identity, GatewayError> {
        if session_cookie.is_some_and(|value| self.session.is_valid(value)) {
            tracing::debug!("Authenticated by session cookie");
            return Ok(Identity::Session);
        }

        let Some(credential) = Credential::from_query(query) else {
            tracing::debug!("No credentials supplied");
            return Err(GatewayError::Unauthorized);
        };

        match self.directory.get_user(&credential.username).await? {
            Some(stored) if stored.password == credential.password => {
                tracing::debug!(user = %credential.username, "Authenticated by credentials");
                Ok(Identity::User(credential.username))
            }
            Some(_) => {
                tracing::debug!(user = %credential.username, "Password mismatch");
                Err(GatewayError::Unauthorized)
            }
            None => {
                tracing::debug!(user = %credential.username, "Unknown user");
                Err(GatewayError::Unauthorized)
            }
        }
    }
}
