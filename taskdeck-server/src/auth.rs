//! Bearer-token authentication.
//!
//! The server never trusts an owner named by the caller. Both surfaces
//! resolve a presented token to an [`OwnerId`] here and pass that identity
//! down explicitly.

use std::collections::HashMap;

use taskdeck_proto::task::OwnerId;

/// Why a credential was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("not authorized, no token")]
    MissingToken,
    /// The credential did not resolve to an owner.
    #[error("not authorized, token failed")]
    InvalidToken,
}

/// Resolves a bearer credential to the identity it belongs to.
pub trait Authenticator: Send + Sync {
    /// Map `token` to its owner.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] when the token is unknown.
    fn authenticate(&self, token: &str) -> Result<OwnerId, AuthError>;
}

/// Static token table, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, OwnerId>,
}

impl TokenAuthenticator {
    /// Build from `(token, owner)` pairs. Later duplicates win.
    pub fn new<I, T, O>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, O)>,
        T: Into<String>,
        O: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(token, owner)| (token.into(), OwnerId::new(owner)))
                .collect(),
        }
    }

    /// Number of configured tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured (every request will be refused).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, token: &str) -> Result<OwnerId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Extract the credential from an `Authorization: Bearer <token>` value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}
