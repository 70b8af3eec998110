use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
};
use rusqlite::Connection;

use crate::accounts::credentials::bearer_token;
use crate::accounts::{Account, AccountId, AccountStore};
use crate::error::{Result, ServiceError};

/// Bearer credential from the `Authorization` header.
///
/// Extraction never fails; whether a credential is required is up to the
/// handler. A header that is present but not a usable bearer token is kept as
/// `Malformed` and rejected on resolution, never treated as anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credential {
    #[default]
    Absent,
    Bearer(String),
    Malformed,
}

impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self::from_header(parts.headers.get(AUTHORIZATION)))
    }
}

impl Credential {
    fn from_header(value: Option<&HeaderValue>) -> Self {
        let Some(value) = value else {
            return Self::Absent;
        };
        match value.to_str().ok().and_then(bearer_token) {
            Some(token) => Self::Bearer(token.to_string()),
            None => Self::Malformed,
        }
    }

    /// The presented token; a malformed header is an invalid credential
    pub fn token(&self) -> Result<Option<&str>> {
        match self {
            Self::Absent => Ok(None),
            Self::Bearer(token) => Ok(Some(token.as_str())),
            Self::Malformed => {
                log::warn!("Rejected malformed Authorization header");
                Err(ServiceError::InvalidCredential)
            }
        }
    }

    /// Resolve to a live account; a missing credential is rejected
    pub fn require(&self, conn: &Connection) -> Result<Account> {
        let token = self.token()?.ok_or(ServiceError::InvalidCredential)?;
        AccountStore::new(conn).resolve(token).map_err(|e| {
            if matches!(e, ServiceError::InvalidCredential) {
                log::warn!("Rejected bearer credential");
            }
            e
        })
    }

    /// Resolve to an account id, or `None` for anonymous callers
    pub fn optional(&self, conn: &Connection) -> Result<Option<AccountId>> {
        Ok(AccountStore::new(conn)
            .resolve_optional(self.token()?)?
            .map(|account| account.id))
    }
}
