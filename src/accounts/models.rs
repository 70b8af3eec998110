//! Data models for accounts and credentials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = i64;

/// A registered account, including its current bearer credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub token_expires: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub since: DateTime<Utc>,
}

impl Account {
    /// Check whether the stored credential is still live
    pub fn token_is_live(&self) -> bool {
        self.token.is_some() && Utc::now() <= self.token_expires
    }

    pub fn public(&self) -> PublicAccount {
        PublicAccount {
            id: self.id,
            username: self.username.clone(),
            last_seen: self.last_seen,
            since: self.since,
        }
    }
}

/// What anyone may see about an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: AccountId,
    pub username: String,
    pub last_seen: DateTime<Utc>,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Partial account update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.name.is_none() && self.password.is_none()
    }
}

/// Lookup key for operations addressed by either id or username
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Id(AccountId),
    Username(String),
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for AccountRef {
    fn from(username: &str) -> Self {
        Self::Username(username.to_string())
    }
}
