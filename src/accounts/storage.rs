//! Account persistence and credential resolution

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::credentials::{generate_token, hash_password, is_valid_email, verify_password};
use super::models::*;
use crate::error::{constraint_violation, Constraint, Result, ServiceError};
use crate::storage::{Assignments, DELETED_USER_ID};

const ACCOUNT_COLUMNS: &str =
    "acc_id, username, email, name, passwd, token, token_expire, last_seen, since";

/// Default lifetime of a bearer token
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

pub struct AccountStore<'c> {
    conn: &'c Connection,
    token_ttl: Duration,
}

impl<'c> AccountStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            token_ttl: Duration::days(DEFAULT_TOKEN_TTL_DAYS),
        }
    }

    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    // ==================== Lifecycle ====================

    /// Register a new account and issue its first credential
    pub fn register(&self, registration: Registration) -> Result<Account> {
        let username = registration.username.trim();
        if username.is_empty() {
            return Err(ServiceError::bad_request("username is required"));
        }
        if registration.password.is_empty() {
            return Err(ServiceError::bad_request("password is required"));
        }
        if !is_valid_email(&registration.email) {
            return Err(ServiceError::bad_request("invalid email"));
        }

        let hash = hash_password(&registration.password)?;
        let token = generate_token();
        let now = Utc::now();

        self.conn
            .execute(
                "INSERT INTO account (username, email, name, passwd, token, token_expire, last_seen, since)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    username,
                    registration.email,
                    registration.name,
                    hash,
                    token,
                    now + self.token_ttl,
                    now
                ],
            )
            .map_err(|e| match constraint_violation(&e) {
                Some(Constraint::Unique) => ServiceError::Conflict("account"),
                _ => e.into(),
            })?;

        let id = self.conn.last_insert_rowid();
        log::info!("Registered account {} ({})", id, username);
        self.get(id)
    }

    /// Verify a password and rotate the account's credential
    pub fn login(&self, username: &str, password: &str) -> Result<Account> {
        let account = match self.find_by_username(username)? {
            Some(account) if account.id != DELETED_USER_ID => account,
            _ => return Err(ServiceError::InvalidCredential),
        };

        if !verify_password(password, &account.password_hash) {
            log::warn!("Rejected login for {}", username);
            return Err(ServiceError::InvalidCredential);
        }

        self.rotate_token(account.id)?;
        self.get(account.id)
    }

    /// Map a bearer credential to a live account, stamping `last_seen`
    pub fn resolve(&self, token: &str) -> Result<Account> {
        let now = Utc::now();
        let account = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM account WHERE token = ?1 AND token_expire >= ?2",
                    ACCOUNT_COLUMNS
                ),
                params![token, now],
                account_from_row,
            )
            .optional()?
            .ok_or(ServiceError::InvalidCredential)?;

        self.conn.execute(
            "UPDATE account SET last_seen = ?1 WHERE acc_id = ?2",
            params![now, account.id],
        )?;

        Ok(Account {
            last_seen: now,
            ..account
        })
    }

    /// Resolve a credential if one was presented; anonymous callers yield `None`.
    ///
    /// A credential that is presented but does not resolve is an error, not
    /// an anonymous request.
    pub fn resolve_optional(&self, token: Option<&str>) -> Result<Option<Account>> {
        token.map(|t| self.resolve(t)).transpose()
    }

    /// Invalidate the presented credential by rotating it
    pub fn logout(&self, token: &str) -> Result<()> {
        let account = self.resolve(token)?;
        self.rotate_token(account.id)?;
        Ok(())
    }

    fn rotate_token(&self, id: AccountId) -> Result<String> {
        let token = generate_token();
        let now = Utc::now();
        let affected = self.conn.execute(
            "UPDATE account SET token = ?1, token_expire = ?2, last_seen = ?3 WHERE acc_id = ?4",
            params![token, now + self.token_ttl, now, id],
        )?;
        if affected == 0 {
            return Err(ServiceError::NotFound("account"));
        }
        Ok(token)
    }

    // ==================== Lookups ====================

    pub fn get(&self, id: AccountId) -> Result<Account> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM account WHERE acc_id = ?1", ACCOUNT_COLUMNS),
                params![id],
                account_from_row,
            )
            .optional()?
            .ok_or(ServiceError::NotFound("account"))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM account WHERE username = ?1", ACCOUNT_COLUMNS),
                params![username.trim()],
                account_from_row,
            )
            .optional()?)
    }

    pub fn by_username(&self, username: &str) -> Result<Account> {
        self.find_by_username(username)?
            .ok_or(ServiceError::NotFound("account"))
    }

    /// Resolve an id-or-username reference to an account id
    pub fn id_of(&self, account: &AccountRef) -> Result<AccountId> {
        match account {
            AccountRef::Id(id) => self.get(*id).map(|a| a.id),
            AccountRef::Username(username) => self.by_username(username).map(|a| a.id),
        }
    }

    pub fn public_profile(&self, username: &str) -> Result<PublicAccount> {
        if username.trim().is_empty() {
            return Err(ServiceError::bad_request("username is required"));
        }
        self.by_username(username).map(|a| a.public())
    }

    // ==================== Mutations ====================

    /// Apply a partial update; absent fields keep their values
    pub fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Account> {
        if update.is_empty() {
            return Err(ServiceError::bad_request("no fields to update"));
        }
        if let Some(email) = &update.email {
            if !is_valid_email(email) {
                return Err(ServiceError::bad_request("invalid email"));
            }
        }
        if matches!(update.username.as_deref(), Some(u) if u.trim().is_empty()) {
            return Err(ServiceError::bad_request("username cannot be empty"));
        }
        if matches!(update.password.as_deref(), Some("")) {
            return Err(ServiceError::bad_request("password cannot be empty"));
        }

        let password_hash = update
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        let mut assignments = Assignments::new();
        assignments
            .set("username", update.username.map(|u| u.trim().to_string()))
            .set("email", update.email)
            .set("name", update.name)
            .set("passwd", password_hash)
            .set("last_seen", Some(Utc::now()));

        let affected = assignments
            .execute_update(self.conn, "account", "acc_id", id)
            .map_err(|e| match constraint_violation(&e) {
                Some(Constraint::Unique) => ServiceError::Conflict("account"),
                _ => e.into(),
            })?;
        if affected == 0 {
            return Err(ServiceError::NotFound("account"));
        }

        self.get(id)
    }

    /// Delete an account.
    ///
    /// Public decks are handed to the deleted-user sentinel so shared content
    /// survives; private decks, subscriptions, progress and ratings cascade.
    pub fn delete(&self, id: AccountId) -> Result<()> {
        if id == DELETED_USER_ID {
            return Err(ServiceError::bad_request("the deleted-user account cannot be removed"));
        }

        let tx = self.conn.unchecked_transaction()?;
        let reassigned = tx.execute(
            "UPDATE deck SET acc_id = ?1 WHERE acc_id = ?2 AND visible = 1",
            params![DELETED_USER_ID, id],
        )?;
        let affected = tx.execute("DELETE FROM account WHERE acc_id = ?1", params![id])?;
        if affected == 0 {
            return Err(ServiceError::NotFound("account"));
        }
        tx.commit()?;

        log::info!(
            "Deleted account {} ({} public decks reassigned)",
            id,
            reassigned
        );
        Ok(())
    }
}

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        password_hash: row.get(4)?,
        token: row.get(5)?,
        token_expires: row.get(6)?,
        last_seen: row.get(7)?,
        since: row.get(8)?,
    })
}
