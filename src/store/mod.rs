//! Persistence collaborators the drive core talks to.
//!
//! The core never reaches into the database itself; it receives a [`UserId`] and asks a
//! [`CredentialStore`] for that user's credentials. Sessions are written by an external
//! login service and only read here through [`SessionResolver`].

pub mod credentials;
pub mod sessions;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::types::{Credential, UserId};

pub use credentials::SqliteCredentialStore;
pub use sessions::SqliteSessionStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// All credentials of `user`, oldest first.
    async fn list(&self, user: UserId) -> AppResult<Vec<Credential>>;

    /// Credentials of `user` with `is_connected = true`, oldest first.
    async fn list_connected(&self, user: UserId) -> AppResult<Vec<Credential>>;

    async fn find(&self, user: UserId, token: &str) -> AppResult<Option<Credential>>;

    /// Links a new token. Fails with `Conflict` if `user` already has it.
    async fn add(&self, user: UserId, title: &str, token: &str) -> AppResult<Credential>;

    /// Returns `false` when `user` has no credential with this token.
    async fn set_connected(&self, user: UserId, token: &str, connected: bool) -> AppResult<bool>;

    /// Returns `false` when `user` has no credential with this token.
    async fn delete(&self, user: UserId, token: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// The user owning a live session, or `None` for unknown/expired tokens.
    async fn resolve(&self, session_token: &str) -> AppResult<Option<UserId>>;
}
