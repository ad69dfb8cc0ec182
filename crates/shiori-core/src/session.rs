use serde::{Deserialize, Serialize};

/// Lifecycle of the tracked collections with respect to the active
/// identity. Driven by explicit identity-change events, never by incidental
/// re-renders of the embedding client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No identity has been presented yet, or identity is still resolving.
    #[default]
    Uninitialized,
    /// Identity resolved to a user; the initial fetch is in flight.
    Loading,
    /// The initial fetch has settled (successfully or not).
    Ready,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHandle {
    /// Opaque identity the persistence service scopes rows by.
    pub user_id: String,
    pub access_token: String,
}

/// A snapshot from the identity provider: the current user, if any, and
/// whether resolution is still in flight. While `resolving` is set the core
/// does nothing; a resolved `None` clears the mirror.
#[derive(Debug, Clone, Default)]
pub struct IdentitySnapshot {
    pub user: Option<UserHandle>,
    pub resolving: bool,
}
