//! Credential provider
//!
//! The engine never reads a global token store directly: a
//! [`CredentialProvider`] is injected at construction and asked for a bearer
//! token on every request.

use std::sync::Arc;

use parking_lot::RwLock;

/// Supplies a bearer token on demand
pub trait CredentialProvider: Send + Sync {
    /// Current token, if the user is logged in
    fn token(&self) -> Option<String>;
}

/// Provider for anonymous access
#[derive(Debug, Default, Clone, Copy)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Process-wide session token store.
///
/// Populated at login. Keeps a primary slot and a mirror slot (the copy
/// shared with other tabs/windows of the same user); whichever is populated
/// is served and copied into the other, so a project switch that clears one
/// of them does not log the user out.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<TokenSlots>>,
}

#[derive(Default)]
struct TokenSlots {
    primary: Option<String>,
    mirror: Option<String>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a token, e.g. from configuration
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_token(token);
        store
    }

    /// Record a token after login
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slots = self.inner.write();
        slots.primary = Some(token.clone());
        slots.mirror = Some(token);
    }

    /// Update only the mirrored copy (another tab logged in)
    pub fn set_mirrored(&self, token: impl Into<String>) {
        self.inner.write().mirror = Some(token.into());
    }

    /// Drop the primary copy only, as a project switch does
    pub fn clear_primary(&self) {
        self.inner.write().primary = None;
    }

    /// Log out everywhere
    pub fn clear(&self) {
        let mut slots = self.inner.write();
        slots.primary = None;
        slots.mirror = None;
    }
}

impl CredentialProvider for TokenStore {
    fn token(&self) -> Option<String> {
        {
            let slots = self.inner.read();
            match (&slots.primary, &slots.mirror) {
                (Some(primary), Some(_)) => return Some(primary.clone()),
                (None, None) => return None,
                _ => {}
            }
        }

        // One slot is empty: resync it from the other
        let mut slots = self.inner.write();
        let token = slots.primary.clone().or_else(|| slots.mirror.clone());
        if slots.primary.is_none() {
            slots.primary = token.clone();
        }
        if slots.mirror.is_none() {
            slots.mirror = token.clone();
        }
        token
    }
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}
