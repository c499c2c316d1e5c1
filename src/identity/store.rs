//! In-process identity store: users, their claims, roles and role claims.
//! User claims and role claims are kept apart; `effective_claims` joins them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::claims::Claim;
use crate::security;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Registration input; the password is hashed on the way in.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub claims: Vec<Claim>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("user '{0}' already exists")]
    DuplicateUser(String),
    #[error("user '{0}' does not exist")]
    UnknownUser(String),
    #[error("role '{0}' already exists")]
    DuplicateRole(String),
    #[error("role '{0}' does not exist")]
    UnknownRole(String),
    #[error("username must not be blank")]
    BlankUsername,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, Identity>,
    user_claims: HashMap<String, Vec<Claim>>,
    user_roles: HashMap<String, BTreeSet<String>>,
    roles: HashMap<String, Role>,
}

/// Lookups are case-insensitive on user and role names.
fn normalize(name: &str) -> String { name.trim().to_ascii_uppercase() }

#[derive(Clone, Default)]
pub struct IdentityStore {
    inner: Arc<RwLock<Inner>>,
}

impl IdentityStore {
    pub fn new() -> Self { Self::default() }

    pub fn find_by_name(&self, username: &str) -> Option<Identity> {
        self.inner.read().users.get(&normalize(username)).cloned()
    }

    pub fn create_user(&self, new: NewIdentity, password: &str) -> Result<Identity, IdentityError> {
        if new.username.trim().is_empty() { return Err(IdentityError::BlankUsername); }
        let key = normalize(&new.username);
        if self.inner.read().users.contains_key(&key) {
            return Err(IdentityError::DuplicateUser(new.username));
        }
        // Hash outside the lock.
        let password_hash = security::hash_password(password).map_err(|e| IdentityError::Hash(e.to_string()))?;
        let identity = Identity {
            username: new.username,
            password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
        };
        let mut inner = self.inner.write();
        if inner.users.contains_key(&key) {
            return Err(IdentityError::DuplicateUser(identity.username));
        }
        inner.users.insert(key, identity.clone());
        debug!(target: "identity", user = %identity.username, "user created");
        Ok(identity)
    }

    pub fn add_claim(&self, username: &str, claim: Claim) -> Result<(), IdentityError> {
        let key = normalize(username);
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&key) { return Err(IdentityError::UnknownUser(username.to_string())); }
        let claims = inner.user_claims.entry(key).or_default();
        if !claims.contains(&claim) { claims.push(claim); }
        Ok(())
    }

    /// Returns whether the claim was present. Tokens already issued keep it until they expire.
    pub fn remove_claim(&self, username: &str, claim: &Claim) -> Result<bool, IdentityError> {
        let key = normalize(username);
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&key) { return Err(IdentityError::UnknownUser(username.to_string())); }
        let Some(claims) = inner.user_claims.get_mut(&key) else { return Ok(false) };
        let before = claims.len();
        claims.retain(|c| c != claim);
        Ok(claims.len() != before)
    }

    pub fn role_exists(&self, name: &str) -> bool { self.inner.read().roles.contains_key(&normalize(name)) }

    pub fn create_role(&self, name: &str) -> Result<(), IdentityError> {
        let mut inner = self.inner.write();
        let key = normalize(name);
        if inner.roles.contains_key(&key) { return Err(IdentityError::DuplicateRole(name.to_string())); }
        inner.roles.insert(key, Role { name: name.to_string(), claims: Vec::new() });
        Ok(())
    }

    pub fn add_role_claim(&self, role: &str, claim: Claim) -> Result<(), IdentityError> {
        let mut inner = self.inner.write();
        let Some(r) = inner.roles.get_mut(&normalize(role)) else {
            return Err(IdentityError::UnknownRole(role.to_string()));
        };
        if !r.claims.contains(&claim) { r.claims.push(claim); }
        Ok(())
    }

    pub fn add_to_role(&self, username: &str, role: &str) -> Result<(), IdentityError> {
        let user_key = normalize(username);
        let role_key = normalize(role);
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&user_key) { return Err(IdentityError::UnknownUser(username.to_string())); }
        if !inner.roles.contains_key(&role_key) { return Err(IdentityError::UnknownRole(role.to_string())); }
        inner.user_roles.entry(user_key).or_default().insert(role_key);
        Ok(())
    }

    /// Claims attached directly to the user (role claims excluded).
    pub fn claims_of(&self, username: &str) -> Vec<Claim> {
        self.inner.read().user_claims.get(&normalize(username)).cloned().unwrap_or_default()
    }

    pub fn roles_of(&self, username: &str) -> Vec<Role> {
        let inner = self.inner.read();
        let Some(names) = inner.user_roles.get(&normalize(username)) else { return Vec::new() };
        names.iter().filter_map(|n| inner.roles.get(n).cloned()).collect()
    }
}
