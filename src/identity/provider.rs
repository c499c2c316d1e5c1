use tracing::info;

use super::claims::{effective_claims, ClaimSet};
use super::store::{Identity, IdentityStore};
use crate::security::{self, InvalidCredentials};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A successful credential check together with what the identity is entitled to.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub identity: Identity,
    pub claims: ClaimSet,
}

/// Credential verification seam shared by cookie login and token issuance.
pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> Result<VerifiedLogin, InvalidCredentials>;
}

pub struct LocalAuthProvider {
    pub store: IdentityStore,
}

impl LocalAuthProvider {
    pub fn new(store: IdentityStore) -> Self { Self { store } }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> Result<VerifiedLogin, InvalidCredentials> {
        let identity = security::authenticate(&self.store, &req.username, &req.password)?;
        let claims = effective_claims(&self.store.claims_of(&identity.username), &self.store.roles_of(&identity.username));
        info!(target: "auth", user = %identity.username, claims = claims.len(), "login succeeded");
        Ok(VerifiedLogin { identity, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{types, Claim, NewIdentity};

    #[test]
    fn login_collects_user_and_role_claims() {
        let store = IdentityStore::new();
        store
            .create_user(NewIdentity { username: "bob".into(), first_name: "Bob".into(), last_name: "B".into(), email: "b@x.io".into() }, "pw")
            .unwrap();
        store.create_role("Admin").unwrap();
        store.add_role_claim("Admin", Claim::new(types::IS_ADMIN, "True")).unwrap();
        store.add_to_role("bob", "Admin").unwrap();
        let provider = LocalAuthProvider::new(store);

        let ok = provider.login(&LoginRequest { username: "bob".into(), password: "pw".into() }).unwrap();
        assert!(ok.claims.has(types::IS_ADMIN, "True"));
        assert_eq!(
            provider.login(&LoginRequest { username: "bob".into(), password: "nope".into() }).unwrap_err(),
            InvalidCredentials
        );
    }
}
