use super::claims::ClaimSet;

/// How the caller proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Cookie,
}

/// Authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Username; what ownership checks compare against.
    pub name: String,
    pub claims: ClaimSet,
    pub scheme: AuthScheme,
}

impl Principal {
    pub fn new(name: impl Into<String>, claims: ClaimSet, scheme: AuthScheme) -> Self {
        Self { name: name.into(), claims, scheme }
    }

    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool { self.claims.has(claim_type, value) }
}
