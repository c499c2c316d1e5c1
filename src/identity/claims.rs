use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::store::Role;

/// Well-known claim types.
pub mod types {
    pub const SUBJECT: &str = "sub";
    pub const TOKEN_ID: &str = "jti";
    pub const GIVEN_NAME: &str = "given_name";
    pub const EMAIL: &str = "email";
    pub const SUPER_USER: &str = "SuperUser";
    pub const IS_ADMIN: &str = "IsAdmin";
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self { claim_type: claim_type.into(), value: value.into() }
    }
}

/// Set of claims; a (type, value) pair appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet(BTreeSet<Claim>);

impl ClaimSet {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, claim: Claim) -> bool { self.0.insert(claim) }

    /// Claim types compare ASCII case-insensitively, values exactly.
    pub fn has(&self, claim_type: &str, value: &str) -> bool {
        self.0.iter().any(|c| c.claim_type.eq_ignore_ascii_case(claim_type) && c.value == value)
    }

    pub fn has_type(&self, claim_type: &str) -> bool {
        self.0.iter().any(|c| c.claim_type.eq_ignore_ascii_case(claim_type))
    }

    pub fn values<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter(move |c| c.claim_type.eq_ignore_ascii_case(claim_type)).map(|c| c.value.as_str())
    }

    pub fn first<'a>(&'a self, claim_type: &'a str) -> Option<&'a str> { self.values(claim_type).next() }

    pub fn is_superset_of(&self, other: &ClaimSet) -> bool { self.0.is_superset(&other.0) }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = Claim>>(iter: I) -> Self { ClaimSet(iter.into_iter().collect()) }
}

impl Extend<Claim> for ClaimSet {
    fn extend<I: IntoIterator<Item = Claim>>(&mut self, iter: I) { self.0.extend(iter) }
}

/// Claims an identity effectively holds: its own plus those of every role it belongs to.
/// User and role claims are stored apart, so this union is the only place they meet.
pub fn effective_claims(user_claims: &[Claim], roles: &[Role]) -> ClaimSet {
    let mut set: ClaimSet = user_claims.iter().cloned().collect();
    for role in roles {
        set.extend(role.claims.iter().cloned());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_claims_union_user_and_role_claims() {
        let user = vec![Claim::new(types::SUPER_USER, "True")];
        let roles = vec![
            Role { name: "Admin".into(), claims: vec![Claim::new(types::IS_ADMIN, "True")] },
            Role { name: "Speakers".into(), claims: vec![Claim::new("Track", "Rust"), Claim::new(types::SUPER_USER, "True")] },
        ];
        let set = effective_claims(&user, &roles);
        assert_eq!(set.len(), 3);
        assert!(set.has(types::SUPER_USER, "True"));
        assert!(set.has(types::IS_ADMIN, "True"));
        assert!(set.has("track", "Rust"));
    }

    #[test]
    fn values_compare_exactly() {
        let set: ClaimSet = vec![Claim::new("SuperUser", "True")].into_iter().collect();
        assert!(set.has("superuser", "True"));
        assert!(!set.has("SuperUser", "true"));
        assert!(set.has_type("SUPERUSER"));
        assert_eq!(set.first("SuperUser"), Some("True"));
    }

    #[test]
    fn no_roles_no_claims_is_empty() {
        assert!(effective_claims(&[], &[]).is_empty());
    }
}
