//! Authorization policy evaluation.
//!
//! Every dispatched action carries a [`Gate`]. Named policies are predicates over the
//! caller's claim set, held in a [`PolicyRegistry`]. Ownership of a resource is not a
//! policy: handlers call [`ensure_owner`] once they have loaded the resource.

use std::collections::HashMap;

use tracing::debug;

use super::claims::types;
use super::principal::Principal;
use crate::error::{AppError, AppResult};

pub const SUPER_USER_POLICY: &str = "SuperUser";

/// Authorization requirement attached to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Anonymous,
    Authenticated,
    Policy(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Caller must hold a claim of this type; with `allowed` non-empty the value must be one of them.
    Claim { claim_type: String, allowed: Vec<String> },
}

impl Requirement {
    fn satisfied_by(&self, principal: &Principal) -> bool {
        match self {
            Requirement::Claim { claim_type, allowed } if allowed.is_empty() => principal.claims.has_type(claim_type),
            Requirement::Claim { claim_type, allowed } => allowed.iter().any(|v| principal.has_claim(claim_type, v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: String,
    requirements: Vec<Requirement>,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), requirements: Vec::new() } }

    pub fn require_claim(mut self, claim_type: &str, allowed: &[&str]) -> Self {
        self.requirements.push(Requirement::Claim {
            claim_type: claim_type.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn allows(&self, principal: &Principal) -> bool {
        self.requirements.iter().all(|r| r.satisfied_by(principal))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
}

impl PolicyRegistry {
    /// Registry with the policies the API ships with.
    pub fn standard() -> Self {
        let mut reg = PolicyRegistry::default();
        reg.register(Policy::new(SUPER_USER_POLICY).require_claim(types::SUPER_USER, &["True"]));
        reg
    }

    pub fn register(&mut self, policy: Policy) {
        self.policies.insert(policy.name.clone(), policy);
    }

    pub fn contains(&self, name: &str) -> bool { self.policies.contains_key(name) }

    /// Allow or deny one request. No caller on a gated action is `Unauthenticated`; a caller
    /// failing the policy is `Forbidden`.
    pub fn evaluate(&self, principal: Option<&Principal>, gate: &Gate) -> AppResult<()> {
        let principal = match (gate, principal) {
            (Gate::Anonymous, _) => return Ok(()),
            (_, None) => return Err(AppError::unauthenticated("Authentication is required")),
            (_, Some(p)) => p,
        };
        let Gate::Policy(name) = gate else { return Ok(()) };
        let Some(policy) = self.policies.get(*name) else {
            return Err(AppError::internal(format!("policy '{}' is not registered", name)));
        };
        if policy.allows(principal) {
            Ok(())
        } else {
            debug!(target: "auth", user = %principal.name, policy = %name, "policy denied");
            Err(AppError::forbidden("You are not allowed to perform this operation"))
        }
    }
}

/// Resource-level check: only the owning user may act on the resource.
pub fn ensure_owner(principal: &Principal, owner: &str) -> AppResult<()> {
    if principal.name == owner {
        return Ok(());
    }
    debug!(target: "auth", user = %principal.name, owner = %owner, "ownership check failed");
    Err(AppError::forbidden("Only the owner may change this resource"))
}
