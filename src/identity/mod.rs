//! Identities, claims, credentials, sessions and bearer tokens, plus the policy layer
//! that decides what a caller may do. Keep the public surface thin and split the
//! implementation across sub-modules.

mod authorizer;
mod claims;
mod principal;
mod provider;
mod request_context;
mod session;
mod store;
mod token;

pub use authorizer::{ensure_owner, Gate, Policy, PolicyRegistry, SUPER_USER_POLICY};
pub use claims::{effective_claims, types, Claim, ClaimSet};
pub use principal::{AuthScheme, Principal};
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest, VerifiedLogin};
pub use request_context::RequestContext;
pub use session::{session_from_cookie_header, Session, SessionError, SessionManager, SessionToken, SESSION_COOKIE};
pub use store::{Identity, IdentityError, IdentityStore, NewIdentity, Role};
pub use token::{IssuedToken, TokenClaims, TokenError, TokenIssuer, TOKEN_LIFETIME_MINUTES};
