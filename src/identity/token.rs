//! Bearer token issuance and validation (HMAC-SHA256 JWT).
//!
//! Tokens are stateless: there is no revocation list, so a claim removed from a user after
//! issuance stays in that user's outstanding tokens until they expire.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::claims::{types, Claim, ClaimSet};
use super::principal::{AuthScheme, Principal};
use super::store::Identity;
use crate::config::TokenSettings;

pub const TOKEN_LIFETIME_MINUTES: i64 = 15;

/// Payload of an issued token. Claims beyond the registered ones are flattened in:
/// a type held once is a string, a type held several times an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub jti: String,
    pub given_name: String,
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

const RESERVED: [&str; 7] = ["sub", "jti", "given_name", "email", "iss", "aud", "exp"];

impl TokenClaims {
    /// Claim set carried by this token (registered identity claims plus the extras).
    pub fn claim_set(&self) -> ClaimSet {
        let mut set = ClaimSet::new();
        set.insert(Claim::new(types::SUBJECT, &self.sub));
        set.insert(Claim::new(types::TOKEN_ID, &self.jti));
        set.insert(Claim::new(types::GIVEN_NAME, &self.given_name));
        set.insert(Claim::new(types::EMAIL, &self.email));
        for (ty, value) in &self.extra {
            match value {
                serde_json::Value::String(s) => { set.insert(Claim::new(ty, s)); }
                serde_json::Value::Array(items) => {
                    set.extend(items.iter().filter_map(|i| i.as_str()).map(|s| Claim::new(ty, s)));
                }
                other => { set.insert(Claim::new(ty, other.to_string())); }
            }
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expiration: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.key.as_bytes()),
            decoding: DecodingKey::from_secret(settings.key.as_bytes()),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    /// Sign a token for `identity` carrying its effective claims, valid for 15 minutes from `now`.
    pub fn issue(&self, identity: &Identity, effective: &ClaimSet, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for c in effective.iter() {
            if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(&c.claim_type)) {
                debug!(target: "auth", claim = %c.claim_type, "skipping claim that collides with a registered name");
                continue;
            }
            grouped.entry(c.claim_type.clone()).or_default().push(c.value.clone());
        }
        let extra = grouped
            .into_iter()
            .map(|(ty, mut values)| {
                let v = if values.len() == 1 { serde_json::Value::String(values.remove(0)) } else { serde_json::json!(values) };
                (ty, v)
            })
            .collect();

        let exp = (now + Duration::minutes(TOKEN_LIFETIME_MINUTES)).timestamp();
        let claims = TokenClaims {
            sub: identity.username.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            given_name: identity.first_name.clone(),
            email: identity.email.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp,
            extra,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        let expiration = DateTime::<Utc>::from_timestamp(exp, 0).unwrap_or(now);
        Ok(IssuedToken { token, expiration })
    }

    /// Verify signature, issuer and audience, then expiry against `now` with no leeway.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        let data = decode::<TokenClaims>(token, &self.decoding, &validation)?;
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        let claims = self.decode(token, now)?;
        Ok(Principal::new(claims.sub.clone(), claims.claim_set(), AuthScheme::Bearer))
    }
}
