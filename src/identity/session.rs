use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::principal::{AuthScheme, Principal};

pub const SESSION_COOKIE: &str = "codecamp_session";
pub const SESSION_TTL_DAYS: i64 = 14;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// `Set-Cookie` value carrying this session.
    pub fn cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            SESSION_COOKIE,
            self.token,
            (self.expires_at - self.issued_at).num_seconds()
        )
    }
}

#[derive(Default)]
struct Sessions {
    by_token: HashMap<SessionToken, Session>,
    by_user: HashMap<String, HashSet<SessionToken>>,
}

impl Sessions {
    fn sweep(&mut self, now: DateTime<Utc>) {
        let before = self.by_token.len();
        self.by_token.retain(|_, s| s.expires_at > now);
        if self.by_token.len() == before {
            return;
        }
        let live = &self.by_token;
        self.by_user.retain(|_, tokens| {
            tokens.retain(|t| live.contains_key(t));
            !tokens.is_empty()
        });
        debug!(target: "auth", swept = before - self.by_token.len(), "expired sessions dropped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no entropy for a session token: {0}")]
    Entropy(String),
}

fn gen_id() -> Result<String, SessionError> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| SessionError::Entropy(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Server-side cookie sessions. Clones share the same table.
#[derive(Clone)]
pub struct SessionManager {
    pub ttl: Duration,
    inner: Arc<RwLock<Sessions>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self { ttl: Duration::days(SESSION_TTL_DAYS), inner: Arc::default() } }
}

impl SessionManager {
    /// Start a session for `principal`. Sessions already expired at `now` are swept first.
    pub fn issue(&self, principal: Principal, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let principal = Principal { scheme: AuthScheme::Cookie, ..principal };
        let sess = Session { token: gen_id()?, principal, issued_at: now, expires_at: now + self.ttl };
        let mut inner = self.inner.write();
        inner.sweep(now);
        inner.by_user.entry(sess.principal.name.to_ascii_uppercase()).or_default().insert(sess.token.clone());
        inner.by_token.insert(sess.token.clone(), sess.clone());
        debug!(target: "auth", user = %sess.principal.name, ttl_days = self.ttl.num_days(), "session issued");
        Ok(sess)
    }

    /// Principal bound to `token`, if the session exists and has not expired. Expired
    /// sessions are dropped on sight.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<Principal> {
        {
            let inner = self.inner.read();
            let sess = inner.by_token.get(token)?;
            if sess.expires_at > now {
                return Some(sess.principal.clone());
            }
        }
        self.logout(token);
        None
    }

    pub fn logout(&self, token: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(sess) = inner.by_token.remove(token) else { return false };
        if let Some(set) = inner.by_user.get_mut(&sess.principal.name.to_ascii_uppercase()) {
            set.remove(token);
        }
        true
    }

    pub fn revoke_user(&self, username: &str) -> usize {
        let mut inner = self.inner.write();
        let tokens = inner.by_user.remove(&username.to_ascii_uppercase()).unwrap_or_default();
        let count = tokens.iter().filter(|t| inner.by_token.remove(*t).is_some()).count();
        debug!(target: "auth", user = %username, count, "sessions revoked");
        count
    }
}

/// Value of the session cookie in a `Cookie` request header.
pub fn session_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClaimSet;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap() }

    fn alice() -> Principal { Principal::new("alice", ClaimSet::new(), AuthScheme::Bearer) }

    #[test]
    fn issued_session_validates_until_ttl() {
        let sm = SessionManager::default();
        let s = sm.issue(alice(), now()).unwrap();
        let p = sm.validate(&s.token, now() + Duration::days(13)).unwrap();
        assert_eq!(p.name, "alice");
        assert_eq!(p.scheme, AuthScheme::Cookie);
        assert!(sm.validate(&s.token, now() + Duration::days(14)).is_none());
        // dropped once seen expired
        assert!(sm.validate(&s.token, now()).is_none());
    }

    #[test]
    fn unknown_token_is_none() {
        assert!(SessionManager::default().validate("nope", now()).is_none());
    }

    #[test]
    fn logout_and_revoke() {
        let sm = SessionManager::default();
        let a = sm.issue(alice(), now()).unwrap();
        let b = sm.issue(alice(), now()).unwrap();
        assert_ne!(a.token, b.token);
        assert!(sm.logout(&a.token));
        assert!(!sm.logout(&a.token));
        assert_eq!(sm.revoke_user("ALICE"), 1);
        assert!(sm.validate(&b.token, now()).is_none());
    }

    #[test]
    fn issuing_sweeps_expired_sessions() {
        let sm = SessionManager::default();
        let old = sm.issue(alice(), now()).unwrap();
        let bob = Principal::new("bob", ClaimSet::new(), AuthScheme::Bearer);
        let fresh = sm.issue(bob, now() + Duration::days(15)).unwrap();
        {
            let inner = sm.inner.read();
            assert!(!inner.by_token.contains_key(&old.token));
            assert!(!inner.by_user.contains_key("ALICE"));
            assert_eq!(inner.by_token.len(), 1);
        }
        assert!(sm.validate(&fresh.token, now() + Duration::days(15)).is_some());
    }

    #[test]
    fn tokens_are_distinct_and_non_zero() {
        let zero = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([0u8; 32]);
        let a = gen_id().unwrap();
        let b = gen_id().unwrap();
        assert_ne!(a, b);
        assert_ne!(a, zero);
    }

    #[test]
    fn cookie_header_round_trip() {
        let s = SessionManager::default().issue(alice(), now()).unwrap();
        let set_cookie = s.cookie();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains(&format!("Max-Age={}", 14 * 24 * 3600)));
        let header = format!("theme=dark; {}={}; other=1", SESSION_COOKIE, s.token);
        assert_eq!(session_from_cookie_header(&header), Some(s.token.as_str()));
        assert_eq!(session_from_cookie_header("theme=dark"), None);
    }
}
