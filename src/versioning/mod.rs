//! API version negotiation.
//! A request names its version in one of two headers (`ver`, `X-MyCodeCamp-Version`);
//! when neither is present the configured default applies. The dispatch table in
//! [`table`] then picks the action variant registered for that version.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use axum::http::HeaderMap;
use serde::{Deserialize, Deserializer};

use crate::error::{AppError, AppResult};

pub mod table;

pub use table::{Action, Controller, DispatchTable, Family, Resolved, TableError};

/// Accepted version headers, in lookup order.
pub const VERSION_HEADERS: [&str; 2] = ["ver", "X-MyCodeCamp-Version"];

/// Response header listing the versions an action supports.
pub const SUPPORTED_VERSIONS_HEADER: &str = "api-supported-versions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self { Self { major, minor } }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid api version")]
pub struct ParseVersionError(pub String);

impl FromStr for ApiVersion {
    type Err = ParseVersionError;

    /// Accepts `major.minor` or a bare `major` (minor 0).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let bad = || ParseVersionError(s.to_string());
        let (major, minor) = match text.split_once('.') {
            Some((ma, mi)) => (ma, mi),
            None => (text, "0"),
        };
        if major.is_empty() || minor.is_empty() { return Err(bad()); }
        if !major.bytes().all(|b| b.is_ascii_digit()) || !minor.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let major = major.parse::<u16>().map_err(|_| bad())?;
        let minor = minor.parse::<u16>().map_err(|_| bad())?;
        Ok(ApiVersion { major, minor })
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The version a request runs under, and whether the caller asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedVersion {
    Explicit(ApiVersion),
    Assumed(ApiVersion),
}

impl RequestedVersion {
    pub fn version(&self) -> ApiVersion {
        match self {
            RequestedVersion::Explicit(v) | RequestedVersion::Assumed(v) => *v,
        }
    }

    pub fn is_explicit(&self) -> bool { matches!(self, RequestedVersion::Explicit(_)) }
}

/// Read the request version from the version headers, falling back to `default`.
/// Blank header values count as absent; anything else must parse.
pub fn read_version(headers: &HeaderMap, default: ApiVersion) -> AppResult<RequestedVersion> {
    for name in VERSION_HEADERS {
        let Some(raw) = headers.get(name) else { continue };
        let text = raw
            .to_str()
            .map_err(|_| AppError::unsupported_version("The api version header is not valid text"))?;
        if text.trim().is_empty() { continue; }
        let version = text.parse::<ApiVersion>().map_err(|e| AppError::unsupported_version(e.to_string()))?;
        return Ok(RequestedVersion::Explicit(version));
    }
    Ok(RequestedVersion::Assumed(default))
}

/// Render a version list the way the supported-versions header carries it.
pub fn format_versions(versions: &[ApiVersion]) -> String {
    versions.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}
