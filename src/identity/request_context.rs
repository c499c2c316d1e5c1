use super::Principal;

/// Per-request facts gathered before dispatch.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub request_id: String,
    /// Scheme and authority used to build resource links, e.g. `http://localhost:8088`.
    pub base_url: String,
}

impl RequestContext {
    pub fn user(&self) -> Option<&str> { self.principal.as_ref().map(|p| p.name.as_str()) }
}
