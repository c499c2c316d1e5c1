//! Version dispatch table: (controller family, action, version) -> (gate, handler).
//!
//! A [`Controller`] declares the versions it serves and one variant per action. Variants
//! either follow the controller's versions or are pinned to explicit ones. A newer
//! controller of the same family is built with [`Controller::derive`], which carries over
//! the base's unpinned actions under the new versions, and [`Controller::override_action`]
//! replaces individual actions. A controller that declares no versions serves whatever the
//! configured default version currently is.

use std::collections::HashSet;

use tracing::debug;

use super::{ApiVersion, RequestedVersion};
use crate::error::{AppError, AppResult};
use crate::identity::{Gate, PolicyRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Camps,
    Speakers,
    Talks,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Camps => "camps",
            Family::Speakers => "speakers",
            Family::Talks => "talks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct Variant<H> {
    action: Action,
    pinned: Option<Vec<ApiVersion>>,
    gate: Gate,
    handler: H,
}

#[derive(Debug, Clone)]
pub struct Controller<H> {
    family: Family,
    versions: Vec<ApiVersion>,
    variants: Vec<Variant<H>>,
}

impl<H: Clone> Controller<H> {
    pub fn new(family: Family) -> Self {
        Self { family, versions: Vec::new(), variants: Vec::new() }
    }

    pub fn version(mut self, version: ApiVersion) -> Self {
        if !self.versions.contains(&version) { self.versions.push(version); }
        self
    }

    /// Register an action that serves every version of this controller.
    pub fn action(mut self, action: Action, gate: Gate, handler: H) -> Self {
        self.variants.push(Variant { action, pinned: None, gate, handler });
        self
    }

    /// Register an action bound to explicit versions, which need not be declared by the controller.
    pub fn pinned(mut self, action: Action, versions: &[ApiVersion], gate: Gate, handler: H) -> Self {
        self.variants.push(Variant { action, pinned: Some(versions.to_vec()), gate, handler });
        self
    }

    /// New controller of the same family serving `versions`, inheriting the unpinned actions.
    pub fn derive(&self, versions: &[ApiVersion]) -> Self {
        let mut out = Controller::new(self.family);
        for v in versions { out = out.version(*v); }
        out.variants = self.variants.iter().filter(|v| v.pinned.is_none()).cloned().collect();
        out
    }

    /// Replace every variant of `action` on this controller.
    pub fn override_action(mut self, action: Action, gate: Gate, handler: H) -> Self {
        self.variants.retain(|v| v.action != action);
        self.action(action, gate, handler)
    }

    fn effective_versions(&self, default: ApiVersion) -> Vec<ApiVersion> {
        if self.versions.is_empty() { vec![default] } else { self.versions.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("{family:?}/{action:?} has more than one variant for version {version}")]
    DuplicateVariant { family: Family, action: Action, version: String },
    #[error("{family:?}/{action:?} requires unknown policy '{policy}'")]
    UnknownPolicy { family: Family, action: Action, policy: String },
    #[error("{family:?}/{action:?} mixes a default-version variant with explicitly versioned ones")]
    MixedVersioning { family: Family, action: Action },
}

/// The variant chosen for one request.
#[derive(Debug)]
pub struct Resolved<'a, H> {
    pub version: ApiVersion,
    pub gate: &'a Gate,
    pub handler: &'a H,
}

#[derive(Debug, Clone)]
pub struct DispatchTable<H> {
    controllers: Vec<Controller<H>>,
}

#[derive(PartialEq, Eq, Hash)]
enum Slot {
    Declared(ApiVersion),
    Default,
}

impl<H: Clone> DispatchTable<H> {
    /// Validate and freeze the table. Rejects two variants of one action claiming the same
    /// version, and gates naming a policy the registry does not know. An action served at
    /// the configured default may not also have explicitly versioned variants: the default
    /// is only known per request, so the two could collide after a reload.
    pub fn build(controllers: Vec<Controller<H>>, policies: &PolicyRegistry) -> Result<Self, TableError> {
        let mut seen: HashSet<(Family, Action, Slot)> = HashSet::new();
        for c in &controllers {
            for v in &c.variants {
                if let Gate::Policy(name) = &v.gate {
                    if !policies.contains(name) {
                        return Err(TableError::UnknownPolicy { family: c.family, action: v.action, policy: name.to_string() });
                    }
                }
                let slots: Vec<Slot> = match (&v.pinned, c.versions.is_empty()) {
                    (Some(pins), _) => pins.iter().map(|p| Slot::Declared(*p)).collect(),
                    (None, false) => c.versions.iter().map(|p| Slot::Declared(*p)).collect(),
                    (None, true) => vec![Slot::Default],
                };
                for slot in slots {
                    let mixed = match &slot {
                        Slot::Declared(_) => seen.contains(&(c.family, v.action, Slot::Default)),
                        Slot::Default => seen.iter().any(|(f, a, s)| *f == c.family && *a == v.action && matches!(s, Slot::Declared(_))),
                    };
                    if mixed {
                        return Err(TableError::MixedVersioning { family: c.family, action: v.action });
                    }
                    let version = match &slot { Slot::Declared(p) => p.to_string(), Slot::Default => "<default>".to_string() };
                    if !seen.insert((c.family, v.action, slot)) {
                        return Err(TableError::DuplicateVariant { family: c.family, action: v.action, version });
                    }
                }
            }
        }
        Ok(Self { controllers })
    }

    fn candidates(&self, family: Family, action: Action, default: ApiVersion) -> Vec<(ApiVersion, &Variant<H>)> {
        let mut out = Vec::new();
        for c in self.controllers.iter().filter(|c| c.family == family) {
            let served = c.effective_versions(default);
            for v in c.variants.iter().filter(|v| v.action == action) {
                let versions = v.pinned.as_ref().unwrap_or(&served);
                out.extend(versions.iter().map(|ver| (*ver, v)));
            }
        }
        out
    }

    /// Every version under which `family/action` can run, ascending.
    pub fn supported_versions(&self, family: Family, action: Action, default: ApiVersion) -> Vec<ApiVersion> {
        let mut versions: Vec<ApiVersion> = self.candidates(family, action, default).into_iter().map(|(v, _)| v).collect();
        versions.sort();
        versions.dedup();
        versions
    }

    /// Pick the variant for a request. An explicit version must match exactly; an assumed
    /// default falls back to the nearest supported version (the smallest one at or above
    /// the default, else the largest below it).
    pub fn resolve(
        &self,
        family: Family,
        action: Action,
        requested: RequestedVersion,
        default: ApiVersion,
    ) -> AppResult<Resolved<'_, H>> {
        let candidates = self.candidates(family, action, default);
        if candidates.is_empty() {
            return Err(AppError::not_found("The requested action is not available"));
        }
        let wanted = requested.version();
        if let Some((version, v)) = candidates.iter().find(|(ver, _)| *ver == wanted) {
            return Ok(Resolved { version: *version, gate: &v.gate, handler: &v.handler });
        }
        if requested.is_explicit() {
            debug!(family = family.as_str(), ?action, version = %wanted, "unsupported api version");
            return Err(AppError::unsupported_version(format!(
                "The HTTP resource does not support the API version '{}'",
                wanted
            )));
        }
        let above = candidates.iter().filter(|(ver, _)| *ver >= wanted).min_by_key(|(ver, _)| *ver);
        let nearest = above.or_else(|| candidates.iter().max_by_key(|(ver, _)| *ver));
        match nearest {
            Some((version, v)) => {
                debug!(family = family.as_str(), ?action, assumed = %wanted, chosen = %version, "default version not served; using nearest");
                Ok(Resolved { version: *version, gate: &v.gate, handler: &v.handler })
            }
            None => Err(AppError::not_found("The requested action is not available")),
        }
    }
}
