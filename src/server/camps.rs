//! Camp endpoints. Reads are open; writes need the SuperUser policy.

use axum::response::Response;
use tracing::{info, warn};

use super::dispatch::{created, empty, ok, ActionRequest};
use super::models::{camp_url, CampModel, SpeakerModel};
use crate::error::{AppError, AppResult};
use crate::storage::{CampRepository, Entity, EntityKey};

fn not_found(moniker: &str) -> AppError { AppError::not_found(format!("Camp {} was not found", moniker)) }

pub(crate) async fn list(req: ActionRequest) -> AppResult<Response> {
    let repo = req.state.store.repository();
    let base = &req.ctx.base_url;
    ok(repo.all_camps().iter().map(|c| CampModel::from_camp(c, base)).collect::<Vec<_>>())
}

pub(crate) async fn get(req: ActionRequest) -> AppResult<Response> {
    let repo = req.state.store.repository();
    let moniker = &req.params.moniker;
    let camp = repo.camp(moniker).ok_or_else(|| not_found(moniker))?;
    let mut model = CampModel::from_camp(&camp, &req.ctx.base_url);
    if req.flag("includeSpeakers") {
        model.speakers = Some(
            repo.speakers(&camp.moniker)
                .iter()
                .map(|s| SpeakerModel::from_speaker(s, &camp.moniker, &req.ctx.base_url))
                .collect(),
        );
    }
    ok(model)
}

pub(crate) async fn create(req: ActionRequest) -> AppResult<Response> {
    let model: CampModel = req.json()?;
    model.validate()?;
    let mut repo = req.state.store.repository();
    let mut camp = model.to_camp();
    if repo.camp(&camp.moniker).is_some() {
        return Err(AppError::invalid_field("moniker", "Moniker already in use"));
    }
    info!(target: "api", moniker = %camp.moniker, "creating a new code camp");
    camp.id = repo.add(Entity::Camp(camp.clone()));
    if !repo.save_all() {
        warn!(target: "api", moniker = %camp.moniker, "could not save camp");
        return Err(AppError::persistence("Could not save camp"));
    }
    created(&camp_url(&req.ctx.base_url, &camp.moniker), CampModel::from_camp(&camp, &req.ctx.base_url))
}

/// Serves both PUT and PATCH: the incoming model is mapped over the stored camp.
pub(crate) async fn update(req: ActionRequest) -> AppResult<Response> {
    let model: CampModel = req.json()?;
    model.validate()?;
    let mut repo = req.state.store.repository();
    let moniker = &req.params.moniker;
    let mut camp = repo.camp(moniker).ok_or_else(|| not_found(moniker))?;
    model.apply_to(&mut camp);
    if repo.camp(&camp.moniker).is_some_and(|other| other.id != camp.id) {
        return Err(AppError::invalid_field("moniker", "Moniker already in use"));
    }
    repo.update(Entity::Camp(camp.clone()));
    if !repo.save_all() {
        warn!(target: "api", moniker = %moniker, "could not update camp");
        return Err(AppError::persistence("Couldn't update Camp"));
    }
    ok(CampModel::from_camp(&camp, &req.ctx.base_url))
}

pub(crate) async fn delete(req: ActionRequest) -> AppResult<Response> {
    let mut repo = req.state.store.repository();
    let moniker = &req.params.moniker;
    let camp = repo.camp(moniker).ok_or_else(|| not_found(moniker))?;
    repo.delete(EntityKey::Camp(camp.id));
    if !repo.save_all() {
        warn!(target: "api", moniker = %moniker, "could not delete camp");
        return Err(AppError::persistence("Could not delete Camp"));
    }
    empty()
}
