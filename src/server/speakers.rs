//! Speaker endpoints. The list action has one variant per version; the rest are shared
//! between 1.x and 2.0.

use axum::response::Response;
use tracing::{info, warn};

use super::dispatch::{created, empty, ok, ActionRequest};
use super::models::{speaker_url, CountedList, Speaker2Model, SpeakerModel, TalkModel};
use crate::error::{AppError, AppResult};
use crate::identity::ensure_owner;
use crate::storage::{Camp, CampRepository, Entity, EntityKey, Speaker};

/// Load speaker `id` and the camp it belongs to, insisting that camp is `moniker`.
pub(crate) fn speaker_in_camp(repo: &impl CampRepository, moniker: &str, id: i32) -> AppResult<(Camp, Speaker)> {
    let speaker = repo.speaker(id).ok_or_else(|| AppError::not_found(format!("Speaker {} was not found", id)))?;
    match repo.camp(moniker) {
        Some(camp) if camp.id == speaker.camp_id => Ok((camp, speaker)),
        _ => Err(AppError::mismatch("Speaker and Camp do not match")),
    }
}

fn models(req: &ActionRequest) -> AppResult<Vec<SpeakerModel>> {
    let repo = req.state.store.repository();
    let camp = repo
        .camp(&req.params.moniker)
        .ok_or_else(|| AppError::not_found(format!("Camp {} was not found", req.params.moniker)))?;
    let include_talks = req.flag("includeTalks");
    let base = &req.ctx.base_url;
    Ok(repo
        .speakers(&camp.moniker)
        .iter()
        .map(|s| {
            let mut m = SpeakerModel::from_speaker(s, &camp.moniker, base);
            if include_talks {
                m.talks = Some(repo.talks(s.id).iter().map(|t| TalkModel::from_talk(t, &camp.moniker, base)).collect());
            }
            m
        })
        .collect())
}

/// 1.1: `{count, results}`.
pub(crate) async fn list_with_count(req: ActionRequest) -> AppResult<Response> {
    ok(CountedList::new(models(&req)?))
}

/// 1.2: plain array.
pub(crate) async fn list_plain(req: ActionRequest) -> AppResult<Response> {
    ok(models(&req)?)
}

/// 2.0: `{currentTime, count, results}` with badge names.
pub(crate) async fn list_v2(req: ActionRequest) -> AppResult<Response> {
    let results: Vec<Speaker2Model> = models(&req)?.into_iter().map(Speaker2Model::from).collect();
    ok(CountedList::new(results).at(req.now))
}

pub(crate) async fn get(req: ActionRequest) -> AppResult<Response> {
    let repo = req.state.store.repository();
    let (camp, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.id()?)?;
    let mut model = SpeakerModel::from_speaker(&speaker, &camp.moniker, &req.ctx.base_url);
    if req.flag("includeTalks") {
        model.talks = Some(
            repo.talks(speaker.id).iter().map(|t| TalkModel::from_talk(t, &camp.moniker, &req.ctx.base_url)).collect(),
        );
    }
    ok(model)
}

/// The caller becomes the speaker's owner.
pub(crate) async fn create(req: ActionRequest) -> AppResult<Response> {
    let model: SpeakerModel = req.json()?;
    model.validate()?;
    let owner = req.principal()?.name.clone();
    let mut repo = req.state.store.repository();
    let moniker = &req.params.moniker;
    let camp = repo.camp(moniker).ok_or_else(|| AppError::not_found(format!("Camp {} was not found", moniker)))?;
    let mut speaker = model.to_speaker(camp.id, &owner);
    speaker.id = repo.add(Entity::Speaker(speaker.clone()));
    if !repo.save_all() {
        warn!(target: "api", camp = %camp.moniker, "could not save speaker");
        return Err(AppError::persistence("Could not save Speaker"));
    }
    info!(target: "api", camp = %camp.moniker, speaker = speaker.id, owner = %owner, "speaker created");
    created(
        &speaker_url(&req.ctx.base_url, &camp.moniker, speaker.id),
        SpeakerModel::from_speaker(&speaker, &camp.moniker, &req.ctx.base_url),
    )
}

pub(crate) async fn update(req: ActionRequest) -> AppResult<Response> {
    let model: SpeakerModel = req.json()?;
    model.validate()?;
    let mut repo = req.state.store.repository();
    let (camp, mut speaker) = speaker_in_camp(&repo, &req.params.moniker, req.id()?)?;
    ensure_owner(req.principal()?, &speaker.owner)?;
    model.apply_to(&mut speaker);
    repo.update(Entity::Speaker(speaker.clone()));
    if !repo.save_all() {
        warn!(target: "api", speaker = speaker.id, "could not update speaker");
        return Err(AppError::persistence("Could not update Speaker"));
    }
    ok(SpeakerModel::from_speaker(&speaker, &camp.moniker, &req.ctx.base_url))
}

pub(crate) async fn delete(req: ActionRequest) -> AppResult<Response> {
    let mut repo = req.state.store.repository();
    let (_, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.id()?)?;
    ensure_owner(req.principal()?, &speaker.owner)?;
    repo.delete(EntityKey::Speaker(speaker.id));
    if !repo.save_all() {
        warn!(target: "api", speaker = speaker.id, "could not delete speaker");
        return Err(AppError::persistence("Could not delete Speaker"));
    }
    empty()
}
