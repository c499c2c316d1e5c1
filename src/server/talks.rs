use axum::response::Response;
use tracing::warn;

use super::dispatch::{created, empty, ok, ActionRequest};
use super::models::{talk_url, TalkModel};
use super::speakers::speaker_in_camp;
use crate::error::{AppError, AppResult};
use crate::identity::ensure_owner;
use crate::storage::{CampRepository, Entity, EntityKey, Talk};

fn talk_of_speaker(repo: &impl CampRepository, speaker_id: i32, id: i32) -> AppResult<Talk> {
    let talk = repo.talk(id).ok_or_else(|| AppError::not_found(format!("Talk {} was not found", id)))?;
    if talk.speaker_id != speaker_id {
        return Err(AppError::mismatch("Talk and Speaker do not match"));
    }
    Ok(talk)
}

pub(crate) async fn list(req: ActionRequest) -> AppResult<Response> {
    let repo = req.state.store.repository();
    let (camp, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.speaker_id()?)?;
    let base = &req.ctx.base_url;
    ok(repo.talks(speaker.id).iter().map(|t| TalkModel::from_talk(t, &camp.moniker, base)).collect::<Vec<_>>())
}

pub(crate) async fn get(req: ActionRequest) -> AppResult<Response> {
    let repo = req.state.store.repository();
    let (camp, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.speaker_id()?)?;
    let talk = talk_of_speaker(&repo, speaker.id, req.id()?)?;
    ok(TalkModel::from_talk(&talk, &camp.moniker, &req.ctx.base_url))
}

/// Only the speaker's owner may add talks.
pub(crate) async fn create(req: ActionRequest) -> AppResult<Response> {
    let model: TalkModel = req.json()?;
    model.validate()?;
    let mut repo = req.state.store.repository();
    let (camp, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.speaker_id()?)?;
    ensure_owner(req.principal()?, &speaker.owner)?;
    let mut talk = model.to_talk(speaker.id);
    talk.id = repo.add(Entity::Talk(talk.clone()));
    if !repo.save_all() {
        warn!(target: "api", speaker = speaker.id, "could not save talk");
        return Err(AppError::persistence("Could not save Talk"));
    }
    created(
        &talk_url(&req.ctx.base_url, &camp.moniker, speaker.id, talk.id),
        TalkModel::from_talk(&talk, &camp.moniker, &req.ctx.base_url),
    )
}

pub(crate) async fn update(req: ActionRequest) -> AppResult<Response> {
    let model: TalkModel = req.json()?;
    model.validate()?;
    let mut repo = req.state.store.repository();
    let (camp, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.speaker_id()?)?;
    let mut talk = talk_of_speaker(&repo, speaker.id, req.id()?)?;
    ensure_owner(req.principal()?, &speaker.owner)?;
    model.apply_to(&mut talk);
    repo.update(Entity::Talk(talk.clone()));
    if !repo.save_all() {
        warn!(target: "api", talk = talk.id, "could not update talk");
        return Err(AppError::persistence("Could not update Talk"));
    }
    ok(TalkModel::from_talk(&talk, &camp.moniker, &req.ctx.base_url))
}

pub(crate) async fn delete(req: ActionRequest) -> AppResult<Response> {
    let mut repo = req.state.store.repository();
    let (_, speaker) = speaker_in_camp(&repo, &req.params.moniker, req.speaker_id()?)?;
    let talk = talk_of_speaker(&repo, speaker.id, req.id()?)?;
    ensure_owner(req.principal()?, &speaker.owner)?;
    repo.delete(EntityKey::Talk(talk.id));
    if !repo.save_all() {
        warn!(target: "api", talk = talk.id, "could not delete talk");
        return Err(AppError::persistence("Could not delete Talk"));
    }
    empty()
}
