use tracing::{debug, warn};

use super::{Camp, Entity, EntityKey, SharedStore, Speaker, Tables, Talk};

/// Data-access interface the resource handlers work against.
///
/// Reads see committed data only. Writes are staged and become visible together when
/// `save_all` returns `true`; on `false` nothing staged is applied.
pub trait CampRepository: Send {
    fn all_camps(&self) -> Vec<Camp>;
    fn camp(&self, moniker: &str) -> Option<Camp>;
    fn speakers(&self, moniker: &str) -> Vec<Speaker>;
    fn speaker(&self, id: i32) -> Option<Speaker>;
    fn talks(&self, speaker_id: i32) -> Vec<Talk>;
    fn talk(&self, id: i32) -> Option<Talk>;
    /// Stage a new row and return the id it will be stored under.
    fn add(&mut self, entity: Entity) -> i32;
    fn update(&mut self, entity: Entity);
    fn delete(&mut self, key: EntityKey);
    fn save_all(&mut self) -> bool;
}

#[derive(Debug, Clone)]
enum Change {
    Insert(Entity),
    Update(Entity),
    Delete(EntityKey),
}

/// Unit of work over a [`SharedStore`].
pub struct MemoryRepository {
    store: SharedStore,
    staged: Vec<Change>,
}

impl MemoryRepository {
    pub fn new(store: SharedStore) -> Self { Self { store, staged: Vec::new() } }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T { f(&self.store.0.lock().tables) }
}

fn moniker_taken(tables: &Tables, camp: &Camp) -> bool {
    tables.camps.values().any(|c| c.id != camp.id && c.moniker.eq_ignore_ascii_case(&camp.moniker))
}

fn apply(tables: &mut Tables, change: &Change) -> Result<(), String> {
    match change {
        Change::Insert(entity) | Change::Update(entity) => {
            let is_insert = matches!(change, Change::Insert(_));
            match entity {
                Entity::Camp(c) => {
                    if is_insert == tables.camps.contains_key(&c.id) { return Err(format!("camp {} in wrong state", c.id)); }
                    if moniker_taken(tables, c) { return Err(format!("moniker '{}' already in use", c.moniker)); }
                    tables.camps.insert(c.id, c.clone());
                }
                Entity::Speaker(s) => {
                    if is_insert == tables.speakers.contains_key(&s.id) { return Err(format!("speaker {} in wrong state", s.id)); }
                    if !tables.camps.contains_key(&s.camp_id) { return Err(format!("camp {} does not exist", s.camp_id)); }
                    tables.speakers.insert(s.id, s.clone());
                }
                Entity::Talk(t) => {
                    if is_insert == tables.talks.contains_key(&t.id) { return Err(format!("talk {} in wrong state", t.id)); }
                    if !tables.speakers.contains_key(&t.speaker_id) { return Err(format!("speaker {} does not exist", t.speaker_id)); }
                    tables.talks.insert(t.id, t.clone());
                }
            }
        }
        Change::Delete(EntityKey::Camp(id)) => {
            tables.camps.remove(id).ok_or_else(|| format!("camp {} does not exist", id))?;
            let speakers: Vec<i32> = tables.speakers.values().filter(|s| s.camp_id == *id).map(|s| s.id).collect();
            for sid in speakers {
                tables.speakers.remove(&sid);
                tables.talks.retain(|_, t| t.speaker_id != sid);
            }
        }
        Change::Delete(EntityKey::Speaker(id)) => {
            tables.speakers.remove(id).ok_or_else(|| format!("speaker {} does not exist", id))?;
            tables.talks.retain(|_, t| t.speaker_id != *id);
        }
        Change::Delete(EntityKey::Talk(id)) => {
            tables.talks.remove(id).ok_or_else(|| format!("talk {} does not exist", id))?;
        }
    }
    Ok(())
}

impl CampRepository for MemoryRepository {
    fn all_camps(&self) -> Vec<Camp> {
        self.read(|t| t.camps.values().cloned().collect())
    }

    fn camp(&self, moniker: &str) -> Option<Camp> {
        self.read(|t| t.camp_by_moniker(moniker).cloned())
    }

    fn speakers(&self, moniker: &str) -> Vec<Speaker> {
        self.read(|t| {
            let Some(camp) = t.camp_by_moniker(moniker) else { return Vec::new() };
            t.speakers.values().filter(|s| s.camp_id == camp.id).cloned().collect()
        })
    }

    fn speaker(&self, id: i32) -> Option<Speaker> {
        self.read(|t| t.speakers.get(&id).cloned())
    }

    fn talks(&self, speaker_id: i32) -> Vec<Talk> {
        self.read(|t| t.talks.values().filter(|x| x.speaker_id == speaker_id).cloned().collect())
    }

    fn talk(&self, id: i32) -> Option<Talk> {
        self.read(|t| t.talks.get(&id).cloned())
    }

    fn add(&mut self, mut entity: Entity) -> i32 {
        let id = self.store.reserve_id();
        entity.set_id(id);
        self.staged.push(Change::Insert(entity));
        id
    }

    fn update(&mut self, entity: Entity) { self.staged.push(Change::Update(entity)); }

    fn delete(&mut self, key: EntityKey) { self.staged.push(Change::Delete(key)); }

    fn save_all(&mut self) -> bool {
        let staged = std::mem::take(&mut self.staged);
        let mut store = self.store.0.lock();
        if store.read_only {
            warn!(target: "storage", changes = staged.len(), "store is read-only; discarding staged changes");
            return false;
        }
        // Apply to a scratch copy so a failing change leaves the committed tables untouched.
        let mut next = store.tables.clone();
        for change in &staged {
            if let Err(reason) = apply(&mut next, change) {
                warn!(target: "storage", %reason, "save rejected; no changes applied");
                return false;
            }
        }
        store.tables = next;
        debug!(target: "storage", changes = staged.len(), "changes saved");
        true
    }
}
