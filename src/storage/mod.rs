//!
//! codecamp storage module
//! -----------------------
//! In-process store for camps, their speakers and the speakers' talks.
//!
//! The public API centers around the `Store` type, wrapped in a thread-safe
//! `SharedStore` (`Arc<Mutex<Store>>`). Callers never mutate the store directly: they
//! open a [`MemoryRepository`] (a unit of work), stage adds, updates and deletes, and
//! commit them with `save_all`. A commit applies every staged change or none of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

mod repository;

pub use repository::{CampRepository, MemoryRepository};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub address3: Option<String>,
    pub city_town: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camp {
    pub id: i32,
    /// Unique human key, matched case-insensitively.
    pub moniker: String,
    pub name: String,
    pub event_date: NaiveDateTime,
    pub length: i32,
    pub description: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub id: i32,
    pub camp_id: i32,
    /// Username of the identity that created the speaker.
    pub owner: String,
    pub name: String,
    pub company_name: Option<String>,
    pub phone_number: Option<String>,
    pub website_url: Option<String>,
    pub twitter_name: Option<String>,
    pub github_name: Option<String>,
    pub bio: Option<String>,
    pub headshot_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Talk {
    pub id: i32,
    pub speaker_id: i32,
    pub title: String,
    pub summary: String,
    pub category: Option<String>,
    pub level: i32,
    pub prerequisites: Option<String>,
    pub starting_time: NaiveDateTime,
    pub room: Option<String>,
}

/// Any stored row, as staged by a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Camp(Camp),
    Speaker(Speaker),
    Talk(Talk),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKey {
    Camp(i32),
    Speaker(i32),
    Talk(i32),
}

impl Entity {
    fn set_id(&mut self, id: i32) {
        match self {
            Entity::Camp(c) => c.id = id,
            Entity::Speaker(s) => s.id = id,
            Entity::Talk(t) => t.id = id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) camps: BTreeMap<i32, Camp>,
    pub(crate) speakers: BTreeMap<i32, Speaker>,
    pub(crate) talks: BTreeMap<i32, Talk>,
}

impl Tables {
    pub(crate) fn camp_by_moniker(&self, moniker: &str) -> Option<&Camp> {
        self.camps.values().find(|c| c.moniker.eq_ignore_ascii_case(moniker))
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub(crate) tables: Tables,
    next_id: i32,
    /// When set every commit fails; used to exercise the persistence failure path.
    read_only: bool,
}

#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new() -> Self { Self::default() }

    /// Open a unit of work over this store.
    pub fn repository(&self) -> MemoryRepository { MemoryRepository::new(self.clone()) }

    pub fn set_read_only(&self, read_only: bool) { self.0.lock().read_only = read_only; }

    pub(crate) fn reserve_id(&self) -> i32 {
        let mut store = self.0.lock();
        store.next_id += 1;
        store.next_id
    }
}
