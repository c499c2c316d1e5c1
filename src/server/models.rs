//! Client-facing JSON shapes, their validation, and mapping to and from stored entities.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FieldErrors};
use crate::storage::{Camp, Location, Speaker, Talk};

// No whitespace, path or query delimiters, or control characters.
static MONIKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s/?#%\p{Cc}]+$").unwrap());

/// Accumulates per-field validation failures.
#[derive(Default)]
struct Checks(FieldErrors);

impl Checks {
    fn fail(&mut self, field: &str, msg: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(msg.into());
    }

    fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(_) => value,
            None => { self.fail(field, format!("The {} field is required.", field)); None }
        }
    }

    fn length(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) {
        let Some(v) = value else { return };
        let n = v.chars().count();
        if n < min || n > max {
            self.fail(field, format!("The field {} must be between {} and {} characters long.", field, min, max));
        }
    }

    fn range(&mut self, field: &str, value: Option<i32>, min: i32, max: i32) {
        match value {
            Some(v) if (min..=max).contains(&v) => {}
            _ => self.fail(field, format!("The field {} must be between {} and {}.", field, min, max)),
        }
    }

    fn finish(self) -> AppResult<()> {
        if self.0.is_empty() { Ok(()) } else { Err(AppError::validation(self.0)) }
    }
}

/// Canonical camp URL; the moniker is percent-encoded as one path segment.
pub fn camp_url(base: &str, moniker: &str) -> String { format!("{}/api/camps/{}", base, urlencoding::encode(moniker)) }

pub fn speaker_url(base: &str, moniker: &str, id: i32) -> String { format!("{}/speakers/{}", camp_url(base, moniker), id) }

pub fn talk_url(base: &str, moniker: &str, speaker_id: i32, id: i32) -> String {
    format!("{}/talks/{}", speaker_url(base, moniker, speaker_id), id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampModel {
    #[serde(skip_deserializing)]
    pub url: String,
    pub moniker: Option<String>,
    pub name: Option<String>,
    pub event_date: Option<NaiveDateTime>,
    pub length: Option<i32>,
    pub description: Option<String>,
    pub location_address1: Option<String>,
    pub location_address2: Option<String>,
    pub location_address3: Option<String>,
    pub location_city_town: Option<String>,
    pub location_state_province: Option<String>,
    pub location_postal_code: Option<String>,
    pub location_country: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub speakers: Option<Vec<SpeakerModel>>,
}

impl CampModel {
    pub fn validate(&self) -> AppResult<()> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name.as_deref());
        checks.length("name", name, 5, 100);
        if let Some(m) = checks.required("moniker", self.moniker.as_deref()) {
            if !MONIKER_RE.is_match(m) {
                checks.fail("moniker", "The moniker may not contain whitespace, control characters or any of '/?#%'.");
            }
        }
        let description = checks.required("description", self.description.as_deref());
        checks.length("description", description, 25, 4096);
        if self.length.is_some() {
            checks.range("length", self.length, 1, i32::MAX);
        }
        checks.finish()
    }

    pub fn from_camp(camp: &Camp, base: &str) -> Self {
        let loc = &camp.location;
        Self {
            url: camp_url(base, &camp.moniker),
            moniker: Some(camp.moniker.clone()),
            name: Some(camp.name.clone()),
            event_date: Some(camp.event_date),
            length: Some(camp.length),
            description: Some(camp.description.clone()),
            location_address1: loc.address1.clone(),
            location_address2: loc.address2.clone(),
            location_address3: loc.address3.clone(),
            location_city_town: loc.city_town.clone(),
            location_state_province: loc.state_province.clone(),
            location_postal_code: loc.postal_code.clone(),
            location_country: loc.country.clone(),
            speakers: None,
        }
    }

    /// Overwrite `camp` with this (validated) model. An absent event date or length keeps the stored one.
    pub fn apply_to(&self, camp: &mut Camp) {
        camp.moniker = self.moniker.clone().unwrap_or_default();
        camp.name = self.name.clone().unwrap_or_default();
        camp.description = self.description.clone().unwrap_or_default();
        if let Some(d) = self.event_date { camp.event_date = d; }
        if let Some(l) = self.length { camp.length = l; }
        camp.location = Location {
            address1: self.location_address1.clone(),
            address2: self.location_address2.clone(),
            address3: self.location_address3.clone(),
            city_town: self.location_city_town.clone(),
            state_province: self.location_state_province.clone(),
            postal_code: self.location_postal_code.clone(),
            country: self.location_country.clone(),
        };
    }

    pub fn to_camp(&self) -> Camp {
        let mut camp = Camp {
            id: 0,
            moniker: String::new(),
            name: String::new(),
            event_date: NaiveDateTime::default(),
            length: 1,
            description: String::new(),
            location: Location::default(),
        };
        self.apply_to(&mut camp);
        camp
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeakerModel {
    #[serde(skip_deserializing)]
    pub url: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub phone_number: Option<String>,
    pub website_url: Option<String>,
    pub twitter_name: Option<String>,
    #[serde(rename = "gitHubName")]
    pub github_name: Option<String>,
    pub bio: Option<String>,
    pub head_shot_url: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub talks: Option<Vec<TalkModel>>,
}

impl SpeakerModel {
    pub fn validate(&self) -> AppResult<()> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name.as_deref());
        checks.length("name", name, 5, 100);
        checks.length("bio", self.bio.as_deref(), 0, 4096);
        checks.finish()
    }

    pub fn from_speaker(speaker: &Speaker, moniker: &str, base: &str) -> Self {
        Self {
            url: speaker_url(base, moniker, speaker.id),
            name: Some(speaker.name.clone()),
            company_name: speaker.company_name.clone(),
            phone_number: speaker.phone_number.clone(),
            website_url: speaker.website_url.clone(),
            twitter_name: speaker.twitter_name.clone(),
            github_name: speaker.github_name.clone(),
            bio: speaker.bio.clone(),
            head_shot_url: speaker.headshot_url.clone(),
            talks: None,
        }
    }

    pub fn apply_to(&self, speaker: &mut Speaker) {
        speaker.name = self.name.clone().unwrap_or_default();
        speaker.company_name = self.company_name.clone();
        speaker.phone_number = self.phone_number.clone();
        speaker.website_url = self.website_url.clone();
        speaker.twitter_name = self.twitter_name.clone();
        speaker.github_name = self.github_name.clone();
        speaker.bio = self.bio.clone();
        speaker.headshot_url = self.head_shot_url.clone();
    }

    pub fn to_speaker(&self, camp_id: i32, owner: &str) -> Speaker {
        let mut speaker = Speaker {
            id: 0,
            camp_id,
            owner: owner.to_string(),
            name: String::new(),
            company_name: None,
            phone_number: None,
            website_url: None,
            twitter_name: None,
            github_name: None,
            bio: None,
            headshot_url: None,
        };
        self.apply_to(&mut speaker);
        speaker
    }
}

/// Speaker shape served from version 2.0 on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker2Model {
    #[serde(flatten)]
    pub speaker: SpeakerModel,
    pub badge_name: String,
}

impl From<SpeakerModel> for Speaker2Model {
    fn from(speaker: SpeakerModel) -> Self {
        let name = speaker.name.clone().unwrap_or_default();
        let badge_name = match speaker.twitter_name.as_deref().filter(|t| !t.is_empty()) {
            Some(t) => format!("{} (@{})", name, t),
            None => name,
        };
        Self { speaker, badge_name }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TalkModel {
    #[serde(skip_deserializing)]
    pub url: String,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub category: Option<String>,
    pub level: Option<i32>,
    pub prerequisites: Option<String>,
    pub starting_time: Option<NaiveDateTime>,
    pub room: Option<String>,
}

impl TalkModel {
    pub fn validate(&self) -> AppResult<()> {
        let mut checks = Checks::default();
        let title = checks.required("title", self.title.as_deref());
        checks.length("title", title, 1, 100);
        let summary = checks.required("abstract", self.summary.as_deref());
        checks.length("abstract", summary, 10, 4096);
        checks.range("level", self.level, 100, 400);
        checks.finish()
    }

    pub fn from_talk(talk: &Talk, moniker: &str, base: &str) -> Self {
        Self {
            url: talk_url(base, moniker, talk.speaker_id, talk.id),
            title: Some(talk.title.clone()),
            summary: Some(talk.summary.clone()),
            category: talk.category.clone(),
            level: Some(talk.level),
            prerequisites: talk.prerequisites.clone(),
            starting_time: Some(talk.starting_time),
            room: talk.room.clone(),
        }
    }

    pub fn apply_to(&self, talk: &mut Talk) {
        talk.title = self.title.clone().unwrap_or_default();
        talk.summary = self.summary.clone().unwrap_or_default();
        talk.category = self.category.clone();
        if let Some(l) = self.level { talk.level = l; }
        talk.prerequisites = self.prerequisites.clone();
        if let Some(t) = self.starting_time { talk.starting_time = t; }
        talk.room = self.room.clone();
    }

    pub fn to_talk(&self, speaker_id: i32) -> Talk {
        let mut talk = Talk {
            id: 0,
            speaker_id,
            title: String::new(),
            summary: String::new(),
            category: None,
            level: 100,
            prerequisites: None,
            starting_time: NaiveDateTime::default(),
            room: None,
        };
        self.apply_to(&mut talk);
        talk
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialModel {
    #[serde(rename = "userName", alias = "username")]
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialModel {
    pub fn validate(&self) -> AppResult<()> {
        let mut checks = Checks::default();
        checks.required("userName", self.username.as_deref());
        checks.finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expiration: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedList<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_time: Option<DateTime<Utc>>,
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> CountedList<T> {
    pub fn new(results: Vec<T>) -> Self { Self { current_time: None, count: results.len(), results } }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.current_time = Some(now);
        self
    }
}
