//! First-run data: the admin identity and a demo camp. Both steps are idempotent.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::identity::{types, Claim, IdentityStore, NewIdentity};
use crate::storage::{Camp, CampRepository, Entity, Location, SharedStore, Speaker, Talk};

pub const ADMIN_ROLE: &str = "Admin";
pub const SEED_USER: &str = "vioflu";
pub const SEED_PASSWORD: &str = "P@ssw0rd";
pub const SEED_CAMP: &str = "ATL2016";

pub fn seed_identities(store: &IdentityStore) -> Result<()> {
    if store.find_by_name(SEED_USER).is_some() {
        return Ok(());
    }
    if !store.role_exists(ADMIN_ROLE) {
        store.create_role(ADMIN_ROLE)?;
        store.add_role_claim(ADMIN_ROLE, Claim::new(types::IS_ADMIN, "True"))?;
    }
    let user = NewIdentity {
        username: SEED_USER.into(),
        first_name: SEED_USER.into(),
        last_name: SEED_USER.into(),
        email: "vf@gmail.com".into(),
    };
    store.create_user(user, SEED_PASSWORD).context("Failed to build user and roles")?;
    store.add_to_role(SEED_USER, ADMIN_ROLE).context("Failed to build user and roles")?;
    store.add_claim(SEED_USER, Claim::new(types::SUPER_USER, "True")).context("Failed to build user and roles")?;
    info!(target: "seed", user = SEED_USER, role = ADMIN_ROLE, "seeded admin identity");
    Ok(())
}

pub fn seed_camps(store: &SharedStore) -> Result<()> {
    let mut repo = store.repository();
    if !repo.all_camps().is_empty() {
        return Ok(());
    }
    let day = NaiveDate::from_ymd_opt(2016, 10, 18).context("seed date")?;
    let at = |h: u32| day.and_hms_opt(h, 0, 0).context("seed time");

    let camp_id = repo.add(Entity::Camp(Camp {
        id: 0,
        moniker: SEED_CAMP.into(),
        name: "Your First Code Camp".into(),
        event_date: at(9)?,
        length: 1,
        description: "This is the first code camp".into(),
        location: Location {
            address1: Some("123 Main Street".into()),
            city_town: Some("Atlanta".into()),
            state_province: Some("GA".into()),
            postal_code: Some("12345".into()),
            country: Some("USA".into()),
            ..Location::default()
        },
    }));
    let speaker_id = repo.add(Entity::Speaker(Speaker {
        id: 0,
        camp_id,
        owner: SEED_USER.into(),
        name: "Shawn Wildermuth".into(),
        company_name: Some("Wilder Minds LLC".into()),
        phone_number: Some("555-1212".into()),
        website_url: Some("http://wildermuth.com".into()),
        twitter_name: Some("shawnwildermuth".into()),
        github_name: Some("shawnwildermuth".into()),
        bio: Some("I'm a speaker".into()),
        headshot_url: Some("http://wilderminds.blob.core.windows.net/img/headshot.jpg".into()),
    }));
    for (title, summary, category, level, room, hour) in [
        ("How to do ASP.NET Core", "How to do ASP.NET Core from start to finish", "Web Development", 100, "Room 101", 13),
        ("How to do Bootstrap 4", "How to do Bootstrap 4 with responsive layouts", "Web Development", 200, "Room 102", 15),
    ] {
        repo.add(Entity::Talk(Talk {
            id: 0,
            speaker_id,
            title: title.into(),
            summary: summary.into(),
            category: Some(category.into()),
            level,
            prerequisites: Some("C# experience".into()),
            starting_time: at(hour)?,
            room: Some(room.into()),
        }));
    }
    if !repo.save_all() {
        bail!("could not save seed camp {}", SEED_CAMP);
    }
    info!(target: "seed", camp = SEED_CAMP, "seeded demo camp");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::effective_claims;

    #[test]
    fn seeding_twice_is_harmless() {
        let ids = IdentityStore::new();
        seed_identities(&ids).unwrap();
        seed_identities(&ids).unwrap();
        let claims = effective_claims(&ids.claims_of(SEED_USER), &ids.roles_of(SEED_USER));
        assert!(claims.has(types::SUPER_USER, "True"));
        assert!(claims.has(types::IS_ADMIN, "True"));

        let store = SharedStore::new();
        seed_camps(&store).unwrap();
        seed_camps(&store).unwrap();
        let repo = store.repository();
        assert_eq!(repo.all_camps().len(), 1);
        let speakers = repo.speakers(SEED_CAMP);
        assert_eq!(speakers.len(), 1);
        assert_eq!(speakers[0].owner, SEED_USER);
        assert_eq!(repo.talks(speakers[0].id).len(), 2);
    }
}
