//! Read-only projections. Listings degrade to an empty result when storage
//! fails so a broken read never takes down the page; point lookups propagate.

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::{FrequencyBounds, Hardware, SkillFrequency, User};
use tracing::warn;

use crate::db::DbPool;
use crate::error::Result;
use crate::models::{EventRow, HardwareRow, OwnershipRow, SkillRow, UserRow};
use crate::schema::{events, hardware, hardware_owners, skills, users};

#[derive(Clone)]
pub struct RosterQueries {
    pool: DbPool,
}

impl RosterQueries {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_users(&self) -> Vec<User> {
        or_empty("users", self.try_list_users().await)
    }

    pub async fn get_user(&self, user_id: i32) -> Result<Option<User>> {
        let mut conn = self.pool.get().await?;
        load_user(&mut conn, user_id).await
    }

    pub async fn list_skill_frequency(&self, bounds: FrequencyBounds) -> Vec<SkillFrequency> {
        or_empty("skill frequencies", self.try_skill_frequency(bounds).await)
    }

    pub async fn list_hardware(&self) -> Vec<Hardware> {
        or_empty("hardware", self.try_list_hardware().await)
    }

    pub async fn get_hardware(&self, hardware_id: i32) -> Result<Option<Hardware>> {
        let mut conn = self.pool.get().await?;

        let item = hardware::table
            .find(hardware_id)
            .select(HardwareRow::as_select())
            .get_result::<HardwareRow>(&mut conn)
            .await
            .optional()?;

        let Some(item) = item else {
            return Ok(None);
        };

        let owners = OwnershipRow::belonging_to(&item)
            .select(OwnershipRow::as_select())
            .order(hardware_owners::user_id)
            .load::<OwnershipRow>(&mut conn)
            .await?;

        Ok(Some(item.into_hardware(owners)))
    }

    async fn try_list_users(&self) -> Result<Vec<User>> {
        let mut conn = self.pool.get().await?;

        let user_rows = users::table
            .order(users::id)
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)
            .await?;

        let skill_rows = SkillRow::belonging_to(&user_rows)
            .select(SkillRow::as_select())
            .order(skills::id)
            .load::<SkillRow>(&mut conn)
            .await?;
        let event_rows = EventRow::belonging_to(&user_rows)
            .select(EventRow::as_select())
            .order(events::id)
            .load::<EventRow>(&mut conn)
            .await?;
        let owned_rows = OwnershipRow::belonging_to(&user_rows)
            .select(OwnershipRow::as_select())
            .order(hardware_owners::hardware_id)
            .load::<OwnershipRow>(&mut conn)
            .await?;

        let skills = skill_rows.grouped_by(&user_rows);
        let events = event_rows.grouped_by(&user_rows);
        let owned = owned_rows.grouped_by(&user_rows);

        Ok(user_rows
            .into_iter()
            .zip(skills)
            .zip(events)
            .zip(owned)
            .map(|(((user, skills), events), owned)| user.into_user(skills, events, owned))
            .collect())
    }

    async fn try_skill_frequency(&self, bounds: FrequencyBounds) -> Result<Vec<SkillFrequency>> {
        let mut conn = self.pool.get().await?;

        // (user_id, skill) is unique, so the row count is the number of users
        let rows = skills::table
            .group_by(skills::skill)
            .select((skills::skill, count_star()))
            .order(skills::skill)
            .load::<(String, i64)>(&mut conn)
            .await?;

        let frequencies = rows
            .into_iter()
            .map(|(skill, frequency)| SkillFrequency { skill, frequency })
            .collect();

        Ok(bounds.retain(frequencies))
    }

    async fn try_list_hardware(&self) -> Result<Vec<Hardware>> {
        let mut conn = self.pool.get().await?;

        let items = hardware::table
            .order(hardware::id)
            .select(HardwareRow::as_select())
            .load::<HardwareRow>(&mut conn)
            .await?;

        let owners = OwnershipRow::belonging_to(&items)
            .select(OwnershipRow::as_select())
            .order(hardware_owners::user_id)
            .load::<OwnershipRow>(&mut conn)
            .await?
            .grouped_by(&items);

        Ok(items
            .into_iter()
            .zip(owners)
            .map(|(item, owners)| item.into_hardware(owners))
            .collect())
    }
}

/// Loads one user with skills, events and owned hardware attached.
pub async fn load_user(conn: &mut AsyncPgConnection, user_id: i32) -> Result<Option<User>> {
    let user = users::table
        .find(user_id)
        .select(UserRow::as_select())
        .get_result::<UserRow>(conn)
        .await
        .optional()?;

    let Some(user) = user else {
        return Ok(None);
    };

    let skills = SkillRow::belonging_to(&user)
        .select(SkillRow::as_select())
        .order(skills::id)
        .load::<SkillRow>(conn)
        .await?;
    let events = EventRow::belonging_to(&user)
        .select(EventRow::as_select())
        .order(events::id)
        .load::<EventRow>(conn)
        .await?;
    let owned = OwnershipRow::belonging_to(&user)
        .select(OwnershipRow::as_select())
        .order(hardware_owners::hardware_id)
        .load::<OwnershipRow>(conn)
        .await?;

    Ok(Some(user.into_user(skills, events, owned)))
}

fn or_empty<T>(what: &str, result: Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Listing {} failed, returning empty result: {}", what, e);
            Vec::new()
        }
    }
}
