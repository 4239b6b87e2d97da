use diesel::prelude::*;
use chrono::{DateTime, Utc};
use shared::{Event, Hardware, Ownership, ProfilePatch, Skill, User};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::users)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub company: Option<&'a str>,
    pub email: &'a str,
    pub phone: &'a str,
}

/// `None` fields are left out of the UPDATE entirely.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::users)]
pub struct UserChangeset {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserChangeset {
    pub fn from_patch(patch: ProfilePatch, updated_at: DateTime<Utc>) -> Self {
        let patch = patch.normalized();
        Self {
            name: patch.name,
            company: patch.company,
            email: patch.email,
            phone: patch.phone,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(belongs_to(UserRow, foreign_key = user_id))]
#[diesel(table_name = crate::schema::skills)]
pub struct SkillRow {
    pub id: i32,
    pub user_id: i32,
    pub skill: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::skills)]
pub struct NewSkill<'a> {
    pub user_id: i32,
    pub skill: &'a str,
    pub rating: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(belongs_to(UserRow, foreign_key = user_id))]
#[diesel(table_name = crate::schema::events)]
pub struct EventRow {
    pub id: i32,
    pub user_id: i32,
    pub event: String,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::events)]
pub struct NewEvent<'a> {
    pub user_id: i32,
    pub event: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::schema::hardware)]
pub struct HardwareRow {
    pub id: i32,
    pub name: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::hardware)]
pub struct NewHardware<'a> {
    pub name: &'a str,
    pub total_quantity: i32,
    pub available_quantity: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(belongs_to(UserRow, foreign_key = user_id))]
#[diesel(belongs_to(HardwareRow, foreign_key = hardware_id))]
#[diesel(primary_key(hardware_id, user_id))]
#[diesel(table_name = crate::schema::hardware_owners)]
pub struct OwnershipRow {
    pub hardware_id: i32,
    pub user_id: i32,
    pub owned_quantity: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::hardware_owners)]
pub struct NewOwnership {
    pub hardware_id: i32,
    pub user_id: i32,
    pub owned_quantity: i32,
}

impl From<SkillRow> for Skill {
    fn from(row: SkillRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            skill: row.skill,
            rating: row.rating,
        }
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            event: row.event,
            scanned_at: row.scanned_at,
        }
    }
}

impl From<OwnershipRow> for Ownership {
    fn from(row: OwnershipRow) -> Self {
        Self {
            hardware_id: row.hardware_id,
            user_id: row.user_id,
            owned_quantity: row.owned_quantity,
        }
    }
}

impl UserRow {
    pub fn into_user(self, skills: Vec<SkillRow>, events: Vec<EventRow>, owned: Vec<OwnershipRow>) -> User {
        User {
            id: self.id,
            name: self.name,
            company: self.company,
            email: self.email,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
            skills: skills.into_iter().map(Skill::from).collect(),
            events: events.into_iter().map(Event::from).collect(),
            owned_hardware: owned.into_iter().map(Ownership::from).collect(),
        }
    }
}

impl HardwareRow {
    pub fn into_hardware(self, owners: Vec<OwnershipRow>) -> Hardware {
        Hardware {
            id: self.id,
            name: self.name,
            total_quantity: self.total_quantity,
            available_quantity: self.available_quantity,
            owners: owners.into_iter().map(Ownership::from).collect(),
        }
    }
}
