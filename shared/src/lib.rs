use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

mod error;
mod frequency;
mod skills;
mod stock;

pub use error::{DomainError, Entity};
pub use frequency::FrequencyBounds;
pub use skills::{plan_skill_merge, SkillMergePlan, SkillRatingUpdate};
pub use stock::{ensure_available, ensure_owned, validate_quantity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub skills: Vec<Skill>,
    pub events: Vec<Event>,
    pub owned_hardware: Vec<Ownership>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i32,
    pub user_id: i32,
    pub skill: String,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i32,
    pub user_id: i32,
    pub event: String,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hardware {
    pub id: i32,
    pub name: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub owners: Vec<Ownership>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub hardware_id: i32,
    pub user_id: i32,
    pub owned_quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFrequency {
    pub skill: String,
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInput {
    pub skill: String,
    pub rating: i32,
}

/// Profile fields for a partial update. A field is only written when it is
/// present and not the empty string; there is no way to clear a field
/// through it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ProfilePatch {
    /// Drops empty values so every remaining `Some` is a field to overwrite.
    pub fn normalized(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }

        Self {
            name: keep(self.name),
            company: keep(self.company),
            email: keep(self.email),
            phone: keep(self.phone),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.company.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(flatten)]
    pub profile: ProfilePatch,
    #[serde(default)]
    pub skills: Option<Vec<SkillInput>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub recorded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityRequest {
    pub user_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerResponse {
    pub success: bool,
}
