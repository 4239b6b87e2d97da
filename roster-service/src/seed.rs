//! One-shot import of the initial roster from a JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use shared::{plan_skill_merge, SkillInput};
use tracing::info;

use crate::db::DbPool;
use crate::models::{NewHardware, NewSkill, NewUser};
use crate::schema::{hardware, skills, users};

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub skills: Vec<SkillInput>,
}

impl SeedUser {
    /// One entry per skill name, carrying the last rating listed for it.
    pub fn distinct_skills(&self) -> Vec<SkillInput> {
        plan_skill_merge(&[], &self.skills).inserts
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedHardware {
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub hardware: Vec<SeedHardware>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    UsersOnly(Vec<SeedUser>),
    Full(SeedData),
}

impl SeedData {
    /// Accepts either `{"users": [...], "hardware": [...]}` or a bare array
    /// of users.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SeedDocument = serde_json::from_str(json).context("invalid seed document")?;
        let data = match document {
            SeedDocument::Full(data) => data,
            SeedDocument::UsersOnly(users) => SeedData {
                users,
                hardware: Vec::new(),
            },
        };

        if let Some(bad) = data.hardware.iter().find(|h| h.quantity < 0) {
            anyhow::bail!("hardware {} has negative quantity {}", bad.name, bad.quantity);
        }
        Ok(data)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Imports `data` unless the roster already has users. Returns whether
/// anything was written.
pub async fn seed_if_empty(pool: &DbPool, data: SeedData) -> Result<bool> {
    let mut conn = pool.get().await?;

    let existing: i64 = users::table.count().get_result(&mut conn).await?;
    if existing > 0 {
        info!("Skipping seed import, {} users already present", existing);
        return Ok(false);
    }

    import(&mut conn, data).await?;
    Ok(true)
}

async fn import(conn: &mut AsyncPgConnection, data: SeedData) -> Result<()> {
    let (user_count, hardware_count) = (data.users.len(), data.hardware.len());

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        Box::pin(async move {
            for person in &data.users {
                let user_id: i32 = diesel::insert_into(users::table)
                    .values(&NewUser {
                        name: &person.name,
                        company: person.company.as_deref(),
                        email: &person.email,
                        phone: &person.phone,
                    })
                    .returning(users::id)
                    .get_result(conn)
                    .await?;

                let distinct = person.distinct_skills();
                let rows: Vec<NewSkill<'_>> = distinct
                    .iter()
                    .map(|s| NewSkill {
                        user_id,
                        skill: &s.skill,
                        rating: s.rating,
                    })
                    .collect();

                if !rows.is_empty() {
                    diesel::insert_into(skills::table)
                        .values(&rows)
                        .execute(conn)
                        .await?;
                }
            }

            for item in &data.hardware {
                diesel::insert_into(hardware::table)
                    .values(&NewHardware {
                        name: &item.name,
                        total_quantity: item.quantity,
                        available_quantity: item.quantity,
                    })
                    .execute(conn)
                    .await?;
            }

            Ok(())
        })
    })
    .await?;

    info!(
        "Seeded {} users and {} hardware items",
        user_count, hardware_count
    );
    Ok(())
}
