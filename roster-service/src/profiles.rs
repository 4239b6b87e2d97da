use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::{plan_skill_merge, DomainError, Skill, SkillInput, SkillMergePlan, User, UserUpdate};
use tracing::{debug, info};

use crate::db::DbPool;
use crate::error::{Result, ServiceError};
use crate::guards::{ensure_user, lock_user};
use crate::models::{NewEvent, NewSkill, SkillRow, UserChangeset};
use crate::queries::load_user;
use crate::schema::{events, skills, users};

/// Profile edits, skill merges and event scans for a single user.
#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
}

impl UserService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Applies every present profile field, merges `skills` when given and
    /// returns the user as stored afterwards.
    pub async fn update_user(&self, user_id: i32, update: UserUpdate) -> Result<User> {
        let mut pooled = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
                lock_user(conn, user_id).await?;

                let changes = UserChangeset::from_patch(update.profile, Utc::now());
                diesel::update(users::table.find(user_id))
                    .set(&changes)
                    .execute(conn)
                    .await?;

                if let Some(incoming) = update.skills {
                    merge_skills(conn, user_id, &incoming).await?;
                }

                Ok::<_, ServiceError>(())
            })
        })
        .await?;

        info!("Updated user {}", user_id);

        load_user(conn, user_id)
            .await?
            .ok_or_else(|| ServiceError::from(DomainError::user_not_found(user_id)))
    }

    /// Records that `user_id` was scanned at `event`. Returns `false` when the
    /// pair was already on record.
    pub async fn record_scan(&self, user_id: i32, event: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        ensure_user(&mut conn, user_id).await?;

        let inserted = diesel::insert_into(events::table)
            .values(&NewEvent { user_id, event })
            .on_conflict((events::user_id, events::event))
            .do_nothing()
            .execute(&mut conn)
            .await?;

        if inserted == 0 {
            debug!("User {} already scanned for {}", user_id, event);
            return Ok(false);
        }

        info!("User {} scanned for {}", user_id, event);
        Ok(true)
    }
}

/// Folds `incoming` into the user's skills by name. Must run inside the
/// caller's transaction, after the user row has been locked.
pub async fn merge_skills(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    incoming: &[SkillInput],
) -> Result<SkillMergePlan> {
    let existing: Vec<Skill> = skills::table
        .filter(skills::user_id.eq(user_id))
        .select(SkillRow::as_select())
        .load::<SkillRow>(conn)
        .await?
        .into_iter()
        .map(Skill::from)
        .collect();

    let plan = plan_skill_merge(&existing, incoming);

    for update in &plan.updates {
        diesel::update(skills::table.find(update.skill_id))
            .set(skills::rating.eq(update.rating))
            .execute(conn)
            .await?;
    }

    if !plan.inserts.is_empty() {
        let rows: Vec<NewSkill<'_>> = plan
            .inserts
            .iter()
            .map(|s| NewSkill {
                user_id,
                skill: &s.skill,
                rating: s.rating,
            })
            .collect();

        diesel::insert_into(skills::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    debug!(
        "Merged skills for user {}: {} updated, {} added",
        user_id,
        plan.updates.len(),
        plan.inserts.len()
    );
    Ok(plan)
}
