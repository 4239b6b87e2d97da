//! Existence checks run at the start of a unit of work. The `lock_*` variants
//! take a row lock that is held until the surrounding transaction ends.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::DomainError;

use crate::error::{Result, ServiceError};
use crate::models::{HardwareRow, UserRow};
use crate::schema::{hardware, hardware_owners, users};

pub async fn ensure_user(conn: &mut AsyncPgConnection, user_id: i32) -> Result<()> {
    let found: bool = diesel::select(diesel::dsl::exists(users::table.find(user_id)))
        .get_result(conn)
        .await?;

    if !found {
        return Err(DomainError::user_not_found(user_id).into());
    }
    Ok(())
}

/// Serializes profile writes for one user. The lock is `FOR NO KEY UPDATE`,
/// which leaves the `FOR KEY SHARE` taken by ownership foreign keys free.
pub async fn lock_user(conn: &mut AsyncPgConnection, user_id: i32) -> Result<UserRow> {
    let user = users::table
        .find(user_id)
        .select(UserRow::as_select())
        .for_no_key_update()
        .get_result(conn)
        .await
        .optional()?;

    user.ok_or_else(|| ServiceError::from(DomainError::user_not_found(user_id)))
}

pub async fn lock_hardware(conn: &mut AsyncPgConnection, hardware_id: i32) -> Result<HardwareRow> {
    let item = hardware::table
        .find(hardware_id)
        .select(HardwareRow::as_select())
        .for_update()
        .get_result(conn)
        .await
        .optional()?;

    item.ok_or_else(|| ServiceError::from(DomainError::hardware_not_found(hardware_id)))
}

pub async fn lock_ownership(conn: &mut AsyncPgConnection, hardware_id: i32, user_id: i32) -> Result<i32> {
    let owned = hardware_owners::table
        .find((hardware_id, user_id))
        .select(hardware_owners::owned_quantity)
        .for_update()
        .get_result::<i32>(conn)
        .await
        .optional()?;

    owned.ok_or_else(|| ServiceError::from(DomainError::ownership_not_found(hardware_id, user_id)))
}
