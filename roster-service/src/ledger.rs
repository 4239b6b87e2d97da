//! Checkout and check-in of shared hardware.
//!
//! Every operation touches two rows, the hardware shelf count and the
//! caller's ownership count, and runs them in one transaction. The hardware
//! row is locked first so concurrent movements of the same item queue up
//! behind each other; the conditional updates below recheck the counts
//! inside the same unit of work.

use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::{ensure_available, ensure_owned, validate_quantity, DomainError};
use tracing::info;

use crate::db::DbPool;
use crate::error::{Result, ServiceError};
use crate::guards::{ensure_user, lock_hardware, lock_ownership};
use crate::models::NewOwnership;
use crate::schema::{hardware, hardware_owners};

#[derive(Clone)]
pub struct HardwareLedger {
    pool: DbPool,
}

impl HardwareLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn check_out(&self, hardware_id: i32, user_id: i32, quantity: i32) -> Result<bool> {
        validate_quantity(quantity)?;
        let mut conn = self.pool.get().await?;
        self.handle_check_out(&mut conn, hardware_id, user_id, quantity).await
    }

    pub async fn check_in(&self, hardware_id: i32, user_id: i32, quantity: i32) -> Result<bool> {
        validate_quantity(quantity)?;
        let mut conn = self.pool.get().await?;
        self.handle_check_in(&mut conn, hardware_id, user_id, quantity).await
    }

    async fn handle_check_out(
        &self,
        conn: &mut AsyncPgConnection,
        hardware_id: i32,
        user_id: i32,
        quantity: i32,
    ) -> Result<bool> {
        let owned = conn
            .transaction::<_, ServiceError, _>(|conn| {
                Box::pin(async move {
                    let item = lock_hardware(conn, hardware_id).await?;
                    ensure_user(conn, user_id).await?;
                    ensure_available(hardware_id, item.available_quantity, quantity)?;

                    let taken = diesel::update(
                        hardware::table
                            .find(hardware_id)
                            .filter(hardware::available_quantity.ge(quantity)),
                    )
                    .set(hardware::available_quantity.eq(hardware::available_quantity - quantity))
                    .execute(conn)
                    .await?;

                    if taken != 1 {
                        return Err(DomainError::InsufficientStock {
                            hardware_id,
                            requested: quantity,
                            available: item.available_quantity,
                        }
                        .into());
                    }

                    apply_ownership_delta(conn, hardware_id, user_id, quantity).await
                })
            })
            .await?;

        info!(
            "User {} checked out {} of hardware {} (now holds {})",
            user_id, quantity, hardware_id, owned
        );
        Ok(true)
    }

    async fn handle_check_in(
        &self,
        conn: &mut AsyncPgConnection,
        hardware_id: i32,
        user_id: i32,
        quantity: i32,
    ) -> Result<bool> {
        let owned = conn
            .transaction::<_, ServiceError, _>(|conn| {
                Box::pin(async move {
                    lock_hardware(conn, hardware_id).await?;
                    ensure_user(conn, user_id).await?;
                    let held = lock_ownership(conn, hardware_id, user_id).await?;
                    ensure_owned(hardware_id, user_id, held, quantity)?;

                    let owned = apply_ownership_delta(conn, hardware_id, user_id, -quantity).await?;

                    let restored = diesel::update(
                        hardware::table
                            .find(hardware_id)
                            .filter((hardware::available_quantity + quantity).le(hardware::total_quantity)),
                    )
                    .set(hardware::available_quantity.eq(hardware::available_quantity + quantity))
                    .execute(conn)
                    .await?;

                    if restored != 1 {
                        return Err(ServiceError::LedgerConflict { hardware_id });
                    }

                    Ok(owned)
                })
            })
            .await?;

        info!(
            "User {} checked in {} of hardware {} (now holds {})",
            user_id, quantity, hardware_id, owned
        );
        Ok(true)
    }
}

/// Adds a signed `delta` to the `(hardware_id, user_id)` ownership count and
/// returns the new value.
///
/// A positive delta creates the row when it is missing. A negative delta only
/// applies to an existing row holding at least `-delta`; rows left at zero
/// are kept.
pub async fn apply_ownership_delta(
    conn: &mut AsyncPgConnection,
    hardware_id: i32,
    user_id: i32,
    delta: i32,
) -> Result<i32> {
    if delta >= 0 {
        let owned = diesel::insert_into(hardware_owners::table)
            .values(&NewOwnership {
                hardware_id,
                user_id,
                owned_quantity: delta,
            })
            .on_conflict((hardware_owners::hardware_id, hardware_owners::user_id))
            .do_update()
            .set(hardware_owners::owned_quantity.eq(hardware_owners::owned_quantity + delta))
            .returning(hardware_owners::owned_quantity)
            .get_result::<i32>(conn)
            .await?;
        return Ok(owned);
    }

    let release = delta
        .checked_neg()
        .ok_or_else(|| DomainError::validation(format!("delta {delta} is out of range")))?;

    let owned = diesel::update(
        hardware_owners::table
            .find((hardware_id, user_id))
            .filter(hardware_owners::owned_quantity.ge(release)),
    )
    .set(hardware_owners::owned_quantity.eq(hardware_owners::owned_quantity - release))
    .returning(hardware_owners::owned_quantity)
    .get_result::<i32>(conn)
    .await
    .optional()?;

    if let Some(owned) = owned {
        return Ok(owned);
    }

    let current = hardware_owners::table
        .find((hardware_id, user_id))
        .select(hardware_owners::owned_quantity)
        .get_result::<i32>(conn)
        .await
        .optional()?;

    let error = match current {
        Some(owned) => DomainError::InsufficientOwnership {
            hardware_id,
            user_id,
            requested: release,
            owned,
        },
        None => DomainError::ownership_not_found(hardware_id, user_id),
    };
    Err(error.into())
}
