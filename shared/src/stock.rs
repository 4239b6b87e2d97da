//! Preconditions shared by checkout and check-in. The ledger runs these once
//! against locked rows and then again implicitly through its conditional
//! updates, so a caller racing between the two still cannot break the counts.

use crate::DomainError;

pub fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

pub fn ensure_available(hardware_id: i32, available: i32, requested: i32) -> Result<(), DomainError> {
    if available < requested {
        return Err(DomainError::InsufficientStock {
            hardware_id,
            requested,
            available,
        });
    }
    Ok(())
}

pub fn ensure_owned(
    hardware_id: i32,
    user_id: i32,
    owned: i32,
    requested: i32,
) -> Result<(), DomainError> {
    if owned < requested {
        return Err(DomainError::InsufficientOwnership {
            hardware_id,
            user_id,
            requested,
            owned,
        });
    }
    Ok(())
}
