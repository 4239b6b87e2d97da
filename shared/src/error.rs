use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Hardware,
    Ownership,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Hardware => "hardware",
            Entity::Ownership => "ownership",
        };
        f.write_str(name)
    }
}

/// Rule violations raised by the ledger, the reconciler and the scan recorder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{entity} {key} not found")]
    NotFound { entity: Entity, key: String },

    #[error("hardware {hardware_id} has {available} available, {requested} requested")]
    InsufficientStock {
        hardware_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("user {user_id} holds {owned} of hardware {hardware_id}, {requested} requested")]
    InsufficientOwnership {
        hardware_id: i32,
        user_id: i32,
        requested: i32,
        owned: i32,
    },

    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    pub fn user_not_found(user_id: i32) -> Self {
        Self::NotFound {
            entity: Entity::User,
            key: user_id.to_string(),
        }
    }

    pub fn hardware_not_found(hardware_id: i32) -> Self {
        Self::NotFound {
            entity: Entity::Hardware,
            key: hardware_id.to_string(),
        }
    }

    pub fn ownership_not_found(hardware_id: i32, user_id: i32) -> Self {
        Self::NotFound {
            entity: Entity::Ownership,
            key: format!("({hardware_id}, {user_id})"),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable kind, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InsufficientOwnership { .. } => "insufficient_ownership",
            Self::Validation(_) => "validation",
        }
    }
}
