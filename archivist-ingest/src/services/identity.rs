//! Identity assignment
//!
//! A source-supplied id is validated and used as-is. Otherwise the id is a
//! UUID v5 over a canonical key string, so re-ingesting the same data yields
//! the same id. Nested entities are keyed by position: reordering a source
//! array changes their identity.

use crate::models::EntityKind;
use thiserror::Error;
use uuid::Uuid;

/// Namespace for every derived id
pub const ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_3c2a_8e4b_5a17_9c0d_2b7e_41f8_a935);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{value}' is not a valid UUID")]
pub struct InvalidIdError {
    pub value: String,
}

/// What a derived id is computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey<'a> {
    /// Natural key of a meeting without a supplied id
    Meeting {
        workgroup_id: Uuid,
        date: &'a str,
        host: &'a str,
        purpose: &'a str,
    },
    /// Nested entity under its parent, by array position
    Child {
        parent_id: Uuid,
        kind: EntityKind,
        position_index: usize,
    },
}

impl IdentityKey<'_> {
    /// Canonical string hashed into the derived id
    pub fn canonical(&self) -> String {
        match self {
            IdentityKey::Meeting {
                workgroup_id,
                date,
                host,
                purpose,
            } => format!(
                "meeting|{}|{}|{}|{}",
                workgroup_id,
                date.trim(),
                host.trim(),
                purpose.trim()
            ),
            IdentityKey::Child {
                parent_id,
                kind,
                position_index,
            } => format!("{}|{}|{}", kind.as_str(), parent_id, position_index),
        }
    }

    pub fn derive(&self) -> Uuid {
        Uuid::new_v5(&ID_NAMESPACE, self.canonical().as_bytes())
    }
}

/// Parse a supplied identifier
pub fn parse_id(value: &str) -> Result<Uuid, InvalidIdError> {
    Uuid::parse_str(value.trim()).map_err(|_| InvalidIdError {
        value: value.to_string(),
    })
}

/// Use the supplied id when present (blank counts as absent), derive otherwise
pub fn assign(supplied: Option<&str>, key: &IdentityKey<'_>) -> Result<Uuid, InvalidIdError> {
    match supplied.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_id(value),
        None => Ok(key.derive()),
    }
}
