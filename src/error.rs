//! Error taxonomy for the claim registry and its persistence collaborators.
//!
//! Lookups that find nothing return `None`; only state-changing operations
//! and persistence calls produce errors.

use crate::types::{ClaimId, Column, FactionId};
use thiserror::Error;

/// Failure reported by a persistence collaborator.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted record is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("write-behind queue is closed")]
    Closed,

    #[error("persistence backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ClaimError {
    /// Invalid argument; rejected before any state change.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// A column of the new footprint is already covered by another claim.
    #[error("column {column} is already claimed by {existing}")]
    Overlap { column: Column, existing: ClaimId },

    #[error("a faction named '{0}' already exists")]
    DuplicateName(String),

    #[error("no faction with id {0}")]
    UnknownFaction(FactionId),

    #[error("no claim with id {0}")]
    UnknownClaim(ClaimId),

    #[error("claim owners are disabled by configuration")]
    OwnersDisabled,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T, E = ClaimError> = std::result::Result<T, E>;
