//! Storage contracts shared by the repositories plus in-memory implementations.

pub mod memory;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    Stale,
    #[error("record is locked against modification")]
    Locked,
    #[error("record is not in a state that allows this transition")]
    InvalidTransition,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
