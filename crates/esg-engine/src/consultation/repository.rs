use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::domain::{Consultation, ConsultationId, ConsultationStatus};
use crate::assessment::UserId;
use crate::store::RepositoryError;

/// Status change applied by [`ConsultationRepository::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultationTransition {
    pub from: ConsultationStatus,
    pub to: ConsultationStatus,
    pub at: DateTime<Utc>,
    /// Replaces the stored notes when set.
    pub notes: Option<String>,
}

pub trait ConsultationRepository: Send + Sync {
    /// Stores the consultation unless another open consultation of the same user
    /// starts within `[window_start, window_end]`; `Conflict` otherwise.
    fn insert_if_free(
        &self,
        consultation: Consultation,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Consultation, RepositoryError>;
    fn fetch(&self, id: ConsultationId) -> Result<Option<Consultation>, RepositoryError>;
    /// Latest scheduled first.
    fn for_user(&self, user: &UserId) -> Result<Vec<Consultation>, RepositoryError>;
    /// Open consultations of any user starting within `[from, to]`.
    fn open_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Consultation>, RepositoryError>;
    /// `Stale` when the stored status is not `transition.from`.
    fn transition(
        &self,
        id: ConsultationId,
        transition: ConsultationTransition,
    ) -> Result<Consultation, RepositoryError>;
}

/// Consultation-hour balance owned by the billing side.
pub trait HoursLedger: Send + Sync {
    fn remaining(&self, user: &UserId) -> Result<Decimal, LedgerError>;
    /// Atomically charges `hours`; returns the remaining balance.
    fn debit(&self, user: &UserId, hours: Decimal) -> Result<Decimal, LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient consultation hours: requested {requested}, remaining {remaining}")]
    Insufficient {
        requested: Decimal,
        remaining: Decimal,
    },
    #[error("no active subscription with consultation hours")]
    NoSubscription,
    #[error("hours ledger unavailable: {0}")]
    Unavailable(String),
}
