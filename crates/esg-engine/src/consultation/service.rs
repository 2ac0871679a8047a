use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{
    hours_for, Consultation, ConsultationId, ConsultationStatus, ScheduleRequest, Slot,
};
use super::repository::{ConsultationRepository, ConsultationTransition, HoursLedger, LedgerError};
use crate::assessment::UserId;
use crate::error::ErrorKind;
use crate::store::RepositoryError;

/// Sessions may not start within this many minutes before another open one.
const LEAD_BUFFER_MINUTES: i64 = 60;
const MAX_DURATION_MINUTES: u32 = 8 * 60;
const UPCOMING_LIMIT: usize = 5;
/// Bookable hours, `[OPENING_HOUR, CLOSING_HOUR)`, in UTC.
const OPENING_HOUR: u32 = 9;
const CLOSING_HOUR: u32 = 18;

/// Scheduling and execution of consultation sessions paid for in plan hours.
pub struct ConsultationService<C> {
    repository: Arc<C>,
    ledger: Arc<dyn HoursLedger>,
}

impl<C> ConsultationService<C>
where
    C: ConsultationRepository + 'static,
{
    pub fn new(repository: Arc<C>, ledger: Arc<dyn HoursLedger>) -> Self {
        Self { repository, ledger }
    }

    pub fn schedule(
        &self,
        user: &UserId,
        request: ScheduleRequest,
    ) -> Result<Consultation, ConsultationError> {
        if request.duration_minutes == 0 || request.duration_minutes > MAX_DURATION_MINUTES {
            return Err(ConsultationError::InvalidDuration(request.duration_minutes));
        }

        let needed = hours_for(request.duration_minutes);
        let remaining = self.ledger.remaining(user)?;
        if remaining < needed {
            return Err(ConsultationError::InsufficientHours { needed, remaining });
        }

        let now = Utc::now();
        let consultation = Consultation {
            id: ConsultationId::generate(),
            user_id: user.clone(),
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
            topic: request
                .topic
                .map(|topic| topic.trim().to_string())
                .filter(|topic| !topic.is_empty()),
            notes: None,
            status: ConsultationStatus::Scheduled,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let window_start = request.scheduled_at - Duration::minutes(LEAD_BUFFER_MINUTES);
        let window_end = consultation.ends_at();

        match self
            .repository
            .insert_if_free(consultation, window_start, window_end)
        {
            Ok(stored) => {
                info!(
                    consultation_id = %stored.id,
                    user = %user,
                    scheduled_at = %stored.scheduled_at,
                    "consultation scheduled"
                );
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => Err(ConsultationError::SlotTaken),
            Err(other) => Err(other.into()),
        }
    }

    /// Newest first, optionally narrowed to one status.
    pub fn list(
        &self,
        user: &UserId,
        status: Option<ConsultationStatus>,
    ) -> Result<Vec<Consultation>, ConsultationError> {
        let mut consultations = self.repository.for_user(user)?;
        if let Some(status) = status {
            consultations.retain(|consultation| consultation.status == status);
        }
        Ok(consultations)
    }

    pub fn get(
        &self,
        user: &UserId,
        id: ConsultationId,
    ) -> Result<Consultation, ConsultationError> {
        self.repository
            .fetch(id)?
            .filter(|consultation| consultation.is_owned_by(user))
            .ok_or(ConsultationError::NotFound)
    }

    /// Next scheduled sessions, soonest first.
    pub fn upcoming(&self, user: &UserId) -> Result<Vec<Consultation>, ConsultationError> {
        let now = Utc::now();
        let mut upcoming: Vec<Consultation> = self
            .repository
            .for_user(user)?
            .into_iter()
            .filter(|consultation| {
                consultation.status == ConsultationStatus::Scheduled
                    && consultation.scheduled_at >= now
            })
            .collect();
        upcoming.sort_by_key(|consultation| consultation.scheduled_at);
        upcoming.truncate(UPCOMING_LIMIT);
        Ok(upcoming)
    }

    pub fn available_slots(&self, date: NaiveDate) -> Result<Vec<Slot>, ConsultationError> {
        self.slots_at(date, Utc::now())
    }

    pub(crate) fn slots_at(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Slot>, ConsultationError> {
        let day_start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let day_end = day_start + Duration::days(1) - Duration::milliseconds(1);
        let booked = self.repository.open_between(day_start, day_end)?;

        Ok((OPENING_HOUR..CLOSING_HOUR)
            .map(|hour| {
                let slot = day_start + Duration::hours(i64::from(hour));
                let occupied = booked.iter().any(|consultation| {
                    slot >= consultation.scheduled_at && slot < consultation.ends_at()
                });
                Slot {
                    time: format!("{hour:02}:00"),
                    starts_at: slot,
                    available: !occupied && slot >= now,
                }
            })
            .collect())
    }

    pub fn start(
        &self,
        user: &UserId,
        id: ConsultationId,
    ) -> Result<Consultation, ConsultationError> {
        let consultation = self.get(user, id)?;
        if consultation.status != ConsultationStatus::Scheduled {
            return Err(ConsultationError::InvalidTransition {
                action: "started",
                status: consultation.status,
            });
        }
        let started = self.move_status(
            &consultation,
            ConsultationTransition {
                from: ConsultationStatus::Scheduled,
                to: ConsultationStatus::InProgress,
                at: Utc::now(),
                notes: None,
            },
            "started",
        )?;
        info!(consultation_id = %id, "consultation started");
        Ok(started)
    }

    /// Closes the session, then charges its hours. A failed charge reopens it.
    pub fn complete(
        &self,
        user: &UserId,
        id: ConsultationId,
        notes: Option<String>,
    ) -> Result<Consultation, ConsultationError> {
        let consultation = self.get(user, id)?;
        if consultation.status != ConsultationStatus::InProgress {
            return Err(ConsultationError::InvalidTransition {
                action: "completed",
                status: consultation.status,
            });
        }

        let completed = self.move_status(
            &consultation,
            ConsultationTransition {
                from: ConsultationStatus::InProgress,
                to: ConsultationStatus::Completed,
                at: Utc::now(),
                notes: notes
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty()),
            },
            "completed",
        )?;

        let hours = completed.hours();
        match self.ledger.debit(user, hours) {
            Ok(remaining) => {
                info!(
                    consultation_id = %id,
                    hours = %hours,
                    remaining = %remaining,
                    "consultation completed"
                );
                Ok(completed)
            }
            Err(ledger_error) => {
                warn!(
                    consultation_id = %id,
                    error = %ledger_error,
                    "hour debit failed; reopening consultation"
                );
                let reopen = ConsultationTransition {
                    from: ConsultationStatus::Completed,
                    to: ConsultationStatus::InProgress,
                    at: Utc::now(),
                    notes: consultation.notes.clone(),
                };
                if let Err(revert) = self.repository.transition(id, reopen) {
                    warn!(consultation_id = %id, error = %revert, "could not reopen consultation");
                }
                Err(ledger_error.into())
            }
        }
    }

    pub fn cancel(
        &self,
        user: &UserId,
        id: ConsultationId,
    ) -> Result<Consultation, ConsultationError> {
        let consultation = self.get(user, id)?;
        if !consultation.status.is_open() {
            return Err(ConsultationError::InvalidTransition {
                action: "cancelled",
                status: consultation.status,
            });
        }
        let cancelled = self.move_status(
            &consultation,
            ConsultationTransition {
                from: consultation.status,
                to: ConsultationStatus::Cancelled,
                at: Utc::now(),
                notes: None,
            },
            "cancelled",
        )?;
        info!(consultation_id = %id, "consultation cancelled");
        Ok(cancelled)
    }

    fn move_status(
        &self,
        consultation: &Consultation,
        transition: ConsultationTransition,
        action: &'static str,
    ) -> Result<Consultation, ConsultationError> {
        match self.repository.transition(consultation.id, transition) {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::Stale) => {
                // Someone else moved it first; report what it is now.
                let status = self
                    .repository
                    .fetch(consultation.id)?
                    .map_or(consultation.status, |current| current.status);
                Err(ConsultationError::InvalidTransition { action, status })
            }
            Err(RepositoryError::NotFound) => Err(ConsultationError::NotFound),
            Err(other) => Err(other.into()),
        }
    }
}

/// Error raised by the consultation service.
#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error("consultation not found")]
    NotFound,
    #[error("duration must be between 1 and {MAX_DURATION_MINUTES} minutes, got {0}")]
    InvalidDuration(u32),
    #[error("insufficient consultation hours: available {remaining}h, needed {needed}h")]
    InsufficientHours { needed: Decimal, remaining: Decimal },
    #[error("another consultation is already scheduled around this time")]
    SlotTaken,
    #[error("a {} consultation cannot be {action}", .status.label())]
    InvalidTransition {
        action: &'static str,
        status: ConsultationStatus,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ConsultationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound | Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::InvalidDuration(_) => ErrorKind::Validation,
            Self::InsufficientHours { .. } | Self::Ledger(LedgerError::Insufficient { .. }) => {
                ErrorKind::CapacityExceeded
            }
            Self::SlotTaken
            | Self::InvalidTransition { .. }
            | Self::Ledger(LedgerError::NoSubscription) => ErrorKind::InvalidState,
            Self::Ledger(LedgerError::Unavailable(_))
            | Self::Repository(RepositoryError::Unavailable(_)) => ErrorKind::Internal,
            Self::Repository(_) => ErrorKind::InvalidState,
        }
    }
}
