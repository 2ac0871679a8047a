//! Consultation sessions booked against the plan's hour allowance.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Consultation, ConsultationId, ConsultationStatus, ScheduleRequest, Slot};
pub use repository::{ConsultationRepository, ConsultationTransition, HoursLedger, LedgerError};
pub use router::consultation_router;
pub use service::{ConsultationError, ConsultationService};
