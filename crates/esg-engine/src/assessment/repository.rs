use chrono::{DateTime, Utc};
use serde::Serialize;

use super::action_plan::{ActionPlanEntry, ActionStatus};
use super::domain::{ActionId, Diagnosis, DiagnosisId, DiagnosisStatus, Response, ScoreCard, UserId};
use super::insights::StrategicInsight;
use crate::store::RepositoryError;

/// Regenerated outputs that replace whatever a previous scoring run stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedOutputs {
    pub insights: Vec<StrategicInsight>,
    pub action_plan: Vec<ActionPlanEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTransition {
    /// `in_progress → completed`, stamped with the completion time.
    Complete { at: DateTime<Utc> },
    /// Recompute an already completed diagnosis; status is left alone.
    Rescore,
}

/// Everything a scoring run writes, applied as one unit.
#[derive(Debug, Clone)]
pub struct ScoringCommit {
    pub diagnosis_id: DiagnosisId,
    /// Revision observed when the responses were read; a mismatch means they changed.
    pub expected_revision: u64,
    pub scores: ScoreCard,
    pub outputs: GeneratedOutputs,
    pub transition: CommitTransition,
}

/// Storage abstraction for diagnoses, their responses and generated outputs.
pub trait AssessmentRepository: Send + Sync {
    /// Fails with `Conflict` when the user already has an in-progress diagnosis.
    fn insert_diagnosis(&self, diagnosis: Diagnosis) -> Result<Diagnosis, RepositoryError>;
    fn fetch_diagnosis(&self, id: DiagnosisId) -> Result<Option<Diagnosis>, RepositoryError>;
    fn in_progress_for_user(&self, user: &UserId) -> Result<Option<Diagnosis>, RepositoryError>;
    /// Newest first.
    fn diagnoses_for_user(&self, user: &UserId) -> Result<Vec<Diagnosis>, RepositoryError>;
    fn count_for_user(
        &self,
        user: &UserId,
        statuses: &[DiagnosisStatus],
    ) -> Result<usize, RepositoryError>;
    /// Last writer wins per `(diagnosis, item)`; `Locked` once the diagnosis is completed.
    fn upsert_response(&self, response: Response) -> Result<Response, RepositoryError>;
    fn responses(&self, id: DiagnosisId) -> Result<Vec<Response>, RepositoryError>;
    /// Writes scores, status and outputs atomically. `Stale` on revision mismatch,
    /// `InvalidTransition` when the status does not match the requested transition.
    fn commit_scoring(&self, commit: ScoringCommit) -> Result<Diagnosis, RepositoryError>;
    fn insights(&self, id: DiagnosisId) -> Result<Vec<StrategicInsight>, RepositoryError>;
    fn action_plan(&self, id: DiagnosisId) -> Result<Vec<ActionPlanEntry>, RepositoryError>;
    fn update_action_status(
        &self,
        id: DiagnosisId,
        action: ActionId,
        status: ActionStatus,
    ) -> Result<ActionPlanEntry, RepositoryError>;
}
