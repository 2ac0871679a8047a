use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, info};

use super::action_plan::{generate_action_plan, sort_for_display, ActionPlanEntry, ActionStatus};
use super::certification::{certification_level, CertificateBadge, CertificationScheme, TierView};
use super::domain::{
    ActionId, Diagnosis, DiagnosisId, OutputIds, Response, ResponseSubmission, ScoreCard,
    SimplifiedScores, UserId, ValidationError,
};
use super::insights::{generate_insights, StrategicInsight};
use super::quota::{DiagnosisAllowance, DiagnosisQuota, QuotaError};
use super::repository::{AssessmentRepository, CommitTransition, GeneratedOutputs, ScoringCommit};
use super::scoring::{percentage, ScoringEngine};
use super::weighting::{Evaluation, Importance, WeightingTable};
use crate::catalog::{Catalog, PillarCode};
use crate::error::ErrorKind;
use crate::report::{DiagnosisReport, ReportBuilder, ReportSources};
use crate::store::RepositoryError;

/// Attempts before a scoring run gives up on responses that keep changing underneath it.
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Completed diagnoses compared against in the report's evolution section.
const EVOLUTION_DEPTH: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct StartedDiagnosis {
    pub diagnosis: Diagnosis,
    pub reused: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub diagnosis: Diagnosis,
    pub scores: ScoreCard,
    pub level: TierView,
    pub insights: Vec<StrategicInsight>,
    pub action_plan: Vec<ActionPlanEntry>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PartialScores {
    #[serde(flatten)]
    pub scores: ScoreCard,
    pub level: TierView,
    pub is_partial: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosisProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisResults {
    pub diagnosis: Diagnosis,
    pub scores: ScoreCard,
    pub level: TierView,
    pub certification: CertificateBadge,
    pub insights: Vec<StrategicInsight>,
    pub action_plan: Vec<ActionPlanEntry>,
}

enum ScoringRun {
    Complete,
    Rescore,
    Simplified(ScoreCard),
}

/// Diagnosis lifecycle: responses in, frozen scores and regenerated outputs out.
pub struct DiagnosisService<R> {
    repository: Arc<R>,
    catalog: Arc<Catalog>,
    engine: ScoringEngine,
    weights: WeightingTable,
    certification: CertificationScheme,
    quota: Option<Arc<dyn DiagnosisQuota>>,
    ids: Arc<OutputIds>,
}

impl<R> DiagnosisService<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<Catalog>) -> Self {
        Self {
            repository,
            engine: ScoringEngine::new(catalog.clone()),
            catalog,
            weights: WeightingTable::default(),
            certification: CertificationScheme::default(),
            quota: None,
            ids: Arc::new(OutputIds::default()),
        }
    }

    /// Gates creation of new diagnoses on plan entitlements.
    pub fn with_quota(mut self, quota: Arc<dyn DiagnosisQuota>) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Shares insight and action id sequences with other services over the same store.
    pub fn with_output_ids(mut self, ids: Arc<OutputIds>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_certification(mut self, certification: CertificationScheme) -> Self {
        self.certification = certification;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn certification(&self) -> &CertificationScheme {
        &self.certification
    }

    /// Returns the user's in-progress diagnosis, or opens a new one if the plan allows.
    pub fn start(&self, user: &UserId) -> Result<StartedDiagnosis, DiagnosisServiceError> {
        if let Some(diagnosis) = self.repository.in_progress_for_user(user)? {
            return Ok(StartedDiagnosis {
                diagnosis,
                reused: true,
            });
        }

        if let Some(quota) = &self.quota {
            let allowance = quota.check(user)?;
            if !allowance.allowed {
                info!(user = %user, limit = ?allowance.limit, "diagnosis limit reached");
                return Err(DiagnosisServiceError::LimitReached(allowance));
            }
        }

        match self
            .repository
            .insert_diagnosis(Diagnosis::open(user.clone(), Utc::now()))
        {
            Ok(diagnosis) => {
                info!(diagnosis_id = %diagnosis.id, user = %user, "diagnosis started");
                Ok(StartedDiagnosis {
                    diagnosis,
                    reused: false,
                })
            }
            Err(RepositoryError::Conflict) => {
                // Lost a race against a concurrent start for the same user.
                let diagnosis = self
                    .repository
                    .in_progress_for_user(user)?
                    .ok_or(RepositoryError::Conflict)?;
                Ok(StartedDiagnosis {
                    diagnosis,
                    reused: true,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn list(&self, user: &UserId) -> Result<Vec<Diagnosis>, DiagnosisServiceError> {
        Ok(self.repository.diagnoses_for_user(user)?)
    }

    pub fn get(&self, user: &UserId, id: DiagnosisId) -> Result<Diagnosis, DiagnosisServiceError> {
        self.owned(user, id)
    }

    /// Validates and stores one answer; re-answering replaces the previous row.
    pub fn record_response(
        &self,
        user: &UserId,
        id: DiagnosisId,
        submission: ResponseSubmission,
    ) -> Result<Response, DiagnosisServiceError> {
        let importance = Importance::from_label(&submission.importance)?;
        let evaluation = Evaluation::from_label(&submission.evaluation)?;
        if !self.catalog.contains(submission.assessment_item_id) {
            return Err(ValidationError::UnknownItem(submission.assessment_item_id).into());
        }

        let diagnosis = self.owned(user, id)?;
        if diagnosis.is_completed() {
            return Err(DiagnosisServiceError::AlreadyCompleted);
        }

        let weighted = self.weights.weigh(importance, evaluation);
        let response = Response {
            diagnosis_id: id,
            assessment_item_id: submission.assessment_item_id,
            importance,
            evaluation,
            importance_weight: weighted.importance_weight,
            evaluation_weight: weighted.evaluation_weight,
            score: weighted.score,
            observations: submission
                .observations
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            updated_at: Utc::now(),
        };

        match self.repository.upsert_response(response) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Locked) => Err(DiagnosisServiceError::AlreadyCompleted),
            Err(other) => Err(other.into()),
        }
    }

    pub fn responses(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<Vec<Response>, DiagnosisServiceError> {
        self.owned(user, id)?;
        Ok(self.repository.responses(id)?)
    }

    pub fn pillar_score(
        &self,
        user: &UserId,
        id: DiagnosisId,
        code: PillarCode,
    ) -> Result<Decimal, DiagnosisServiceError> {
        self.owned(user, id)?;
        let responses = self.repository.responses(id)?;
        Ok(self.engine.pillar_score(code, &responses))
    }

    /// Live scores for an open diagnosis; frozen scores once it is completed.
    pub fn partial_scores(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<PartialScores, DiagnosisServiceError> {
        let diagnosis = self.owned(user, id)?;
        let (scores, is_partial) = match (diagnosis.is_completed(), diagnosis.scores) {
            (true, Some(scores)) => (scores, false),
            _ => (self.engine.score(&self.repository.responses(id)?), true),
        };
        Ok(PartialScores {
            scores,
            level: certification_level(scores.overall),
            is_partial,
        })
    }

    pub fn progress(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<DiagnosisProgress, DiagnosisServiceError> {
        self.owned(user, id)?;
        let total = self.catalog.item_count();
        let answered = self
            .repository
            .responses(id)?
            .iter()
            .filter(|response| self.catalog.contains(response.assessment_item_id))
            .count();
        let progress = percentage(answered as u64, total as u64)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Ok(DiagnosisProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            progress: progress.to_u8().unwrap_or(100).min(100),
        })
    }

    /// Scores the diagnosis, regenerates insights and action plan, and freezes it.
    pub fn complete(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<CompletionOutcome, DiagnosisServiceError> {
        self.run_scoring(user, id, ScoringRun::Complete)
    }

    /// Completes with pillar scores supplied directly; no insights or action plan.
    pub fn complete_simplified(
        &self,
        user: &UserId,
        id: DiagnosisId,
        scores: SimplifiedScores,
    ) -> Result<CompletionOutcome, DiagnosisServiceError> {
        let card = scores.validate()?;
        self.run_scoring(user, id, ScoringRun::Simplified(card))
    }

    /// Recomputes a completed diagnosis and replaces its generated outputs.
    pub fn rescore(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<CompletionOutcome, DiagnosisServiceError> {
        self.run_scoring(user, id, ScoringRun::Rescore)
    }

    pub fn results(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<DiagnosisResults, DiagnosisServiceError> {
        let diagnosis = self.owned(user, id)?;
        let scores = completed_scores(&diagnosis)?;
        let mut insights = self.repository.insights(id)?;
        insights.sort_by_key(|insight| insight.category);
        let mut action_plan = self.repository.action_plan(id)?;
        sort_for_display(&mut action_plan);

        Ok(DiagnosisResults {
            level: certification_level(scores.overall),
            certification: self.certification.badge(scores.overall),
            diagnosis,
            scores,
            insights,
            action_plan,
        })
    }

    pub fn update_action_status(
        &self,
        user: &UserId,
        id: DiagnosisId,
        action: ActionId,
        status: ActionStatus,
    ) -> Result<ActionPlanEntry, DiagnosisServiceError> {
        self.owned(user, id)?;
        match self.repository.update_action_status(id, action, status) {
            Ok(entry) => Ok(entry),
            Err(RepositoryError::NotFound) => Err(DiagnosisServiceError::ActionNotFound(action)),
            Err(other) => Err(other.into()),
        }
    }

    pub fn report(
        &self,
        user: &UserId,
        id: DiagnosisId,
    ) -> Result<DiagnosisReport, DiagnosisServiceError> {
        let diagnosis = self.owned(user, id)?;
        let scores = completed_scores(&diagnosis)?;

        let mut previous: Vec<Diagnosis> = self
            .repository
            .diagnoses_for_user(user)?
            .into_iter()
            .filter(|other| other.id != id && other.is_completed() && other.scores.is_some())
            .collect();
        previous.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        previous.truncate(EVOLUTION_DEPTH);

        let sources = ReportSources {
            scores,
            responses: self.repository.responses(id)?,
            insights: self.repository.insights(id)?,
            action_plan: self.repository.action_plan(id)?,
            previous,
            diagnosis,
        };
        let builder = ReportBuilder::new(&self.catalog, &self.weights, &self.certification);
        Ok(builder.build(sources, Utc::now()))
    }

    fn owned(&self, user: &UserId, id: DiagnosisId) -> Result<Diagnosis, DiagnosisServiceError> {
        self.repository
            .fetch_diagnosis(id)?
            .filter(|diagnosis| diagnosis.is_owned_by(user))
            .ok_or(DiagnosisServiceError::NotFound)
    }

    fn generate_outputs(&self, scores: &ScoreCard, responses: &[Response]) -> GeneratedOutputs {
        GeneratedOutputs {
            insights: generate_insights(scores, &self.catalog, &self.ids),
            action_plan: generate_action_plan(responses, &self.catalog, &self.ids),
        }
    }

    fn run_scoring(
        &self,
        user: &UserId,
        id: DiagnosisId,
        run: ScoringRun,
    ) -> Result<CompletionOutcome, DiagnosisServiceError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let diagnosis = self.owned(user, id)?;
            let transition = match (&run, diagnosis.is_completed()) {
                (ScoringRun::Rescore, true) => CommitTransition::Rescore,
                (ScoringRun::Rescore, false) => return Err(DiagnosisServiceError::NotCompleted),
                (_, true) => return Err(DiagnosisServiceError::AlreadyCompleted),
                (_, false) => CommitTransition::Complete { at: Utc::now() },
            };

            let (scores, outputs) = match &run {
                ScoringRun::Simplified(card) => (*card, GeneratedOutputs::default()),
                ScoringRun::Complete | ScoringRun::Rescore => {
                    let responses = self.repository.responses(id)?;
                    let scores = self.engine.score(&responses);
                    let outputs = self.generate_outputs(&scores, &responses);
                    (scores, outputs)
                }
            };

            let commit = ScoringCommit {
                diagnosis_id: id,
                expected_revision: diagnosis.revision,
                scores,
                outputs: outputs.clone(),
                transition,
            };

            match self.repository.commit_scoring(commit) {
                Ok(diagnosis) => {
                    info!(
                        diagnosis_id = %id,
                        overall = %scores.overall,
                        insights = outputs.insights.len(),
                        actions = outputs.action_plan.len(),
                        "diagnosis scored"
                    );
                    return Ok(CompletionOutcome {
                        diagnosis,
                        level: certification_level(scores.overall),
                        scores,
                        insights: outputs.insights,
                        action_plan: outputs.action_plan,
                    });
                }
                Err(RepositoryError::Stale) => {
                    debug!(diagnosis_id = %id, attempt, "responses changed while scoring; retrying");
                }
                Err(RepositoryError::InvalidTransition) => {
                    return Err(match &run {
                        ScoringRun::Rescore => DiagnosisServiceError::NotCompleted,
                        _ => DiagnosisServiceError::AlreadyCompleted,
                    });
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(DiagnosisServiceError::Contention)
    }
}

fn completed_scores(diagnosis: &Diagnosis) -> Result<ScoreCard, DiagnosisServiceError> {
    match (diagnosis.is_completed(), diagnosis.scores) {
        (true, Some(scores)) => Ok(scores),
        _ => Err(DiagnosisServiceError::NotCompleted),
    }
}

/// Error raised by the diagnosis service.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosisServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("diagnosis not found")]
    NotFound,
    #[error("action {0} not found")]
    ActionNotFound(ActionId),
    #[error("diagnosis is already completed")]
    AlreadyCompleted,
    #[error("diagnosis is not completed yet")]
    NotCompleted,
    #[error("diagnosis limit of plan '{}' reached", .0.plan_code)]
    LimitReached(DiagnosisAllowance),
    #[error("diagnosis kept changing while scoring; retry the request")]
    Contention,
    #[error(transparent)]
    Quota(#[from] QuotaError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DiagnosisServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound | Self::ActionNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyCompleted | Self::NotCompleted | Self::Contention => {
                ErrorKind::InvalidState
            }
            Self::LimitReached(_) => ErrorKind::CapacityExceeded,
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(
                RepositoryError::Locked
                | RepositoryError::InvalidTransition
                | RepositoryError::Conflict
                | RepositoryError::Stale,
            ) => ErrorKind::InvalidState,
            Self::Quota(_) | Self::Repository(RepositoryError::Unavailable(_)) => {
                ErrorKind::Internal
            }
        }
    }
}
