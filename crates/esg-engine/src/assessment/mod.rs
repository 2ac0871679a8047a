//! Diagnoses, weighted responses and everything derived from them: pillar scores,
//! score tiers, certificate badges, strategic insights and the remediation plan.

pub mod action_plan;
pub mod certification;
pub mod domain;
pub mod insights;
pub mod quota;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod weighting;

#[cfg(test)]
mod tests;

pub use action_plan::{
    generate_action_plan, ActionPlanEntry, ActionPriority, ActionStatus, ACTION_PLAN_LIMIT,
};
pub use certification::{
    certification_level, BadgeLevel, CertificateBadge, CertificationScheme, ScoreLevel, TierView,
};
pub use domain::{
    ActionId, Diagnosis, DiagnosisId, DiagnosisStatus, InsightId, OutputIds, Response,
    ResponseSubmission, ScoreCard, SimplifiedScores, UserId, ValidationError,
};
pub use insights::{generate_insights, InsightCategory, StrategicInsight};
pub use quota::{DiagnosisAllowance, DiagnosisQuota, QuotaError};
pub use repository::{AssessmentRepository, CommitTransition, GeneratedOutputs, ScoringCommit};
pub use router::diagnosis_router;
pub use scoring::{round_score, ScoringEngine};
pub use service::{
    CompletionOutcome, DiagnosisProgress, DiagnosisResults, DiagnosisService,
    DiagnosisServiceError, PartialScores, StartedDiagnosis,
};
pub use weighting::{Evaluation, Importance, WeightingTable};
