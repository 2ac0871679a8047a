use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scoring::round_score;
use super::weighting::{Evaluation, Importance};
use crate::catalog::{AssessmentItemId, PillarCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosisId(pub Uuid);

impl DiagnosisId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DiagnosisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequences for generated insight and action ids, owned by whoever wires the service.
#[derive(Debug)]
pub struct OutputIds {
    insights: AtomicU64,
    actions: AtomicU64,
}

impl Default for OutputIds {
    fn default() -> Self {
        Self {
            insights: AtomicU64::new(1),
            actions: AtomicU64::new(1),
        }
    }
}

impl OutputIds {
    pub fn next_insight(&self) -> InsightId {
        InsightId(self.insights.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_action(&self) -> ActionId {
        ActionId(self.actions.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisStatus {
    InProgress,
    Completed,
}

impl DiagnosisStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Frozen pillar and overall percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub environmental: Decimal,
    pub social: Decimal,
    pub governance: Decimal,
    pub overall: Decimal,
}

impl ScoreCard {
    /// Derives `overall` as the rounded mean so the card can never disagree with its pillars.
    pub fn from_pillars(environmental: Decimal, social: Decimal, governance: Decimal) -> Self {
        let overall = round_score((environmental + social + governance) / Decimal::from(3));
        Self {
            environmental,
            social,
            governance,
            overall,
        }
    }

    pub fn zero() -> Self {
        Self::from_pillars(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    pub fn pillar(&self, code: PillarCode) -> Decimal {
        match code {
            PillarCode::Environmental => self.environmental,
            PillarCode::Social => self.social,
            PillarCode::Governance => self.governance,
        }
    }
}

/// One assessment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: DiagnosisId,
    pub user_id: UserId,
    pub status: DiagnosisStatus,
    pub scores: Option<ScoreCard>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped by every write; used to detect responses changing under a scoring run.
    #[serde(skip)]
    pub revision: u64,
}

impl Diagnosis {
    pub fn open(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: DiagnosisId::generate(),
            user_id,
            status: DiagnosisStatus::InProgress,
            scores: None,
            created_at: now,
            completed_at: None,
            revision: 0,
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    pub fn is_completed(&self) -> bool {
        self.status == DiagnosisStatus::Completed
    }
}

/// A validated, weighted answer keyed by `(diagnosis_id, assessment_item_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub diagnosis_id: DiagnosisId,
    pub assessment_item_id: AssessmentItemId,
    pub importance: Importance,
    pub evaluation: Evaluation,
    pub importance_weight: u8,
    pub evaluation_weight: u8,
    pub score: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Raw answer as submitted by a client; labels are parsed before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub assessment_item_id: AssessmentItemId,
    pub importance: String,
    pub evaluation: String,
    #[serde(default)]
    pub observations: Option<String>,
}

/// Pillar scores entered directly by the simplified questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedScores {
    pub environmental: Decimal,
    pub social: Decimal,
    pub governance: Decimal,
}

impl SimplifiedScores {
    pub fn validate(&self) -> Result<ScoreCard, ValidationError> {
        for (field, value) in [
            ("environmental", self.environmental),
            ("social", self.social),
            ("governance", self.governance),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(ValidationError::ScoreOutOfRange { field });
            }
        }
        Ok(ScoreCard::from_pillars(
            round_score(self.environmental),
            round_score(self.social),
            round_score(self.governance),
        ))
    }
}

/// Malformed input rejected before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown importance label '{0}'")]
    UnknownImportance(String),
    #[error("unknown evaluation label '{0}'")]
    UnknownEvaluation(String),
    #[error("assessment item {0} is not part of the catalog")]
    UnknownItem(AssessmentItemId),
    #[error("{field} score must be between 0 and 100")]
    ScoreOutOfRange { field: &'static str },
}
