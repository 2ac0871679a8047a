use serde::{Deserialize, Serialize};

use super::domain::ValidationError;

/// Highest possible `importance_weight × evaluation_weight` for one response.
pub const MAX_RESPONSE_SCORE: u16 = 81;

/// Top of the report-only maturity scale.
pub const MATURITY_MAX: u8 = 5;

/// How much an assessment item matters to the respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Importance {
    #[serde(rename = "Não é importante")]
    NotImportant,
    #[serde(rename = "Pouco importante")]
    SlightlyImportant,
    #[serde(rename = "Muito Importante")]
    VeryImportant,
    #[serde(rename = "Crítico")]
    Critical,
}

impl Importance {
    pub const ALL: [Self; 4] = [
        Self::NotImportant,
        Self::SlightlyImportant,
        Self::VeryImportant,
        Self::Critical,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotImportant => "Não é importante",
            Self::SlightlyImportant => "Pouco importante",
            Self::VeryImportant => "Muito Importante",
            Self::Critical => "Crítico",
        }
    }

    pub fn from_label(raw: &str) -> Result<Self, ValidationError> {
        let wanted = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.label().to_lowercase() == wanted)
            .ok_or_else(|| ValidationError::UnknownImportance(raw.to_string()))
    }

    const fn index(self) -> usize {
        match self {
            Self::NotImportant => 0,
            Self::SlightlyImportant => 1,
            Self::VeryImportant => 2,
            Self::Critical => 3,
        }
    }
}

/// How well the practice behind an item is carried out today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Evaluation {
    #[serde(rename = "Não se aplica")]
    NotApplicable,
    #[serde(rename = "Não é feito")]
    NotDone,
    #[serde(rename = "É mal feito")]
    PoorlyDone,
    #[serde(rename = "É feito")]
    Done,
    #[serde(rename = "É bem feito")]
    WellDone,
}

impl Evaluation {
    pub const ALL: [Self; 5] = [
        Self::NotApplicable,
        Self::NotDone,
        Self::PoorlyDone,
        Self::Done,
        Self::WellDone,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotApplicable => "Não se aplica",
            Self::NotDone => "Não é feito",
            Self::PoorlyDone => "É mal feito",
            Self::Done => "É feito",
            Self::WellDone => "É bem feito",
        }
    }

    pub fn from_label(raw: &str) -> Result<Self, ValidationError> {
        let wanted = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.label().to_lowercase() == wanted)
            .ok_or_else(|| ValidationError::UnknownEvaluation(raw.to_string()))
    }

    /// "Not applicable" answers drop out of both numerator and denominator.
    pub const fn is_counted(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    const fn index(self) -> usize {
        match self {
            Self::NotApplicable => 0,
            Self::NotDone => 1,
            Self::PoorlyDone => 2,
            Self::Done => 3,
            Self::WellDone => 4,
        }
    }
}

/// Weights derived from one importance/evaluation pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weighted {
    pub importance_weight: u8,
    pub evaluation_weight: u8,
    pub score: u16,
}

/// Immutable label-to-number tables used by scoring and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightingTable {
    importance: [u8; 4],
    evaluation: [u8; 5],
    maturity: [u8; 5],
}

impl Default for WeightingTable {
    fn default() -> Self {
        Self {
            importance: [0, 3, 6, 9],
            evaluation: [0, 0, 3, 6, 9],
            maturity: [0, 1, 2, 4, MATURITY_MAX],
        }
    }
}

impl WeightingTable {
    pub const fn importance_weight(&self, importance: Importance) -> u8 {
        self.importance[importance.index()]
    }

    pub const fn evaluation_weight(&self, evaluation: Evaluation) -> u8 {
        self.evaluation[evaluation.index()]
    }

    /// Report-only 0–5 maturity value; `None` for answers that do not count.
    pub const fn maturity(&self, evaluation: Evaluation) -> Option<u8> {
        if evaluation.is_counted() {
            Some(self.maturity[evaluation.index()])
        } else {
            None
        }
    }

    pub const fn weigh(&self, importance: Importance, evaluation: Evaluation) -> Weighted {
        let importance_weight = self.importance_weight(importance);
        let evaluation_weight = self.evaluation_weight(evaluation);
        Weighted {
            importance_weight,
            evaluation_weight,
            score: importance_weight as u16 * evaluation_weight as u16,
        }
    }
}
