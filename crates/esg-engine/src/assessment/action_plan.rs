use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{ActionId, OutputIds, Response};
use super::weighting::{Evaluation, Importance, MAX_RESPONSE_SCORE};
use crate::catalog::{AssessmentItemId, Catalog, InvestmentLevel};

/// Upper bound on generated remediation entries per diagnosis.
pub const ACTION_PLAN_LIMIT: usize = 10;

const TITLE_QUESTION_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Critical,
    High,
    Medium,
}

impl ActionPriority {
    fn classify(importance: Importance, evaluation: Evaluation) -> Self {
        let critical_importance = importance == Importance::Critical;
        let not_done = evaluation == Evaluation::NotDone;
        match (critical_importance, not_done) {
            (true, true) => Self::Critical,
            (true, false) | (false, true) => Self::High,
            (false, false) => Self::Medium,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "PRIORIDADE CRÍTICA",
            Self::High => "ALTA PRIORIDADE",
            Self::Medium => "MÉDIA PRIORIDADE",
        }
    }

    pub const fn deadline_days(self) -> u16 {
        match self {
            Self::Critical => 30,
            Self::High => 60,
            Self::Medium => 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlanEntry {
    pub id: ActionId,
    pub assessment_item_id: AssessmentItemId,
    pub title: String,
    pub description: String,
    pub priority: ActionPriority,
    pub priority_label: String,
    pub investment: InvestmentLevel,
    pub investment_label: String,
    pub deadline_days: u16,
    pub impact_score: Decimal,
    pub status: ActionStatus,
}

/// Normalized gap between a perfect answer and the current one, on a 0–10 scale.
pub fn impact_score(importance_weight: u8, evaluation_weight: u8) -> Decimal {
    let best = Decimal::from(importance_weight) * Decimal::from(9);
    let current = Decimal::from(importance_weight) * Decimal::from(evaluation_weight);
    let percent = (best - current) * Decimal::ONE_HUNDRED / Decimal::from(MAX_RESPONSE_SCORE);
    percent.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero) / Decimal::TEN
}

fn is_candidate(response: &Response) -> bool {
    matches!(
        response.importance,
        Importance::VeryImportant | Importance::Critical
    ) && matches!(
        response.evaluation,
        Evaluation::NotDone | Evaluation::PoorlyDone
    )
}

fn title(position: usize, question: &str) -> String {
    let mut chars = question.chars();
    let head: String = chars.by_ref().take(TITLE_QUESTION_CHARS).collect();
    let ellipsis = if chars.next().is_some() { "..." } else { "" };
    format!("{position}. Implementar: {head}{ellipsis}")
}

/// Picks the important, underperforming answers and turns them into a ranked plan.
pub fn generate_action_plan(
    responses: &[Response],
    catalog: &Catalog,
    ids: &OutputIds,
) -> Vec<ActionPlanEntry> {
    let mut candidates: Vec<&Response> = responses.iter().filter(|r| is_candidate(r)).collect();
    candidates.sort_by(|a, b| {
        b.importance_weight
            .cmp(&a.importance_weight)
            .then(a.evaluation_weight.cmp(&b.evaluation_weight))
    });

    candidates
        .into_iter()
        .filter_map(|response| match catalog.context(response.assessment_item_id) {
            Some(context) => Some((response, context)),
            None => {
                warn!(
                    item = %response.assessment_item_id,
                    "response references an item missing from the catalog"
                );
                None
            }
        })
        .take(ACTION_PLAN_LIMIT)
        .enumerate()
        .map(|(index, (response, context))| {
            let priority = ActionPriority::classify(response.importance, response.evaluation);
            let investment = context.theme.investment_level();
            let question = &context.item.question;
            ActionPlanEntry {
                id: ids.next_action(),
                assessment_item_id: response.assessment_item_id,
                title: title(index + 1, question),
                description: format!(
                    "{} - {}: {}. Esta ação terá impacto significativo no seu score ESG, melhorando a performance neste critério crítico.",
                    context.pillar.name, context.theme.name, question
                ),
                priority,
                priority_label: priority.label().to_string(),
                investment,
                investment_label: investment.label().to_string(),
                deadline_days: priority.deadline_days(),
                impact_score: impact_score(response.importance_weight, response.evaluation_weight),
                status: ActionStatus::Pending,
            }
        })
        .collect()
}

/// Display order: priority first, then impact descending.
pub fn sort_for_display(entries: &mut [ActionPlanEntry]) {
    entries.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.impact_score.cmp(&a.impact_score))
    });
}
