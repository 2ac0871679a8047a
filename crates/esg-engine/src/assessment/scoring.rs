use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use super::domain::{Response, ScoreCard};
use super::weighting::MAX_RESPONSE_SCORE;
use crate::catalog::{Catalog, PillarCode};

/// Rounds a percentage to two places, halves away from zero.
pub fn round_score(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator × 100`, or zero when there is nothing to divide by.
pub(crate) fn percentage(numerator: u64, denominator: u64) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator) * Decimal::ONE_HUNDRED / Decimal::from(denominator)
}

/// Aggregates weighted responses into pillar and overall percentages.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    catalog: Arc<Catalog>,
}

impl ScoringEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Percentage for one pillar. Responses outside the pillar are ignored and
    /// "not applicable" answers count toward neither the sum nor the maximum.
    pub fn pillar_score(&self, code: PillarCode, responses: &[Response]) -> Decimal {
        let (total, counted) = responses
            .iter()
            .filter(|response| self.catalog.pillar_of(response.assessment_item_id) == Some(code))
            .filter(|response| response.evaluation.is_counted())
            .fold((0u64, 0u64), |(total, counted), response| {
                let product =
                    u64::from(response.importance_weight) * u64::from(response.evaluation_weight);
                (total + product, counted + 1)
            });

        round_score(percentage(total, counted * u64::from(MAX_RESPONSE_SCORE)))
    }

    /// Scores all three pillars and the overall mean. Pure; persisting is the caller's job.
    pub fn score(&self, responses: &[Response]) -> ScoreCard {
        ScoreCard::from_pillars(
            self.pillar_score(PillarCode::Environmental, responses),
            self.pillar_score(PillarCode::Social, responses),
            self.pillar_score(PillarCode::Governance, responses),
        )
    }
}
