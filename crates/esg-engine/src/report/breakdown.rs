use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::assessment::scoring::percentage;
use crate::assessment::weighting::{WeightingTable, MATURITY_MAX};
use crate::assessment::{round_score, Response, ScoreCard};
use crate::catalog::{AssessmentItemId, Catalog, PillarCode, PillarId, Theme, ThemeId};

/// Themes at or above this maturity percentage are strengths.
const STRENGTH_FROM: u64 = 80;
/// Themes below this maturity percentage are weaknesses.
const WEAKNESS_BELOW: u64 = 50;

/// Theme result on the 0–5 maturity scale, independent of the 0–9 pillar weighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeScore {
    pub theme_id: ThemeId,
    pub theme_name: String,
    pub score: u32,
    pub max_score: u32,
    pub percentage: Decimal,
    pub questions_count: usize,
    pub answered_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PillarBreakdown {
    pub pillar_id: PillarId,
    pub pillar_code: PillarCode,
    pub pillar_name: String,
    pub score: Decimal,
    pub themes: Vec<ThemeScore>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Per-pillar, per-theme maturity breakdown. Pillar scores come from the frozen card.
pub fn pillar_breakdowns(
    catalog: &Catalog,
    weights: &WeightingTable,
    responses: &[Response],
    scores: &ScoreCard,
) -> Vec<PillarBreakdown> {
    let by_item: HashMap<AssessmentItemId, &Response> = responses
        .iter()
        .map(|response| (response.assessment_item_id, response))
        .collect();

    catalog
        .pillars()
        .iter()
        .map(|pillar| {
            let mut strengths = Vec::new();
            let mut weaknesses = Vec::new();
            let themes = pillar
                .themes
                .iter()
                .map(|theme| {
                    let (view, raw) = theme_score(theme, weights, &by_item);
                    if raw >= Decimal::from(STRENGTH_FROM) {
                        strengths.push(theme.name.clone());
                    } else if raw < Decimal::from(WEAKNESS_BELOW) {
                        weaknesses.push(theme.name.clone());
                    }
                    view
                })
                .collect();

            PillarBreakdown {
                pillar_id: pillar.id,
                pillar_code: pillar.code,
                pillar_name: pillar.name.clone(),
                score: scores.pillar(pillar.code),
                themes,
                strengths,
                weaknesses,
            }
        })
        .collect()
}

/// Returns the view plus the unrounded percentage used for classification.
fn theme_score(
    theme: &Theme,
    weights: &WeightingTable,
    by_item: &HashMap<AssessmentItemId, &Response>,
) -> (ThemeScore, Decimal) {
    let answered: Vec<&Response> = theme
        .items()
        .filter_map(|item| by_item.get(&item.id).copied())
        .collect();
    let maturities: Vec<u32> = answered
        .iter()
        .filter_map(|response| weights.maturity(response.evaluation))
        .filter(|maturity| *maturity > 0)
        .map(u32::from)
        .collect();

    let score: u32 = maturities.iter().sum();
    let max_score = maturities.len() as u32 * u32::from(MATURITY_MAX);
    let raw = percentage(u64::from(score), u64::from(max_score));

    (
        ThemeScore {
            theme_id: theme.id,
            theme_name: theme.name.clone(),
            score,
            max_score,
            percentage: round_score(raw),
            questions_count: theme.items().count(),
            answered_count: answered.len(),
        },
        raw,
    )
}
