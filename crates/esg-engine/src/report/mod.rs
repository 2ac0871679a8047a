//! Full diagnosis report: frozen scores, maturity breakdown per theme, executive
//! summary and the evolution against earlier completed diagnoses.

mod breakdown;
mod summary;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::assessment::action_plan::sort_for_display;
use crate::assessment::{
    certification_level, ActionPlanEntry, CertificateBadge, CertificationScheme, Diagnosis,
    DiagnosisId, Response, ScoreCard, StrategicInsight, TierView, WeightingTable,
};
use crate::catalog::Catalog;

pub use breakdown::{pillar_breakdowns, PillarBreakdown, ThemeScore};
pub use summary::{executive_summary, overall_assessment, ExecutiveSummary};

/// Scores of an earlier completed diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionPoint {
    pub diagnosis_id: DiagnosisId,
    pub date: Option<DateTime<Utc>>,
    pub overall: Decimal,
    pub environmental: Decimal,
    pub social: Decimal,
    pub governance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub report_date: DateTime<Utc>,
    pub diagnosis_id: DiagnosisId,
    pub completed_at: Option<DateTime<Utc>>,
    pub scores: ScoreCard,
    pub certification: TierView,
    pub badge: CertificateBadge,
    pub pillar_breakdowns: Vec<PillarBreakdown>,
    pub insights: Vec<StrategicInsight>,
    pub action_plan: Vec<ActionPlanEntry>,
    pub evolution: Vec<EvolutionPoint>,
    pub summary: ExecutiveSummary,
}

/// Everything the report reads, gathered by the caller.
#[derive(Debug, Clone)]
pub struct ReportSources {
    pub diagnosis: Diagnosis,
    pub scores: ScoreCard,
    pub responses: Vec<Response>,
    pub insights: Vec<StrategicInsight>,
    pub action_plan: Vec<ActionPlanEntry>,
    /// Earlier completed diagnoses, newest first.
    pub previous: Vec<Diagnosis>,
}

pub struct ReportBuilder<'a> {
    catalog: &'a Catalog,
    weights: &'a WeightingTable,
    certification: &'a CertificationScheme,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        catalog: &'a Catalog,
        weights: &'a WeightingTable,
        certification: &'a CertificationScheme,
    ) -> Self {
        Self {
            catalog,
            weights,
            certification,
        }
    }

    pub fn build(&self, sources: ReportSources, now: DateTime<Utc>) -> DiagnosisReport {
        let ReportSources {
            diagnosis,
            scores,
            responses,
            mut insights,
            mut action_plan,
            previous,
        } = sources;

        let tier = certification_level(scores.overall);
        let breakdowns = pillar_breakdowns(self.catalog, self.weights, &responses, &scores);
        let summary = executive_summary(&scores, tier, &breakdowns);
        insights.sort_by_key(|insight| insight.category);
        sort_for_display(&mut action_plan);

        let evolution = previous
            .iter()
            .filter_map(|earlier| {
                earlier.scores.map(|card| EvolutionPoint {
                    diagnosis_id: earlier.id,
                    date: earlier.completed_at,
                    overall: card.overall,
                    environmental: card.environmental,
                    social: card.social,
                    governance: card.governance,
                })
            })
            .collect();

        DiagnosisReport {
            report_date: now,
            diagnosis_id: diagnosis.id,
            completed_at: diagnosis.completed_at,
            scores,
            certification: tier,
            badge: self.certification.badge(scores.overall),
            pillar_breakdowns: breakdowns,
            insights,
            action_plan,
            evolution,
            summary,
        }
    }
}
