use crate::infra::{parse_date, parse_score, Platform};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use esg_engine::assessment::{
    certification_level, CertificationScheme, CompletionOutcome, Evaluation, Importance,
    ResponseSubmission, UserId,
};
use esg_engine::billing::{BillingMethod, PlanCode, ProviderPaymentStatus};
use esg_engine::config::{AppConfig, CertificationConfig};
use esg_engine::consultation::ScheduleRequest;
use esg_engine::error::AppError;
use esg_engine::report::DiagnosisReport;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Args, Debug)]
pub(crate) struct CertificationArgs {
    /// Overall score between 0 and 100
    #[arg(value_parser = parse_score)]
    pub(crate) score: Decimal,
    /// Lowest score earning the silver badge
    #[arg(long, value_parser = parse_score, default_value = "40")]
    pub(crate) silver_from: Decimal,
    /// Lowest score earning the gold badge
    #[arg(long, value_parser = parse_score, default_value = "70")]
    pub(crate) gold_from: Decimal,
}

/// Answer pattern used to fill in the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MaturityProfile {
    Starting,
    Developing,
    Leading,
}

impl MaturityProfile {
    fn answer(self, position: usize) -> (Importance, Evaluation) {
        match self {
            Self::Starting => {
                let importance = if position % 2 == 0 {
                    Importance::Critical
                } else {
                    Importance::VeryImportant
                };
                let evaluation = [
                    Evaluation::NotDone,
                    Evaluation::PoorlyDone,
                    Evaluation::NotDone,
                    Evaluation::Done,
                ][position % 4];
                (importance, evaluation)
            }
            Self::Developing => {
                let importance = [
                    Importance::Critical,
                    Importance::VeryImportant,
                    Importance::SlightlyImportant,
                ][position % 3];
                let evaluation = [
                    Evaluation::Done,
                    Evaluation::PoorlyDone,
                    Evaluation::WellDone,
                    Evaluation::NotApplicable,
                    Evaluation::Done,
                    Evaluation::NotDone,
                ][position % 6];
                (importance, evaluation)
            }
            Self::Leading => {
                let evaluation = if position % 3 == 2 {
                    Evaluation::Done
                } else {
                    Evaluation::WellDone
                };
                (Importance::Critical, evaluation)
            }
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// User id the demo company acts as
    #[arg(long, default_value = "demo-company")]
    pub(crate) user: String,
    /// Answer pattern for the questionnaire
    #[arg(long, value_enum, default_value_t = MaturityProfile::Developing)]
    pub(crate) profile: MaturityProfile,
    /// Paid plan purchased before booking a consultation
    #[arg(long, default_value = "professional")]
    pub(crate) plan: String,
    /// Consultation date (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(long, value_parser = parse_date)]
    pub(crate) consultation_date: Option<NaiveDate>,
    /// Skip the subscription and consultation portion of the demo
    #[arg(long)]
    pub(crate) skip_billing: bool,
    /// Print the final summary as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

/// Machine-readable digest of a demo run.
#[derive(Debug, Serialize)]
struct DemoSummary {
    user: String,
    overall: Decimal,
    level: &'static str,
    badge: &'static str,
    insights: usize,
    actions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hours_remaining: Option<Decimal>,
}

pub(crate) fn run_certification(args: CertificationArgs) -> Result<(), AppError> {
    let CertificationArgs {
        score,
        silver_from,
        gold_from,
    } = args;

    if silver_from > gold_from {
        println!("Silver threshold {silver_from} must not exceed gold threshold {gold_from}");
        return Ok(());
    }

    let scheme = CertificationScheme::from(&CertificationConfig {
        silver_from,
        gold_from,
    });
    let tier = certification_level(score);
    let badge = scheme.badge(score);
    println!("Score {score}");
    println!("- Tier: {} ({})", tier.label, tier.level.code());
    println!("- Badge: {} | {}", badge.name, badge.title);
    println!("  {}", badge.message);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        user,
        profile,
        plan,
        consultation_date,
        skip_billing,
        json,
    } = args;

    let config = AppConfig::load()?;
    let platform = Platform::in_memory(&config)?;
    let owner = UserId(user.clone());

    println!("ESG assessment demo for '{user}' ({profile:?} profile)");
    let Some(outcome) = run_assessment(&platform, &owner, profile) else {
        return Ok(());
    };

    let report = match platform.diagnoses.report(&owner, outcome.diagnosis.id) {
        Ok(report) => report,
        Err(err) => {
            println!("  Report unavailable: {err}");
            return Ok(());
        }
    };
    render_report(&report);

    let mut summary = DemoSummary {
        user,
        overall: outcome.scores.overall,
        level: outcome.level.label,
        badge: report.badge.name,
        insights: outcome.insights.len(),
        actions: outcome.action_plan.len(),
        plan: None,
        hours_remaining: None,
    };

    if !skip_billing {
        let date = consultation_date
            .unwrap_or_else(|| (Utc::now() + Duration::days(1)).date_naive());
        run_billing(&platform, &owner, &plan, date, &mut summary);
    }

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("\n{payload}"),
            Err(err) => println!("\nSummary unavailable: {err}"),
        }
    }
    Ok(())
}

fn run_assessment(
    platform: &Platform,
    owner: &UserId,
    profile: MaturityProfile,
) -> Option<CompletionOutcome> {
    let diagnoses = &platform.diagnoses;
    let started = match diagnoses.start(owner) {
        Ok(started) => started,
        Err(err) => {
            println!("  Diagnosis not started: {err}");
            return None;
        }
    };
    let diagnosis_id = started.diagnosis.id;

    let items: Vec<_> = diagnoses
        .catalog()
        .pillars()
        .iter()
        .flat_map(|pillar| pillar.items().map(|item| item.id))
        .collect();
    for (position, item) in items.into_iter().enumerate() {
        let (importance, evaluation) = profile.answer(position);
        let submission = ResponseSubmission {
            assessment_item_id: item,
            importance: importance.label().to_string(),
            evaluation: evaluation.label().to_string(),
            observations: None,
        };
        if let Err(err) = diagnoses.record_response(owner, diagnosis_id, submission) {
            println!("  Answer for item {item} rejected: {err}");
            return None;
        }
    }

    if let Ok(progress) = diagnoses.progress(owner, diagnosis_id) {
        println!(
            "- Questionnaire: {}/{} answered ({}%)",
            progress.answered, progress.total, progress.progress
        );
    }

    let outcome = match diagnoses.complete(owner, diagnosis_id) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Completion failed: {err}");
            return None;
        }
    };
    println!(
        "- Scores: E {} | S {} | G {} | overall {} -> {}",
        outcome.scores.environmental,
        outcome.scores.social,
        outcome.scores.governance,
        outcome.scores.overall,
        outcome.level.label
    );
    println!("Strategic insights:");
    for insight in &outcome.insights {
        println!("  - [{}] {}", insight.category_label, insight.title);
    }
    if outcome.action_plan.is_empty() {
        println!("Action plan: nothing urgent");
    } else {
        println!("Action plan (top {}):", outcome.action_plan.len().min(5));
        for entry in outcome.action_plan.iter().take(5) {
            println!(
                "  - {} | {} | {} days | impact {}",
                entry.title, entry.priority_label, entry.deadline_days, entry.impact_score
            );
        }
    }
    Some(outcome)
}

fn render_report(report: &DiagnosisReport) {
    let summary = &report.summary;
    println!("\nExecutive summary");
    println!("- {}", summary.overall_assessment);
    println!(
        "- Strongest pillar: {} ({}) | weakest: {} ({})",
        summary.strongest_pillar,
        summary.strongest_pillar_score,
        summary.weakest_pillar,
        summary.weakest_pillar_score
    );
    println!("- Certificate: {} ({})", report.badge.name, report.badge.title);
    for pillar in &report.pillar_breakdowns {
        println!(
            "  - {}: {} | {} strengths | {} weaknesses",
            pillar.pillar_name,
            pillar.score,
            pillar.strengths.len(),
            pillar.weaknesses.len()
        );
    }
    println!("- Recommendation: {}", summary.recommendation);
}

fn run_billing(
    platform: &Platform,
    owner: &UserId,
    plan: &str,
    date: NaiveDate,
    summary: &mut DemoSummary,
) {
    let billing = &platform.billing;
    println!("\nSubscription and consultation demo");

    let checkout = match billing
        .subscriptions
        .subscribe(owner, &PlanCode::new(plan), BillingMethod::Pix)
    {
        Ok(checkout) => checkout,
        Err(err) => {
            println!("  Subscription rejected: {err}");
            return;
        }
    };
    println!(
        "- Checkout for '{}' -> status {}",
        checkout.subscription.plan_code,
        checkout.subscription.status.label()
    );
    if let Some(url) = &checkout.checkout_url {
        println!("  Payment link: {url}");
    }

    if let Some(external_id) = &checkout.subscription.external_id {
        if let Err(err) = platform
            .gateway
            .settle(external_id, ProviderPaymentStatus::Confirmed)
        {
            println!("  Sandbox payment failed: {err}");
            return;
        }
    }
    match billing.subscriptions.sync_status(owner) {
        Ok(report) => println!(
            "- Provider reports {:?}; subscription now {}",
            report.provider_status,
            report.subscription.status.label()
        ),
        Err(err) => {
            println!("  Status sync failed: {err}");
            return;
        }
    }
    summary.plan = Some(plan.to_string());

    let consultations = &platform.consultations;
    let open_slot = consultations
        .available_slots(date)
        .ok()
        .and_then(|slots| slots.into_iter().find(|slot| slot.available));
    let Some(slot) = open_slot else {
        println!("  No consultation slots available on {date}");
        return;
    };
    let request = ScheduleRequest {
        scheduled_at: slot.starts_at,
        duration_minutes: 90,
        topic: Some("Plano de ação ESG".to_string()),
    };
    let booked = match consultations.schedule(owner, request) {
        Ok(booked) => booked,
        Err(err) => {
            println!("  Consultation not booked: {err}");
            return;
        }
    };
    println!(
        "- Consultation booked for {} ({} min)",
        booked.scheduled_at, booked.duration_minutes
    );

    let completed = consultations.start(owner, booked.id).and_then(|_| {
        consultations.complete(
            owner,
            booked.id,
            Some("Prioridades revisadas com o consultor".to_string()),
        )
    });
    if let Err(err) = completed {
        println!("  Consultation not completed: {err}");
        return;
    }

    match billing.entitlements.remaining_hours(owner) {
        Ok(balance) => {
            println!(
                "- Consultation hours: {} used of {} | {} remaining",
                balance.used, balance.total, balance.remaining
            );
            summary.hours_remaining = Some(balance.remaining);
        }
        Err(err) => println!("  Hours unavailable: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_cover_every_answer_shape() {
        let starting: Vec<_> = (0..4).map(|i| MaturityProfile::Starting.answer(i)).collect();
        assert_eq!(starting[0], (Importance::Critical, Evaluation::NotDone));
        assert_eq!(starting[3], (Importance::VeryImportant, Evaluation::Done));

        let developing = MaturityProfile::Developing.answer(3);
        assert_eq!(developing.1, Evaluation::NotApplicable);

        assert!((0..18)
            .map(|i| MaturityProfile::Leading.answer(i).1)
            .all(|evaluation| matches!(evaluation, Evaluation::Done | Evaluation::WellDone)));
    }

    #[test]
    fn certification_lookup_accepts_custom_thresholds() {
        let args = CertificationArgs {
            score: Decimal::from(55),
            silver_from: Decimal::from(30),
            gold_from: Decimal::from(50),
        };
        assert!(run_certification(args).is_ok());
    }
}
