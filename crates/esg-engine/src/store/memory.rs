//! Mutex-guarded in-memory repositories. Each repository keeps all of its tables
//! behind one lock so multi-row writes are atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::RepositoryError;
use crate::assessment::{
    ActionId, ActionPlanEntry, ActionStatus, AssessmentRepository, CommitTransition, Diagnosis,
    DiagnosisId, DiagnosisStatus, Response, ScoringCommit, StrategicInsight, UserId,
};
use crate::billing::{
    ExternalSubscriptionId, HoursDebit, PlanChange, SubscriptionId, SubscriptionPlan,
    SubscriptionRepository, SubscriptionStatus, UserSubscription,
};
use crate::catalog::AssessmentItemId;
use crate::consultation::{
    Consultation, ConsultationId, ConsultationRepository, ConsultationStatus,
    ConsultationTransition,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} store lock poisoned")))
}

#[derive(Debug, Default)]
struct AssessmentTables {
    diagnoses: HashMap<DiagnosisId, Diagnosis>,
    responses: HashMap<DiagnosisId, BTreeMap<AssessmentItemId, Response>>,
    insights: HashMap<DiagnosisId, Vec<StrategicInsight>>,
    action_plans: HashMap<DiagnosisId, Vec<ActionPlanEntry>>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAssessmentRepository {
    tables: Arc<Mutex<AssessmentTables>>,
}

impl InMemoryAssessmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn insert_diagnosis(&self, diagnosis: Diagnosis) -> Result<Diagnosis, RepositoryError> {
        let mut tables = lock(&self.tables, "assessment")?;
        let open_exists = tables.diagnoses.values().any(|existing| {
            existing.user_id == diagnosis.user_id && existing.status == DiagnosisStatus::InProgress
        });
        if open_exists || tables.diagnoses.contains_key(&diagnosis.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.diagnoses.insert(diagnosis.id, diagnosis.clone());
        Ok(diagnosis)
    }

    fn fetch_diagnosis(&self, id: DiagnosisId) -> Result<Option<Diagnosis>, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        Ok(tables.diagnoses.get(&id).cloned())
    }

    fn in_progress_for_user(&self, user: &UserId) -> Result<Option<Diagnosis>, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        Ok(tables
            .diagnoses
            .values()
            .find(|diagnosis| {
                &diagnosis.user_id == user && diagnosis.status == DiagnosisStatus::InProgress
            })
            .cloned())
    }

    fn diagnoses_for_user(&self, user: &UserId) -> Result<Vec<Diagnosis>, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        let mut owned: Vec<Diagnosis> = tables
            .diagnoses
            .values()
            .filter(|diagnosis| &diagnosis.user_id == user)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    fn count_for_user(
        &self,
        user: &UserId,
        statuses: &[DiagnosisStatus],
    ) -> Result<usize, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        Ok(tables
            .diagnoses
            .values()
            .filter(|diagnosis| &diagnosis.user_id == user && statuses.contains(&diagnosis.status))
            .count())
    }

    fn upsert_response(&self, response: Response) -> Result<Response, RepositoryError> {
        let mut tables = lock(&self.tables, "assessment")?;
        let diagnosis = tables
            .diagnoses
            .get_mut(&response.diagnosis_id)
            .ok_or(RepositoryError::NotFound)?;
        if diagnosis.is_completed() {
            return Err(RepositoryError::Locked);
        }
        diagnosis.revision += 1;

        tables
            .responses
            .entry(response.diagnosis_id)
            .or_default()
            .insert(response.assessment_item_id, response.clone());
        Ok(response)
    }

    fn responses(&self, id: DiagnosisId) -> Result<Vec<Response>, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        Ok(tables
            .responses
            .get(&id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn commit_scoring(&self, commit: ScoringCommit) -> Result<Diagnosis, RepositoryError> {
        let mut tables = lock(&self.tables, "assessment")?;
        let diagnosis = tables
            .diagnoses
            .get_mut(&commit.diagnosis_id)
            .ok_or(RepositoryError::NotFound)?;

        let allowed = match commit.transition {
            CommitTransition::Complete { .. } => !diagnosis.is_completed(),
            CommitTransition::Rescore => diagnosis.is_completed(),
        };
        if !allowed {
            return Err(RepositoryError::InvalidTransition);
        }
        if diagnosis.revision != commit.expected_revision {
            return Err(RepositoryError::Stale);
        }

        diagnosis.scores = Some(commit.scores);
        diagnosis.revision += 1;
        if let CommitTransition::Complete { at } = commit.transition {
            diagnosis.status = DiagnosisStatus::Completed;
            diagnosis.completed_at = Some(at);
        }
        let committed = diagnosis.clone();

        tables
            .insights
            .insert(commit.diagnosis_id, commit.outputs.insights);
        tables
            .action_plans
            .insert(commit.diagnosis_id, commit.outputs.action_plan);
        Ok(committed)
    }

    fn insights(&self, id: DiagnosisId) -> Result<Vec<StrategicInsight>, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        Ok(tables.insights.get(&id).cloned().unwrap_or_default())
    }

    fn action_plan(&self, id: DiagnosisId) -> Result<Vec<ActionPlanEntry>, RepositoryError> {
        let tables = lock(&self.tables, "assessment")?;
        Ok(tables.action_plans.get(&id).cloned().unwrap_or_default())
    }

    fn update_action_status(
        &self,
        id: DiagnosisId,
        action: ActionId,
        status: ActionStatus,
    ) -> Result<ActionPlanEntry, RepositoryError> {
        let mut tables = lock(&self.tables, "assessment")?;
        let entry = tables
            .action_plans
            .get_mut(&id)
            .and_then(|entries| entries.iter_mut().find(|entry| entry.id == action))
            .ok_or(RepositoryError::NotFound)?;
        entry.status = status;
        Ok(entry.clone())
    }
}

/// Subscriptions in insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemorySubscriptionRepository {
    records: Arc<Mutex<Vec<UserSubscription>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_mut(
    records: &mut [UserSubscription],
    id: SubscriptionId,
) -> Result<&mut UserSubscription, RepositoryError> {
    records
        .iter_mut()
        .find(|record| record.id == id)
        .ok_or(RepositoryError::NotFound)
}

impl SubscriptionRepository for InMemorySubscriptionRepository {
    fn insert(&self, subscription: UserSubscription) -> Result<UserSubscription, RepositoryError> {
        let mut records = lock(&self.records, "subscription")?;
        let duplicate = records.iter().any(|existing| {
            existing.id == subscription.id
                || (subscription.external_id.is_some()
                    && existing.external_id == subscription.external_id)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        records.push(subscription.clone());
        Ok(subscription)
    }

    fn fetch(&self, id: SubscriptionId) -> Result<Option<UserSubscription>, RepositoryError> {
        let records = lock(&self.records, "subscription")?;
        Ok(records.iter().find(|record| record.id == id).cloned())
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<UserSubscription>, RepositoryError> {
        let records = lock(&self.records, "subscription")?;
        // Reverse first so equal timestamps keep the later insert on top.
        let mut owned: Vec<UserSubscription> = records
            .iter()
            .rev()
            .filter(|record| &record.user_id == user)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    fn by_external_id(
        &self,
        external_id: &ExternalSubscriptionId,
    ) -> Result<Option<UserSubscription>, RepositoryError> {
        let records = lock(&self.records, "subscription")?;
        Ok(records
            .iter()
            .find(|record| record.external_id.as_ref() == Some(external_id))
            .cloned())
    }

    fn transition(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> Result<UserSubscription, RepositoryError> {
        let mut records = lock(&self.records, "subscription")?;
        let record = find_mut(&mut records, id)?;
        if record.status != from {
            return Err(RepositoryError::Stale);
        }
        record.status = to;
        record.updated_at = at;
        Ok(record.clone())
    }

    fn change_plan(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        plan: &SubscriptionPlan,
        at: DateTime<Utc>,
    ) -> Result<PlanChange, RepositoryError> {
        let mut records = lock(&self.records, "subscription")?;
        let record = find_mut(&mut records, id)?;
        if record.status != from {
            return Err(RepositoryError::Stale);
        }
        if record.consultation_hours_used > plan.consultation_hours {
            return Ok(PlanChange::HoursExceeded {
                used: record.consultation_hours_used,
            });
        }
        record.plan_code = plan.code.clone();
        record.status = SubscriptionStatus::Active;
        record.updated_at = at;
        Ok(PlanChange::Applied(record.clone()))
    }

    fn debit_hours(
        &self,
        id: SubscriptionId,
        hours: Decimal,
        cap: Decimal,
    ) -> Result<HoursDebit, RepositoryError> {
        let mut records = lock(&self.records, "subscription")?;
        let record = find_mut(&mut records, id)?;
        if record.status != SubscriptionStatus::Active {
            return Ok(HoursDebit::Inactive);
        }
        let total_used = record.consultation_hours_used + hours;
        if total_used > cap {
            return Ok(HoursDebit::Exceeded {
                used: record.consultation_hours_used,
            });
        }
        record.consultation_hours_used = total_used;
        record.updated_at = Utc::now();
        Ok(HoursDebit::Applied { total_used })
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryConsultationRepository {
    records: Arc<Mutex<HashMap<ConsultationId, Consultation>>>,
}

impl InMemoryConsultationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsultationRepository for InMemoryConsultationRepository {
    fn insert_if_free(
        &self,
        consultation: Consultation,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Consultation, RepositoryError> {
        let mut records = lock(&self.records, "consultation")?;
        let clashes = records.values().any(|existing| {
            existing.user_id == consultation.user_id
                && existing.status.is_open()
                && existing.scheduled_at >= window_start
                && existing.scheduled_at <= window_end
        });
        if clashes || records.contains_key(&consultation.id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(consultation.id, consultation.clone());
        Ok(consultation)
    }

    fn fetch(&self, id: ConsultationId) -> Result<Option<Consultation>, RepositoryError> {
        let records = lock(&self.records, "consultation")?;
        Ok(records.get(&id).cloned())
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<Consultation>, RepositoryError> {
        let records = lock(&self.records, "consultation")?;
        let mut owned: Vec<Consultation> = records
            .values()
            .filter(|consultation| &consultation.user_id == user)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(owned)
    }

    fn open_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Consultation>, RepositoryError> {
        let records = lock(&self.records, "consultation")?;
        Ok(records
            .values()
            .filter(|consultation| {
                consultation.status.is_open()
                    && consultation.scheduled_at >= from
                    && consultation.scheduled_at <= to
            })
            .cloned()
            .collect())
    }

    fn transition(
        &self,
        id: ConsultationId,
        transition: ConsultationTransition,
    ) -> Result<Consultation, RepositoryError> {
        let mut records = lock(&self.records, "consultation")?;
        let record = records.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != transition.from {
            return Err(RepositoryError::Stale);
        }

        match transition.to {
            ConsultationStatus::InProgress => {
                record.started_at.get_or_insert(transition.at);
                record.completed_at = None;
            }
            ConsultationStatus::Completed => record.completed_at = Some(transition.at),
            ConsultationStatus::Scheduled | ConsultationStatus::Cancelled => {}
        }
        if let Some(notes) = transition.notes {
            record.notes = Some(notes);
        }
        record.status = transition.to;
        record.updated_at = transition.at;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{GeneratedOutputs, ScoreCard};
    use crate::billing::standard_plans;
    use crate::billing::PlanCode;

    #[test]
    fn second_open_diagnosis_for_a_user_conflicts() {
        let repository = InMemoryAssessmentRepository::new();
        let user = UserId("u-1".to_string());
        repository
            .insert_diagnosis(Diagnosis::open(user.clone(), Utc::now()))
            .expect("first insert");
        let second = repository.insert_diagnosis(Diagnosis::open(user, Utc::now()));
        assert_eq!(second.err(), Some(RepositoryError::Conflict));
    }

    #[test]
    fn scoring_commit_rejects_a_moved_revision() {
        let repository = InMemoryAssessmentRepository::new();
        let diagnosis = repository
            .insert_diagnosis(Diagnosis::open(UserId("u-2".to_string()), Utc::now()))
            .expect("insert");
        let commit = |revision| ScoringCommit {
            diagnosis_id: diagnosis.id,
            expected_revision: revision,
            scores: ScoreCard::zero(),
            outputs: GeneratedOutputs::default(),
            transition: CommitTransition::Complete { at: Utc::now() },
        };

        assert_eq!(
            repository.commit_scoring(commit(7)).err(),
            Some(RepositoryError::Stale)
        );
        let committed = repository.commit_scoring(commit(0)).expect("commit");
        assert!(committed.is_completed());
        assert_eq!(
            repository.commit_scoring(commit(committed.revision)).err(),
            Some(RepositoryError::InvalidTransition)
        );
    }

    #[test]
    fn debit_refuses_to_cross_the_cap() {
        let repository = InMemorySubscriptionRepository::new();
        let plans = standard_plans();
        let plan = plans.get(&PlanCode::new("basic")).expect("basic plan");
        let subscription = repository
            .insert(UserSubscription::new(
                UserId("u-3".to_string()),
                plan,
                SubscriptionStatus::Active,
                Utc::now(),
            ))
            .expect("insert");

        let cap = Decimal::from(2);
        assert_eq!(
            repository
                .debit_hours(subscription.id, Decimal::new(15, 1), cap)
                .expect("debit"),
            HoursDebit::Applied {
                total_used: Decimal::new(15, 1)
            }
        );
        assert_eq!(
            repository
                .debit_hours(subscription.id, Decimal::ONE, cap)
                .expect("debit"),
            HoursDebit::Exceeded {
                used: Decimal::new(15, 1)
            }
        );
    }
}
