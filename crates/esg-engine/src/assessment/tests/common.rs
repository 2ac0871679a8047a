use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response as HttpResponse;
use serde_json::Value;

use crate::assessment::{
    ActionId, ActionPlanEntry, ActionStatus, AssessmentRepository, Diagnosis, DiagnosisAllowance,
    DiagnosisId, DiagnosisQuota, DiagnosisService, DiagnosisStatus, Evaluation, Importance,
    QuotaError, Response, ResponseSubmission, ScoringCommit, StrategicInsight, UserId,
};
use crate::catalog::{sample_catalog, AssessmentItemId, Catalog};
use crate::http::CALLER_HEADER;
use crate::store::memory::InMemoryAssessmentRepository;
use crate::store::RepositoryError;

pub(super) fn user(name: &str) -> UserId {
    UserId(name.to_string())
}

pub(super) fn catalog() -> Arc<Catalog> {
    Arc::new(sample_catalog().expect("sample catalog builds"))
}

pub(super) fn build_service() -> (
    DiagnosisService<InMemoryAssessmentRepository>,
    Arc<InMemoryAssessmentRepository>,
) {
    let repository = Arc::new(InMemoryAssessmentRepository::new());
    let service = DiagnosisService::new(repository.clone(), catalog());
    (service, repository)
}

pub(super) fn submission(
    item: u32,
    importance: Importance,
    evaluation: Evaluation,
) -> ResponseSubmission {
    ResponseSubmission {
        assessment_item_id: AssessmentItemId(item),
        importance: importance.label().to_string(),
        evaluation: evaluation.label().to_string(),
        observations: None,
    }
}

/// Answers every item of the sample catalog with the same pair.
pub(super) fn answer_all<R>(
    service: &DiagnosisService<R>,
    owner: &UserId,
    id: DiagnosisId,
    importance: Importance,
    evaluation: Evaluation,
) where
    R: AssessmentRepository + 'static,
{
    for item in 1..=18 {
        service
            .record_response(owner, id, submission(item, importance, evaluation))
            .expect("response accepted");
    }
}

/// Quota stub that answers with a fixed allowance.
pub(super) struct FixedQuota {
    pub(super) allowed: bool,
}

impl DiagnosisQuota for FixedQuota {
    fn check(&self, _user: &UserId) -> Result<DiagnosisAllowance, QuotaError> {
        Ok(DiagnosisAllowance {
            allowed: self.allowed,
            current_count: 1,
            limit: Some(1),
            plan_code: "free".to_string(),
        })
    }
}

/// Delegates to the in-memory store but reports every scoring commit as stale.
#[derive(Default)]
pub(super) struct ChurningRepository {
    pub(super) inner: InMemoryAssessmentRepository,
}

impl AssessmentRepository for ChurningRepository {
    fn insert_diagnosis(&self, diagnosis: Diagnosis) -> Result<Diagnosis, RepositoryError> {
        self.inner.insert_diagnosis(diagnosis)
    }

    fn fetch_diagnosis(&self, id: DiagnosisId) -> Result<Option<Diagnosis>, RepositoryError> {
        self.inner.fetch_diagnosis(id)
    }

    fn in_progress_for_user(&self, user: &UserId) -> Result<Option<Diagnosis>, RepositoryError> {
        self.inner.in_progress_for_user(user)
    }

    fn diagnoses_for_user(&self, user: &UserId) -> Result<Vec<Diagnosis>, RepositoryError> {
        self.inner.diagnoses_for_user(user)
    }

    fn count_for_user(
        &self,
        user: &UserId,
        statuses: &[DiagnosisStatus],
    ) -> Result<usize, RepositoryError> {
        self.inner.count_for_user(user, statuses)
    }

    fn upsert_response(&self, response: Response) -> Result<Response, RepositoryError> {
        self.inner.upsert_response(response)
    }

    fn responses(&self, id: DiagnosisId) -> Result<Vec<Response>, RepositoryError> {
        self.inner.responses(id)
    }

    fn commit_scoring(&self, _commit: ScoringCommit) -> Result<Diagnosis, RepositoryError> {
        Err(RepositoryError::Stale)
    }

    fn insights(&self, id: DiagnosisId) -> Result<Vec<StrategicInsight>, RepositoryError> {
        self.inner.insights(id)
    }

    fn action_plan(&self, id: DiagnosisId) -> Result<Vec<ActionPlanEntry>, RepositoryError> {
        self.inner.action_plan(id)
    }

    fn update_action_status(
        &self,
        id: DiagnosisId,
        action: ActionId,
        status: ActionStatus,
    ) -> Result<ActionPlanEntry, RepositoryError> {
        self.inner.update_action_status(id, action, status)
    }
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl AssessmentRepository for UnavailableRepository {
    fn insert_diagnosis(&self, _diagnosis: Diagnosis) -> Result<Diagnosis, RepositoryError> {
        offline()
    }

    fn fetch_diagnosis(&self, _id: DiagnosisId) -> Result<Option<Diagnosis>, RepositoryError> {
        offline()
    }

    fn in_progress_for_user(&self, _user: &UserId) -> Result<Option<Diagnosis>, RepositoryError> {
        offline()
    }

    fn diagnoses_for_user(&self, _user: &UserId) -> Result<Vec<Diagnosis>, RepositoryError> {
        offline()
    }

    fn count_for_user(
        &self,
        _user: &UserId,
        _statuses: &[DiagnosisStatus],
    ) -> Result<usize, RepositoryError> {
        offline()
    }

    fn upsert_response(&self, _response: Response) -> Result<Response, RepositoryError> {
        offline()
    }

    fn responses(&self, _id: DiagnosisId) -> Result<Vec<Response>, RepositoryError> {
        offline()
    }

    fn commit_scoring(&self, _commit: ScoringCommit) -> Result<Diagnosis, RepositoryError> {
        offline()
    }

    fn insights(&self, _id: DiagnosisId) -> Result<Vec<StrategicInsight>, RepositoryError> {
        offline()
    }

    fn action_plan(&self, _id: DiagnosisId) -> Result<Vec<ActionPlanEntry>, RepositoryError> {
        offline()
    }

    fn update_action_status(
        &self,
        _id: DiagnosisId,
        _action: ActionId,
        _status: ActionStatus,
    ) -> Result<ActionPlanEntry, RepositoryError> {
        offline()
    }
}

pub(super) fn request(
    method: &str,
    uri: &str,
    caller: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header(CALLER_HEADER, caller);
    }
    match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: HttpResponse) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
