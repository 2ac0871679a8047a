use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use esg_engine::assessment::{CertificationScheme, DiagnosisService};
use esg_engine::billing::{
    standard_plans, BillingState, CheckoutRequest, EntitlementService, ExternalSubscriptionId,
    GatewayError, GatewaySubscription, PaymentEventReconciler, PaymentGateway, PlanCode,
    ProviderPaymentStatus, SubscriptionService,
};
use esg_engine::catalog::{sample_catalog, Catalog, CatalogError};
use esg_engine::config::{AppConfig, CatalogConfig};
use esg_engine::consultation::ConsultationService;
use esg_engine::error::AppError;
use esg_engine::store::memory::{
    InMemoryAssessmentRepository, InMemoryConsultationRepository, InMemorySubscriptionRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use tracing::info;

pub(crate) type Diagnoses = DiagnosisService<InMemoryAssessmentRepository>;
pub(crate) type Billing = BillingState<InMemorySubscriptionRepository, InMemoryAssessmentRepository>;
pub(crate) type Consultations = ConsultationService<InMemoryConsultationRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every domain service wired against the in-memory stores.
pub(crate) struct Platform {
    pub(crate) diagnoses: Arc<Diagnoses>,
    pub(crate) billing: Billing,
    pub(crate) consultations: Arc<Consultations>,
    pub(crate) gateway: Arc<SandboxPaymentGateway>,
}

impl Platform {
    pub(crate) fn in_memory(config: &AppConfig) -> Result<Self, AppError> {
        let catalog = Arc::new(load_catalog(&config.catalog)?);
        let plans = Arc::new(standard_plans());
        let assessments = Arc::new(InMemoryAssessmentRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = Arc::new(SandboxPaymentGateway::default());

        let entitlements = Arc::new(EntitlementService::new(
            subscriptions.clone(),
            assessments.clone(),
            plans.clone(),
            PlanCode::new(config.billing.free_plan_code.clone()),
        ));
        let diagnoses = DiagnosisService::new(assessments, catalog)
            .with_quota(entitlements.clone())
            .with_certification(CertificationScheme::from(&config.certification));
        let consultations = ConsultationService::new(
            Arc::new(InMemoryConsultationRepository::new()),
            entitlements.clone(),
        );
        let billing = BillingState {
            entitlements,
            subscriptions: Arc::new(SubscriptionService::new(
                subscriptions.clone(),
                plans,
                gateway.clone(),
            )),
            reconciler: Arc::new(PaymentEventReconciler::new(subscriptions)),
            webhook_token: config.billing.webhook_token.clone(),
        };

        Ok(Self {
            diagnoses: Arc::new(diagnoses),
            billing,
            consultations: Arc::new(consultations),
            gateway,
        })
    }
}

pub(crate) fn load_catalog(config: &CatalogConfig) -> Result<Catalog, CatalogError> {
    let catalog = match &config.question_bank {
        Some(path) => Catalog::from_question_bank_path(path)?,
        None => sample_catalog()?,
    };
    let source = match &config.question_bank {
        Some(_) => "question_bank",
        None => "sample",
    };
    info!(items = catalog.item_count(), source, "assessment catalog loaded");
    Ok(catalog)
}

/// Payment provider stand-in: hands out sequential ids and keeps the last payment
/// status per subscription so sync and demos have something to read back.
#[derive(Default)]
pub(crate) struct SandboxPaymentGateway {
    sequence: AtomicU64,
    statuses: Mutex<HashMap<ExternalSubscriptionId, ProviderPaymentStatus>>,
}

impl SandboxPaymentGateway {
    fn statuses(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ExternalSubscriptionId, ProviderPaymentStatus>>, GatewayError>
    {
        self.statuses
            .lock()
            .map_err(|_| GatewayError::Unavailable("sandbox state poisoned".to_string()))
    }

    /// Records a payment outcome as if the provider had processed it.
    pub(crate) fn settle(
        &self,
        external_id: &ExternalSubscriptionId,
        status: ProviderPaymentStatus,
    ) -> Result<(), GatewayError> {
        let mut statuses = self.statuses()?;
        match statuses.get_mut(external_id) {
            Some(current) => {
                *current = status;
                Ok(())
            }
            None => Err(GatewayError::Rejected(format!(
                "unknown subscription {external_id}"
            ))),
        }
    }
}

impl PaymentGateway for SandboxPaymentGateway {
    fn create_subscription(
        &self,
        request: &CheckoutRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        if request.amount <= Decimal::ZERO {
            return Err(GatewayError::Rejected(
                "amount must be positive".to_string(),
            ));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let external_id = ExternalSubscriptionId(format!("sandbox_sub_{sequence:05}"));
        self.statuses()?
            .insert(external_id.clone(), ProviderPaymentStatus::Pending);
        info!(
            external_id = %external_id,
            plan = %request.plan_code,
            amount = %request.amount,
            "sandbox subscription created"
        );
        Ok(GatewaySubscription {
            checkout_url: Some(format!(
                "https://sandbox.payments.local/checkout/{external_id}"
            )),
            external_id,
        })
    }

    fn cancel_subscription(&self, external_id: &ExternalSubscriptionId) -> Result<(), GatewayError> {
        self.settle(external_id, ProviderPaymentStatus::Deleted)
    }

    fn payment_status(
        &self,
        external_id: &ExternalSubscriptionId,
    ) -> Result<ProviderPaymentStatus, GatewayError> {
        self.statuses()?
            .get(external_id)
            .copied()
            .ok_or_else(|| GatewayError::Rejected(format!("unknown subscription {external_id}")))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_score(raw: &str) -> Result<Decimal, String> {
    let score = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as a decimal score ({err})"))?;
    if score < Decimal::ZERO || score > Decimal::ONE_HUNDRED {
        return Err(format!("score {score} must be between 0 and 100"));
    }
    Ok(score)
}
