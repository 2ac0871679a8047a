use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::domain::{BillingCycle, PlanCode, PlanFeatures, SubscriptionPlan};

/// Static plan catalog keyed by code.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    plans: BTreeMap<PlanCode, SubscriptionPlan>,
}

impl PlanCatalog {
    pub fn new(plans: impl IntoIterator<Item = SubscriptionPlan>) -> Self {
        Self {
            plans: plans
                .into_iter()
                .map(|plan| (plan.code.clone(), plan))
                .collect(),
        }
    }

    pub fn get(&self, code: &PlanCode) -> Option<&SubscriptionPlan> {
        self.plans.get(code)
    }

    /// Plans open for purchase, cheapest first.
    pub fn available(&self) -> Vec<SubscriptionPlan> {
        let mut plans: Vec<SubscriptionPlan> =
            self.plans.values().filter(|plan| plan.active).cloned().collect();
        plans.sort_by(|a, b| a.price.cmp(&b.price));
        plans
    }
}

fn plan(
    code: &str,
    name: &str,
    price: Decimal,
    billing_cycle: BillingCycle,
    consultation_hours: u32,
    max_diagnoses: Option<u32>,
    features: PlanFeatures,
) -> SubscriptionPlan {
    SubscriptionPlan {
        code: PlanCode::new(code),
        name: name.to_string(),
        price,
        billing_cycle,
        consultation_hours: Decimal::from(consultation_hours),
        max_diagnoses,
        features,
        active: true,
    }
}

/// The default free/basic/professional/enterprise line-up.
pub fn standard_plans() -> PlanCatalog {
    let paid = PlanFeatures {
        certification: true,
        report_export: true,
        priority_support: false,
    };
    PlanCatalog::new([
        plan(
            "free",
            "Gratuito",
            Decimal::ZERO,
            BillingCycle::Free,
            0,
            Some(1),
            PlanFeatures::default(),
        ),
        plan(
            "basic",
            "Básico",
            Decimal::new(9990, 2),
            BillingCycle::Monthly,
            2,
            Some(5),
            paid,
        ),
        plan(
            "professional",
            "Profissional",
            Decimal::new(29990, 2),
            BillingCycle::Monthly,
            8,
            Some(20),
            paid,
        ),
        plan(
            "enterprise",
            "Empresarial",
            Decimal::new(99990, 2),
            BillingCycle::Monthly,
            24,
            None,
            PlanFeatures {
                priority_support: true,
                ..paid
            },
        ),
    ])
}
