use serde::{Deserialize, Serialize};

use super::domain::UserId;

/// Structured allow/deny answer so clients can offer an upgrade path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisAllowance {
    pub allowed: bool,
    pub current_count: usize,
    /// `None` means unlimited.
    pub limit: Option<u32>,
    pub plan_code: String,
}

impl DiagnosisAllowance {
    pub fn unlimited(current_count: usize, plan_code: impl Into<String>) -> Self {
        Self {
            allowed: true,
            current_count,
            limit: None,
            plan_code: plan_code.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("quota lookup failed: {0}")]
pub struct QuotaError(pub String);

/// Seam between diagnosis creation and the plan entitlements that gate it.
pub trait DiagnosisQuota: Send + Sync {
    fn check(&self, user: &UserId) -> Result<DiagnosisAllowance, QuotaError>;
}
