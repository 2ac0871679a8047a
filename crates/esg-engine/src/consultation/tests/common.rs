use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::assessment::UserId;
use crate::consultation::{ConsultationService, HoursLedger, LedgerError, ScheduleRequest};
use crate::store::memory::InMemoryConsultationRepository;

pub(super) fn user(name: &str) -> UserId {
    UserId(name.to_string())
}

/// Start of the hour, `days` from now.
pub(super) fn in_days(days: i64, hour: u32) -> DateTime<Utc> {
    let date = (Utc::now() + Duration::days(days)).date_naive();
    date.and_hms_opt(hour, 0, 0).expect("valid time").and_utc()
}

pub(super) fn booking(at: DateTime<Utc>, minutes: u32) -> ScheduleRequest {
    ScheduleRequest {
        scheduled_at: at,
        duration_minutes: minutes,
        topic: Some("  Inventário de emissões ".to_string()),
    }
}

/// In-memory balance; `debit` fails once `refuse_debits` is set.
pub(super) struct StubLedger {
    balance: Mutex<Decimal>,
    refuse_debits: bool,
    pub(super) debits: Mutex<Vec<Decimal>>,
}

impl StubLedger {
    pub(super) fn with_hours(hours: i64) -> Self {
        Self {
            balance: Mutex::new(Decimal::from(hours)),
            refuse_debits: false,
            debits: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn refusing(hours: i64) -> Self {
        Self {
            refuse_debits: true,
            ..Self::with_hours(hours)
        }
    }

    pub(super) fn debits(&self) -> Vec<Decimal> {
        self.debits.lock().expect("ledger mutex poisoned").clone()
    }
}

impl HoursLedger for StubLedger {
    fn remaining(&self, _user: &UserId) -> Result<Decimal, LedgerError> {
        Ok(*self.balance.lock().expect("ledger mutex poisoned"))
    }

    fn debit(&self, _user: &UserId, hours: Decimal) -> Result<Decimal, LedgerError> {
        let mut balance = self.balance.lock().expect("ledger mutex poisoned");
        if self.refuse_debits || hours > *balance {
            return Err(LedgerError::Insufficient {
                requested: hours,
                remaining: *balance,
            });
        }
        *balance -= hours;
        self.debits
            .lock()
            .expect("ledger mutex poisoned")
            .push(hours);
        Ok(*balance)
    }
}

pub(super) fn build_service(
    ledger: StubLedger,
) -> (
    ConsultationService<InMemoryConsultationRepository>,
    Arc<StubLedger>,
) {
    let ledger = Arc::new(ledger);
    let service = ConsultationService::new(
        Arc::new(InMemoryConsultationRepository::new()),
        ledger.clone(),
    );
    (service, ledger)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
