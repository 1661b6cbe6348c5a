//! Request/response surface consumed by the host application's IPC
//! layer. Each operation deserializes a parameter object, opens its own
//! unit of work, commits on success, and answers with an [`ApiResponse`]
//! envelope. Errors roll the unit of work back by dropping it.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, ActivityRecord, AuditSink};
use crate::config::Settings;
use crate::core::services::{
    calculate_interest, worker_totals, CompletionService, CompoundingPeriod, DebtService,
    DebtUpdate, NewDebt,
};
use crate::domain::{CompletionStatus, DebtStatus};
use crate::response::ApiResponse;
use crate::store::MemoryStore;

#[derive(Debug, Deserialize)]
pub struct CreateDebtRequest {
    #[serde(flatten)]
    pub debt: NewDebt,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddInterestRequest {
    pub debt_id: Uuid,
    pub interest_amount: Decimal,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MakePaymentRequest {
    pub debt_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub reference_number: String,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReversePaymentRequest {
    pub history_id: Uuid,
    pub reason: String,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustDebtRequest {
    pub debt_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDebtRequest {
    pub debt_id: Uuid,
    #[serde(flatten)]
    pub changes: DebtUpdate,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelDebtRequest {
    pub debt_id: Uuid,
    pub reason: String,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDebtStatusRequest {
    pub debt_id: Uuid,
    pub status: DebtStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub force_override: bool,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDebtStatusRequest {
    pub debt_ids: Vec<Uuid>,
    pub status: DebtStatus,
    #[serde(default)]
    pub force_override: bool,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DebtLimitRequest {
    pub worker_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CalculateInterestRequest {
    pub principal: Decimal,
    /// Falls back to the configured default rate when absent.
    #[serde(default)]
    pub rate: Option<Decimal>,
    pub days: i64,
    pub period: CompoundingPeriod,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBukidStatusRequest {
    pub bukid_id: Uuid,
    pub status: CompletionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileWorkerRequest {
    pub worker_id: Uuid,
    #[serde(default)]
    pub performed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkerDebtsRequest {
    pub worker_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GetDebtRequest {
    pub debt_id: Uuid,
}

/// Facade owning the store, settings, and audit sink on behalf of the
/// host process.
pub struct CoreApi {
    store: MemoryStore,
    settings: Settings,
    audit: Box<dyn AuditSink>,
}

impl CoreApi {
    pub fn new(store: MemoryStore, settings: Settings, audit: Box<dyn AuditSink>) -> Self {
        Self {
            store,
            settings,
            audit,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn create_debt(&self, request: CreateDebtRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::create_debt(&mut uow, &self.settings, request.debt) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:create",
                    format!("created debt {} of {} for worker {}", debt.id, debt.amount, debt.worker_id),
                );
                ApiResponse::from_value("Debt created", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn add_interest(&self, request: AddInterestRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::add_interest(
            &mut uow,
            request.debt_id,
            request.interest_amount,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:interest",
                    format!("added interest {} to debt {}", request.interest_amount, request.debt_id),
                );
                ApiResponse::from_value("Interest applied", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn make_payment(&self, request: MakePaymentRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::make_payment(
            &mut uow,
            request.debt_id,
            request.amount,
            &request.payment_method,
            &request.reference_number,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:payment",
                    format!("payment of {} applied to debt {}", request.amount, request.debt_id),
                );
                ApiResponse::from_value("Payment recorded", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn reverse_payment(&self, request: ReversePaymentRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::reverse_payment(
            &mut uow,
            request.history_id,
            &request.reason,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:reverse_payment",
                    format!("reversed payment {} on debt {}", request.history_id, debt.id),
                );
                ApiResponse::from_value("Payment reversed", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn adjust_debt(&self, request: AdjustDebtRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::adjust_debt(
            &mut uow,
            request.debt_id,
            request.amount,
            &request.reason,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:adjust",
                    format!("adjusted debt {} by {}", request.debt_id, request.amount),
                );
                ApiResponse::from_value("Debt adjusted", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn update_debt(&self, request: UpdateDebtRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::update_debt(
            &mut uow,
            request.debt_id,
            request.changes,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:update",
                    format!("updated debt {}", request.debt_id),
                );
                ApiResponse::from_value("Debt updated", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn cancel_debt(&self, request: CancelDebtRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::cancel_debt(
            &mut uow,
            request.debt_id,
            &request.reason,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:cancel",
                    format!("cancelled debt {}", request.debt_id),
                );
                ApiResponse::from_value("Debt cancelled", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn update_debt_status(&self, request: UpdateDebtStatusRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match DebtService::update_status(
            &mut uow,
            request.debt_id,
            request.status,
            request.notes.as_deref(),
            request.force_override,
            request.performed_by.as_deref(),
        ) {
            Ok(debt) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "debt:status",
                    format!("set debt {} status to {:?}", request.debt_id, request.status),
                );
                ApiResponse::from_value("Debt status updated", &debt)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn bulk_update_debt_status(&self, request: BulkDebtStatusRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        let result = DebtService::bulk_update_status(
            &mut uow,
            &request.debt_ids,
            request.status,
            request.force_override,
            request.performed_by.as_deref(),
        );
        uow.commit();
        self.record(
            request.performed_by,
            "debt:bulk_status",
            format!(
                "set {} of {} debts to {:?}",
                result.updated,
                request.debt_ids.len(),
                request.status
            ),
        );
        ApiResponse::from_value("Bulk status update finished", &result)
    }

    pub fn check_debt_limit(&self, request: DebtLimitRequest) -> ApiResponse {
        let uow = self.store.begin();
        match DebtService::check_debt_limit(&uow, &self.settings, request.worker_id, request.amount) {
            Ok(check) => ApiResponse::from_value("Debt limit checked", &check),
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn calculate_interest(&self, request: CalculateInterestRequest) -> ApiResponse {
        let rate = request.rate.unwrap_or(self.settings.default_interest_rate);
        match calculate_interest(request.principal, rate, request.days, request.period) {
            Ok(breakdown) => ApiResponse::from_value("Interest calculated", &breakdown),
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn update_bukid_status(&self, request: UpdateBukidStatusRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match CompletionService::update_bukid_status(
            &mut uow,
            &self.settings,
            request.bukid_id,
            request.status,
            request.notes.as_deref(),
        ) {
            Ok(report) => {
                uow.commit();
                self.record(
                    request.performed_by,
                    "bukid:status",
                    format!(
                        "set bukid {} to {:?}; generated {} payment(s), skipped {}",
                        request.bukid_id,
                        request.status,
                        report.generated_payments_count,
                        report.skipped_payments_count
                    ),
                );
                ApiResponse::from_value("Bukid status updated", &report)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn reconcile_worker(&self, request: ReconcileWorkerRequest) -> ApiResponse {
        let mut uow = self.store.begin();
        match worker_totals::reconcile(&mut uow, request.worker_id) {
            Ok(changed) => {
                uow.commit();
                if changed {
                    self.record(
                        request.performed_by,
                        "worker:reconcile",
                        format!("repaired aggregates for worker {}", request.worker_id),
                    );
                }
                ApiResponse::from_value("Worker aggregates reconciled", &changed)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn worker_debts(&self, request: WorkerDebtsRequest) -> ApiResponse {
        let uow = self.store.begin();
        match DebtService::debts_for_worker(&uow, request.worker_id) {
            Ok(debts) => ApiResponse::from_value("Worker debts listed", &debts),
            Err(err) => ApiResponse::error(&err),
        }
    }

    pub fn get_debt(&self, request: GetDebtRequest) -> ApiResponse {
        let uow = self.store.begin();
        match DebtService::get_debt(&uow, request.debt_id) {
            Ok(debt) => ApiResponse::from_value("Debt fetched", &debt),
            Err(err) => ApiResponse::error(&err),
        }
    }

    fn record(&self, user: Option<String>, action: &str, description: String) {
        let mut record = ActivityRecord::new(action, description);
        if let Some(user) = user {
            record = record.with_user(user);
        }
        audit::publish(self.audit.as_ref(), record);
    }
}
