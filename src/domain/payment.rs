use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Cancelled,
}

/// A payroll payment for work performed on a pitak within a session.
///
/// Auto-generated payments are keyed by (pitak, worker, session); the
/// store enforces that key as a unique constraint so a completion
/// cascade can never double-pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub pitak_id: Option<Uuid>,
    pub session_id: Uuid,
    pub gross_pay: Decimal,
    pub manual_deduction: Decimal,
    pub total_debt_deduction: Decimal,
    pub other_deductions: Decimal,
    /// `gross_pay - manual_deduction - total_debt_deduction - other_deductions`.
    pub net_pay: Decimal,
    pub status: PaymentStatus,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A freshly generated payment carries no deductions: net equals gross.
    pub fn new(worker_id: Uuid, pitak_id: Option<Uuid>, session_id: Uuid, gross_pay: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            worker_id,
            pitak_id,
            session_id,
            gross_pay,
            manual_deduction: Decimal::ZERO,
            total_debt_deduction: Decimal::ZERO,
            other_deductions: Decimal::ZERO,
            net_pay: gross_pay,
            status: PaymentStatus::Pending,
            period_start: None,
            period_end: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn recalculate_net(&mut self) {
        self.net_pay =
            self.gross_pay - self.manual_deduction - self.total_debt_deduction - self.other_deductions;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Identifiable for Payment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Payment {
    fn display_label(&self) -> String {
        format!("payment:{} [{:?}] net {}", self.id, self.status, self.net_pay)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTransactionType {
    Create,
    Update,
    StatusChange,
}

/// Append-only audit trail for a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub transaction_type: PaymentTransactionType,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl PaymentHistory {
    pub fn new(payment_id: Uuid, transaction_type: PaymentTransactionType, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id,
            transaction_type,
            amount,
            notes: None,
            performed_by: None,
            transaction_date: Utc::now(),
        }
    }
}
