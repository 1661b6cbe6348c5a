use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Active,
    Inactive,
}

/// A farm worker. The aggregate root for debt and payment balances:
/// `total_debt`, `total_paid`, and `current_balance` are maintained in
/// the same unit of work as every debt mutation, only ever through
/// `worker_totals::apply_delta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub status: WorkerStatus,
    /// Principal and interest ever incurred across non-cancelled debts.
    pub total_debt: Decimal,
    /// Cumulative amount repaid across all debts.
    pub total_paid: Decimal,
    /// Amount currently owed; reconciles with the sum of non-cancelled
    /// debt balances.
    pub current_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: WorkerStatus::Active,
            total_debt: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Identifiable for Worker {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Worker {
    fn display_label(&self) -> String {
        format!("worker:{} ({})", self.name, self.id)
    }
}
