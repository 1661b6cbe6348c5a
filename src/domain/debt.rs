use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Active,
    PartiallyPaid,
    Paid,
    Settled,
    Cancelled,
    Overdue,
}

impl DebtStatus {
    /// Terminal statuses lock the debt: interest, payments, and updates
    /// are rejected once reached.
    pub fn is_locked(self) -> bool {
        matches!(self, DebtStatus::Paid | DebtStatus::Settled | DebtStatus::Cancelled)
    }
}

/// A debt owed by a worker, scoped to a session.
///
/// `balance` is the authoritative amount still owed. `original_amount`
/// is immutable after creation; adjustments move `amount` (the current
/// principal) only. `total_paid` and `total_interest` are cumulative
/// audit aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub session_id: Uuid,
    pub original_amount: Decimal,
    pub amount: Decimal,
    pub balance: Decimal,
    pub total_interest: Decimal,
    pub total_paid: Decimal,
    pub status: DebtStatus,
    /// Percent per compounding period.
    pub interest_rate: Decimal,
    pub due_date: Option<NaiveDate>,
    pub reason: String,
    /// Append-only log; entries are added with `append_note`.
    pub notes: Option<String>,
    pub payment_term: Option<String>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    pub fn new(
        worker_id: Uuid,
        session_id: Uuid,
        amount: Decimal,
        reason: impl Into<String>,
        interest_rate: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            worker_id,
            session_id,
            original_amount: amount,
            amount,
            balance: amount,
            total_interest: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            status: DebtStatus::Pending,
            interest_rate,
            due_date: None,
            reason: reason.into(),
            notes: None,
            payment_term: None,
            last_payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(note);
            }
            None => self.notes = Some(note.to_string()),
        }
    }

    /// Recomputes the repayment status from the authoritative balance.
    /// Does not produce terminal statuses other than `Paid`.
    pub fn status_for_balance(&self) -> DebtStatus {
        if self.balance <= Decimal::ZERO {
            DebtStatus::Paid
        } else if self.balance < self.amount || self.total_paid > Decimal::ZERO {
            DebtStatus::PartiallyPaid
        } else {
            DebtStatus::Active
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Identifiable for Debt {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Debt {
    fn display_label(&self) -> String {
        format!("debt:{} [{:?}] balance {}", self.id, self.status, self.balance)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebtTransactionType {
    Payment,
    Interest,
    Adjustment,
    Cancellation,
    Refund,
}

/// Append-only audit trail for a debt; one row per mutating operation.
/// Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtHistory {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount_paid: Decimal,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub transaction_type: DebtTransactionType,
    pub payment_method: Option<String>,
    /// Unique across the trail when present.
    pub reference_number: Option<String>,
    /// For `Refund` rows: the payment row this entry reverses. At most
    /// one reversal may exist per payment row.
    pub reversal_of: Option<Uuid>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl DebtHistory {
    pub fn new(
        debt_id: Uuid,
        transaction_type: DebtTransactionType,
        amount_paid: Decimal,
        previous_balance: Decimal,
        new_balance: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            debt_id,
            amount_paid,
            previous_balance,
            new_balance,
            transaction_type,
            payment_method: None,
            reference_number: None,
            reversal_of: None,
            notes: None,
            performed_by: None,
            transaction_date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_debt_starts_pending_with_full_balance() {
        let debt = Debt::new(Uuid::new_v4(), Uuid::new_v4(), dec!(500), "advance", dec!(5));
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(debt.balance, dec!(500));
        assert_eq!(debt.original_amount, dec!(500));
        assert_eq!(debt.amount, dec!(500));
    }

    #[test]
    fn locked_statuses() {
        assert!(DebtStatus::Paid.is_locked());
        assert!(DebtStatus::Settled.is_locked());
        assert!(DebtStatus::Cancelled.is_locked());
        assert!(!DebtStatus::PartiallyPaid.is_locked());
        assert!(!DebtStatus::Overdue.is_locked());
    }

    #[test]
    fn append_note_keeps_previous_entries() {
        let mut debt = Debt::new(Uuid::new_v4(), Uuid::new_v4(), dec!(100), "seed", dec!(0));
        debt.append_note("first");
        debt.append_note("second");
        assert_eq!(debt.notes.as_deref(), Some("first\nsecond"));
    }
}
