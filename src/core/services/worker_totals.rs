//! Worker aggregate synchronizer. Every debt-mutating operation applies
//! its equal-and-opposite delta through [`apply_delta`] in the same unit
//! of work, so `Worker.current_balance` reconciles with the sum of
//! non-cancelled debt balances.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Debt, DebtStatus, Worker};
use crate::errors::CoreResult;
use crate::store::UnitOfWork;

/// Signed deltas to a worker's aggregate fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerDelta {
    pub total_debt: Decimal,
    pub total_paid: Decimal,
    pub current_balance: Decimal,
}

impl WorkerDelta {
    /// New principal (or interest) raises what is owed.
    pub fn debt_incurred(amount: Decimal) -> Self {
        Self {
            total_debt: amount,
            current_balance: amount,
            ..Self::default()
        }
    }

    pub fn payment_received(amount: Decimal) -> Self {
        Self {
            total_paid: amount,
            current_balance: -amount,
            ..Self::default()
        }
    }

    pub fn payment_reversed(amount: Decimal) -> Self {
        Self {
            total_paid: -amount,
            current_balance: amount,
            ..Self::default()
        }
    }

    /// Cancellation retracts the incurred principal and interest and
    /// wipes the outstanding balance.
    pub fn debt_cancelled(incurred: Decimal, outstanding: Decimal) -> Self {
        Self {
            total_debt: -incurred,
            current_balance: -outstanding,
            ..Self::default()
        }
    }

    /// Settlement writes off the outstanding balance without recording
    /// repayment: no money moved.
    pub fn balance_written_off(outstanding: Decimal) -> Self {
        Self {
            current_balance: -outstanding,
            ..Self::default()
        }
    }
}

/// Applies a delta, clamping each aggregate at zero. Clamping signals
/// drift between the worker and its debts, so it is never silent.
pub fn apply_delta(worker: &mut Worker, delta: WorkerDelta) {
    worker.total_debt = clamped(worker.id, "total_debt", worker.total_debt + delta.total_debt);
    worker.total_paid = clamped(worker.id, "total_paid", worker.total_paid + delta.total_paid);
    worker.current_balance = clamped(
        worker.id,
        "current_balance",
        worker.current_balance + delta.current_balance,
    );
    worker.touch();
}

fn clamped(worker_id: Uuid, field: &str, value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        tracing::warn!(%worker_id, field, %value, "worker aggregate clamped to zero");
        Decimal::ZERO
    } else {
        value
    }
}

/// Aggregates derived from a worker's debts.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WorkerAggregates {
    pub total_debt: Decimal,
    pub total_paid: Decimal,
    pub current_balance: Decimal,
}

/// Recomputes aggregates from the debt rows: principal and interest of
/// non-cancelled debts, repayments across all debts, and the sum of
/// non-cancelled balances.
pub fn recompute(debts: &[&Debt]) -> WorkerAggregates {
    let mut totals = WorkerAggregates {
        total_debt: Decimal::ZERO,
        total_paid: Decimal::ZERO,
        current_balance: Decimal::ZERO,
    };
    for debt in debts {
        totals.total_paid += debt.total_paid;
        if debt.status != DebtStatus::Cancelled {
            totals.total_debt += debt.amount + debt.total_interest;
            totals.current_balance += debt.balance;
        }
    }
    totals
}

/// Recomputes a worker's aggregates from its debts and repairs drift.
/// Returns whether anything changed.
pub fn reconcile(uow: &mut UnitOfWork<'_>, worker_id: Uuid) -> CoreResult<bool> {
    let derived = recompute(&uow.debts_for_worker(worker_id));
    let worker = uow.worker_mut(worker_id)?;
    let drifted = worker.total_debt != derived.total_debt
        || worker.total_paid != derived.total_paid
        || worker.current_balance != derived.current_balance;
    if drifted {
        tracing::warn!(
            %worker_id,
            stored_balance = %worker.current_balance,
            derived_balance = %derived.current_balance,
            "worker aggregates drifted; repairing from debt rows"
        );
        worker.total_debt = derived.total_debt;
        worker.total_paid = derived.total_paid;
        worker.current_balance = derived.current_balance;
        worker.touch();
    }
    Ok(drifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Debt;
    use rust_decimal_macros::dec;

    #[test]
    fn apply_delta_clamps_at_zero() {
        let mut worker = Worker::new("Dina");
        worker.total_paid = dec!(10);
        apply_delta(&mut worker, WorkerDelta::payment_reversed(dec!(25)));
        assert_eq!(worker.total_paid, Decimal::ZERO);
        assert_eq!(worker.current_balance, dec!(25));
    }

    #[test]
    fn recompute_skips_cancelled_balances_but_keeps_their_repayments() {
        let worker = Uuid::new_v4();
        let session = Uuid::new_v4();
        let mut active = Debt::new(worker, session, dec!(300), "seed", dec!(0));
        active.total_interest = dec!(30);
        active.balance = dec!(330);

        let mut cancelled = Debt::new(worker, session, dec!(200), "old", dec!(0));
        cancelled.status = DebtStatus::Cancelled;
        cancelled.total_paid = dec!(50);
        cancelled.balance = Decimal::ZERO;

        let totals = recompute(&[&active, &cancelled]);
        assert_eq!(totals.total_debt, dec!(330));
        assert_eq!(totals.total_paid, dec!(50));
        assert_eq!(totals.current_balance, dec!(330));
    }
}
