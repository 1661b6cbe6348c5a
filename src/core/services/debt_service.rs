//! Debt lifecycle engine: creation, interest, payments and reversals,
//! adjustments, cancellation, and guarded status transitions. Every
//! mutation writes one audit row and applies the matching worker
//! aggregate delta in the same unit of work.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Settings;
use crate::core::services::worker_totals::{self, WorkerDelta};
use crate::domain::{Debt, DebtHistory, DebtStatus, DebtTransactionType};
use crate::errors::{CoreError, CoreResult};
use crate::store::UnitOfWork;

/// Parameters for creating a debt.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDebt {
    pub worker_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Falls back to the configured default rate when absent.
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    #[serde(default)]
    pub payment_term: Option<String>,
}

/// Optional field changes for `update_debt`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebtUpdate {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    #[serde(default)]
    pub payment_term: Option<String>,
    /// Appended to the debt's note log, never replacing prior entries.
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtLimitCheck {
    pub is_within_limit: bool,
    pub remaining_limit: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkStatusResult {
    pub updated: usize,
    pub failed: Vec<BulkStatusFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkStatusFailure {
    pub debt_id: Uuid,
    pub message: String,
}

/// Validated operations on debts and their audit trail.
pub struct DebtService;

impl DebtService {
    /// Creates a debt against the configured default session with
    /// `balance = amount = original_amount` and `status = pending`.
    pub fn create_debt(
        uow: &mut UnitOfWork<'_>,
        settings: &Settings,
        request: NewDebt,
    ) -> CoreResult<Debt> {
        if request.amount <= Decimal::ZERO {
            return Err(CoreError::Validation("debt amount must be positive".into()));
        }
        let session_id = settings.require_default_session()?;
        uow.session(session_id)?;
        uow.worker(request.worker_id)?;

        let rate = request
            .interest_rate
            .unwrap_or(settings.default_interest_rate);
        let mut debt = Debt::new(request.worker_id, session_id, request.amount, request.reason, rate);
        debt.due_date = request.due_date;
        debt.payment_term = request.payment_term;

        let worker = uow.worker_mut(request.worker_id)?;
        worker_totals::apply_delta(worker, WorkerDelta::debt_incurred(request.amount));
        let id = uow.insert_debt(debt.clone());
        tracing::info!(debt_id = %id, worker_id = %request.worker_id, amount = %request.amount, "debt created");
        Ok(debt)
    }

    /// Adds interest to an open debt and raises the worker's totals by
    /// the same amount.
    pub fn add_interest(
        uow: &mut UnitOfWork<'_>,
        debt_id: Uuid,
        interest_amount: Decimal,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        if interest_amount <= Decimal::ZERO {
            return Err(CoreError::Validation("interest amount must be positive".into()));
        }
        let (worker_id, previous_balance, status) = {
            let debt = uow.debt(debt_id)?;
            (debt.worker_id, debt.balance, debt.status)
        };
        Self::ensure_unlocked(debt_id, status)?;

        let new_balance = previous_balance + interest_amount;
        {
            let debt = uow.debt_mut(debt_id)?;
            debt.balance = new_balance;
            debt.total_interest += interest_amount;
            debt.touch();
        }
        let mut row = DebtHistory::new(
            debt_id,
            DebtTransactionType::Interest,
            interest_amount,
            previous_balance,
            new_balance,
        );
        row.performed_by = performed_by.map(str::to_string);
        uow.insert_debt_history(row)?;

        let worker = uow.worker_mut(worker_id)?;
        worker_totals::apply_delta(worker, WorkerDelta::debt_incurred(interest_amount));
        Ok(uow.debt(debt_id)?.clone())
    }

    /// Applies a repayment. The status becomes `paid` when the balance
    /// reaches zero, `partially_paid` while under the principal, and
    /// stays `active` otherwise.
    pub fn make_payment(
        uow: &mut UnitOfWork<'_>,
        debt_id: Uuid,
        amount: Decimal,
        payment_method: &str,
        reference_number: &str,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation("payment amount must be positive".into()));
        }
        if payment_method.trim().is_empty() {
            return Err(CoreError::Validation("payment method is required".into()));
        }
        if reference_number.trim().is_empty() {
            return Err(CoreError::Validation("reference number is required".into()));
        }
        let (worker_id, previous_balance, principal, status) = {
            let debt = uow.debt(debt_id)?;
            (debt.worker_id, debt.balance, debt.amount, debt.status)
        };
        Self::ensure_unlocked(debt_id, status)?;
        if amount > previous_balance {
            return Err(CoreError::StateConflict(format!(
                "payment of {amount} exceeds outstanding balance {previous_balance}"
            )));
        }

        let new_balance = previous_balance - amount;
        let new_status = if new_balance <= Decimal::ZERO {
            DebtStatus::Paid
        } else if new_balance < principal {
            DebtStatus::PartiallyPaid
        } else {
            DebtStatus::Active
        };
        {
            let debt = uow.debt_mut(debt_id)?;
            debt.balance = new_balance;
            debt.total_paid += amount;
            debt.status = new_status;
            debt.last_payment_date = Some(Utc::now());
            debt.touch();
        }
        let mut row = DebtHistory::new(
            debt_id,
            DebtTransactionType::Payment,
            amount,
            previous_balance,
            new_balance,
        );
        row.payment_method = Some(payment_method.trim().to_string());
        row.reference_number = Some(reference_number.trim().to_string());
        row.performed_by = performed_by.map(str::to_string);
        uow.insert_debt_history(row)?;

        let worker = uow.worker_mut(worker_id)?;
        worker_totals::apply_delta(worker, WorkerDelta::payment_received(amount));
        tracing::info!(%debt_id, %amount, balance = %new_balance, "payment applied");
        Ok(uow.debt(debt_id)?.clone())
    }

    /// Undoes a recorded payment. Valid only against a `payment` history
    /// row that has not been reversed yet, on a debt that is neither
    /// settled nor cancelled.
    pub fn reverse_payment(
        uow: &mut UnitOfWork<'_>,
        history_id: Uuid,
        reason: &str,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        let source = uow.debt_history_row(history_id)?.clone();
        if source.transaction_type != DebtTransactionType::Payment {
            return Err(CoreError::Validation(
                "only payment entries can be reversed".into(),
            ));
        }
        let (worker_id, previous_balance, principal, total_paid, status) = {
            let debt = uow.debt(source.debt_id)?;
            (
                debt.worker_id,
                debt.balance,
                debt.amount,
                debt.total_paid,
                debt.status,
            )
        };
        if matches!(status, DebtStatus::Settled | DebtStatus::Cancelled) {
            return Err(CoreError::StateConflict(format!(
                "debt {} is {:?}; its payments can no longer be reversed",
                source.debt_id, status
            )));
        }
        if uow.reversal_exists(history_id) {
            return Err(CoreError::StateConflict(format!(
                "payment {history_id} has already been reversed"
            )));
        }

        let amount = source.amount_paid;
        let new_balance = previous_balance + amount;
        let new_status = if new_balance >= principal {
            DebtStatus::Pending
        } else {
            DebtStatus::PartiallyPaid
        };
        {
            let debt = uow.debt_mut(source.debt_id)?;
            debt.balance = new_balance;
            debt.total_paid = (total_paid - amount).max(Decimal::ZERO);
            debt.status = new_status;
            debt.append_note(&format!("Payment reversed: {reason}"));
            debt.touch();
        }
        let mut row = DebtHistory::new(
            source.debt_id,
            DebtTransactionType::Refund,
            amount,
            previous_balance,
            new_balance,
        );
        row.reversal_of = Some(history_id);
        row.notes = Some(reason.to_string());
        row.performed_by = performed_by.map(str::to_string);
        uow.insert_debt_history(row)?;

        let worker = uow.worker_mut(worker_id)?;
        worker_totals::apply_delta(worker, WorkerDelta::payment_reversed(amount));
        tracing::info!(debt_id = %source.debt_id, %amount, "payment reversed");
        Ok(uow.debt(source.debt_id)?.clone())
    }

    /// Shifts the balance by a signed amount. Positive adjustments grow
    /// the current principal; negative adjustments count as repayment.
    /// `original_amount` never changes.
    pub fn adjust_debt(
        uow: &mut UnitOfWork<'_>,
        debt_id: Uuid,
        amount: Decimal,
        reason: &str,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        if amount == Decimal::ZERO {
            return Err(CoreError::Validation("adjustment amount must be non-zero".into()));
        }
        let (worker_id, previous_balance, status) = {
            let debt = uow.debt(debt_id)?;
            (debt.worker_id, debt.balance, debt.status)
        };
        Self::ensure_unlocked(debt_id, status)?;
        let new_balance = previous_balance + amount;
        if new_balance < Decimal::ZERO {
            return Err(CoreError::StateConflict(format!(
                "adjustment of {amount} would drive balance {previous_balance} negative"
            )));
        }

        {
            let debt = uow.debt_mut(debt_id)?;
            if amount > Decimal::ZERO {
                debt.amount += amount;
            } else {
                debt.total_paid += -amount;
            }
            debt.balance = new_balance;
            debt.status = debt.status_for_balance();
            debt.touch();
        }
        let mut row = DebtHistory::new(
            debt_id,
            DebtTransactionType::Adjustment,
            amount,
            previous_balance,
            new_balance,
        );
        row.notes = Some(reason.to_string());
        row.performed_by = performed_by.map(str::to_string);
        uow.insert_debt_history(row)?;

        let delta = if amount > Decimal::ZERO {
            WorkerDelta::debt_incurred(amount)
        } else {
            WorkerDelta::payment_received(-amount)
        };
        let worker = uow.worker_mut(worker_id)?;
        worker_totals::apply_delta(worker, delta);
        Ok(uow.debt(debt_id)?.clone())
    }

    /// Edits debt fields. An `amount` change adjusts balance and worker
    /// totals by the difference and logs an adjustment row.
    pub fn update_debt(
        uow: &mut UnitOfWork<'_>,
        debt_id: Uuid,
        changes: DebtUpdate,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        let (worker_id, previous_balance, current_amount, status) = {
            let debt = uow.debt(debt_id)?;
            (debt.worker_id, debt.balance, debt.amount, debt.status)
        };
        Self::ensure_unlocked(debt_id, status)?;

        if let Some(new_amount) = changes.amount {
            if new_amount <= Decimal::ZERO {
                return Err(CoreError::Validation("debt amount must be positive".into()));
            }
            let difference = new_amount - current_amount;
            if difference != Decimal::ZERO {
                let new_balance = previous_balance + difference;
                if new_balance < Decimal::ZERO {
                    return Err(CoreError::StateConflict(format!(
                        "amount change of {difference} would drive balance {previous_balance} negative"
                    )));
                }
                {
                    let debt = uow.debt_mut(debt_id)?;
                    debt.amount = new_amount;
                    debt.balance = new_balance;
                    debt.status = debt.status_for_balance();
                }
                let mut row = DebtHistory::new(
                    debt_id,
                    DebtTransactionType::Adjustment,
                    difference,
                    previous_balance,
                    new_balance,
                );
                row.notes = Some(format!("amount updated from {current_amount} to {new_amount}"));
                row.performed_by = performed_by.map(str::to_string);
                uow.insert_debt_history(row)?;

                let worker = uow.worker_mut(worker_id)?;
                worker_totals::apply_delta(
                    worker,
                    WorkerDelta {
                        total_debt: difference,
                        current_balance: difference,
                        ..WorkerDelta::default()
                    },
                );
            }
        }

        let debt = uow.debt_mut(debt_id)?;
        if let Some(reason) = changes.reason {
            debt.reason = reason;
        }
        if let Some(due_date) = changes.due_date {
            debt.due_date = Some(due_date);
        }
        if let Some(rate) = changes.interest_rate {
            debt.interest_rate = rate;
        }
        if let Some(term) = changes.payment_term {
            debt.payment_term = Some(term);
        }
        if let Some(note) = changes.note {
            debt.append_note(&note);
        }
        debt.touch();
        Ok(uow.debt(debt_id)?.clone())
    }

    /// Soft-cancels a debt: zeroes the balance, retracts the worker's
    /// incurred totals, and keeps the row for audit. Never a hard delete.
    pub fn cancel_debt(
        uow: &mut UnitOfWork<'_>,
        debt_id: Uuid,
        reason: &str,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        let (worker_id, previous_balance, incurred, status) = {
            let debt = uow.debt(debt_id)?;
            (
                debt.worker_id,
                debt.balance,
                debt.amount + debt.total_interest,
                debt.status,
            )
        };
        if status == DebtStatus::Cancelled {
            return Err(CoreError::StateConflict(format!(
                "debt {debt_id} is already cancelled"
            )));
        }

        {
            let debt = uow.debt_mut(debt_id)?;
            debt.balance = Decimal::ZERO;
            debt.status = DebtStatus::Cancelled;
            debt.append_note(&format!("Cancelled: {reason}"));
            debt.touch();
        }
        let mut row = DebtHistory::new(
            debt_id,
            DebtTransactionType::Cancellation,
            Decimal::ZERO,
            previous_balance,
            Decimal::ZERO,
        );
        row.notes = Some(reason.to_string());
        row.performed_by = performed_by.map(str::to_string);
        uow.insert_debt_history(row)?;

        let worker = uow.worker_mut(worker_id)?;
        worker_totals::apply_delta(worker, WorkerDelta::debt_cancelled(incurred, previous_balance));
        tracing::info!(%debt_id, "debt cancelled");
        Ok(uow.debt(debt_id)?.clone())
    }

    /// Sets the status directly, with guardrails: leaving `settled`
    /// requires `force_override`, and settling writes off the balance
    /// with a payment-typed audit row.
    pub fn update_status(
        uow: &mut UnitOfWork<'_>,
        debt_id: Uuid,
        new_status: DebtStatus,
        notes: Option<&str>,
        force_override: bool,
        performed_by: Option<&str>,
    ) -> CoreResult<Debt> {
        let (worker_id, previous_balance, status) = {
            let debt = uow.debt(debt_id)?;
            (debt.worker_id, debt.balance, debt.status)
        };
        if status == DebtStatus::Settled && new_status != DebtStatus::Settled && !force_override {
            return Err(CoreError::StateConflict(format!(
                "debt {debt_id} is settled; changing its status requires force override"
            )));
        }

        if new_status == DebtStatus::Settled {
            {
                let debt = uow.debt_mut(debt_id)?;
                debt.balance = Decimal::ZERO;
                debt.status = DebtStatus::Settled;
                if let Some(note) = notes {
                    debt.append_note(note);
                }
                debt.touch();
            }
            let mut row = DebtHistory::new(
                debt_id,
                DebtTransactionType::Payment,
                previous_balance,
                previous_balance,
                Decimal::ZERO,
            );
            row.notes = Some("balance written off on settlement".into());
            row.performed_by = performed_by.map(str::to_string);
            uow.insert_debt_history(row)?;

            if previous_balance > Decimal::ZERO {
                let worker = uow.worker_mut(worker_id)?;
                worker_totals::apply_delta(worker, WorkerDelta::balance_written_off(previous_balance));
            }
        } else {
            let debt = uow.debt_mut(debt_id)?;
            debt.status = new_status;
            if let Some(note) = notes {
                debt.append_note(note);
            }
            debt.touch();
        }
        Ok(uow.debt(debt_id)?.clone())
    }

    /// Applies `update_status` across many debts, collecting per-debt
    /// failures instead of aborting the batch. The caller's unit of
    /// work still commits or discards the surviving updates as one.
    pub fn bulk_update_status(
        uow: &mut UnitOfWork<'_>,
        debt_ids: &[Uuid],
        new_status: DebtStatus,
        force_override: bool,
        performed_by: Option<&str>,
    ) -> BulkStatusResult {
        let mut result = BulkStatusResult::default();
        for &debt_id in debt_ids {
            match Self::update_status(uow, debt_id, new_status, None, force_override, performed_by) {
                Ok(_) => result.updated += 1,
                Err(err) => result.failed.push(BulkStatusFailure {
                    debt_id,
                    message: err.to_string(),
                }),
            }
        }
        result
    }

    /// Pure read: would a further debt keep the worker under the
    /// configured limit, and how much room is left?
    pub fn check_debt_limit(
        uow: &UnitOfWork<'_>,
        settings: &Settings,
        worker_id: Uuid,
        new_debt_amount: Decimal,
    ) -> CoreResult<DebtLimitCheck> {
        if new_debt_amount <= Decimal::ZERO {
            return Err(CoreError::Validation("debt amount must be positive".into()));
        }
        let limit = settings.require_debt_limit()?;
        let worker = uow.worker(worker_id)?;
        Ok(DebtLimitCheck {
            is_within_limit: worker.current_balance + new_debt_amount <= limit,
            remaining_limit: (limit - worker.current_balance).max(Decimal::ZERO),
        })
    }

    pub fn get_debt(uow: &UnitOfWork<'_>, debt_id: Uuid) -> CoreResult<Debt> {
        Ok(uow.debt(debt_id)?.clone())
    }

    pub fn debts_for_worker(uow: &UnitOfWork<'_>, worker_id: Uuid) -> CoreResult<Vec<Debt>> {
        uow.worker(worker_id)?;
        Ok(uow
            .debts_for_worker(worker_id)
            .into_iter()
            .cloned()
            .collect())
    }

    fn ensure_unlocked(debt_id: Uuid, status: DebtStatus) -> CoreResult<()> {
        if status.is_locked() {
            Err(CoreError::StateConflict(format!(
                "debt {debt_id} is {status:?} and locked against further changes"
            )))
        } else {
            Ok(())
        }
    }
}
