use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Assignment, Bukid, Debt, DebtHistory, Payment, PaymentHistory, Pitak, Session, Worker,
};
use crate::errors::{CoreError, CoreResult};

/// Complete entity state held by the store. Serializable so the whole
/// store can be snapshotted to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub workers: BTreeMap<Uuid, Worker>,
    pub sessions: BTreeMap<Uuid, Session>,
    pub bukids: BTreeMap<Uuid, Bukid>,
    pub pitaks: BTreeMap<Uuid, Pitak>,
    pub assignments: BTreeMap<Uuid, Assignment>,
    pub debts: BTreeMap<Uuid, Debt>,
    pub debt_history: BTreeMap<Uuid, DebtHistory>,
    pub payments: BTreeMap<Uuid, Payment>,
    pub payment_history: BTreeMap<Uuid, PaymentHistory>,
}

/// Shared relational-style store. Concurrent callers each open their
/// own [`UnitOfWork`]; commits publish atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Opens a unit of work over a working copy of the current state.
    /// Whoever calls `begin` owns the commit/rollback decision: commit
    /// publishes the copy, dropping it discards every staged write.
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            state: self.lock().clone(),
            store: self,
        }
    }

    /// Clone of the current committed state.
    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    pub fn restore(&self, state: StoreState) {
        *self.lock() = state;
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Transaction-scoped view of the store. All reads and writes of one
/// logical operation go through one unit of work so that a failure
/// partway leaves no partial state behind.
pub struct UnitOfWork<'a> {
    state: StoreState,
    store: &'a MemoryStore,
}

impl UnitOfWork<'_> {
    /// Publishes the staged state. Consumes the unit of work; after
    /// this the changes are visible to subsequently opened units.
    pub fn commit(self) {
        *self.store.lock() = self.state;
    }

    // --- workers ------------------------------------------------------

    pub fn worker(&self, id: Uuid) -> CoreResult<&Worker> {
        self.state
            .workers
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("worker {id}")))
    }

    pub fn worker_mut(&mut self, id: Uuid) -> CoreResult<&mut Worker> {
        self.state
            .workers
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("worker {id}")))
    }

    pub fn insert_worker(&mut self, worker: Worker) -> Uuid {
        let id = worker.id;
        self.state.workers.insert(id, worker);
        id
    }

    // --- sessions -----------------------------------------------------

    pub fn session(&self, id: Uuid) -> CoreResult<&Session> {
        self.state
            .sessions
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("session {id}")))
    }

    pub fn insert_session(&mut self, session: Session) -> Uuid {
        let id = session.id;
        self.state.sessions.insert(id, session);
        id
    }

    // --- debts --------------------------------------------------------

    pub fn debt(&self, id: Uuid) -> CoreResult<&Debt> {
        self.state
            .debts
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("debt {id}")))
    }

    pub fn debt_mut(&mut self, id: Uuid) -> CoreResult<&mut Debt> {
        self.state
            .debts
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("debt {id}")))
    }

    pub fn insert_debt(&mut self, debt: Debt) -> Uuid {
        let id = debt.id;
        self.state.debts.insert(id, debt);
        id
    }

    pub fn debts_for_worker(&self, worker_id: Uuid) -> Vec<&Debt> {
        self.state
            .debts
            .values()
            .filter(|debt| debt.worker_id == worker_id)
            .collect()
    }

    // --- debt history -------------------------------------------------

    pub fn debt_history_row(&self, id: Uuid) -> CoreResult<&DebtHistory> {
        self.state
            .debt_history
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("debt history {id}")))
    }

    pub fn history_for_debt(&self, debt_id: Uuid) -> Vec<&DebtHistory> {
        let mut rows: Vec<&DebtHistory> = self
            .state
            .debt_history
            .values()
            .filter(|row| row.debt_id == debt_id)
            .collect();
        rows.sort_by_key(|row| row.transaction_date);
        rows
    }

    /// True when some history row already reverses the given row.
    pub fn reversal_exists(&self, history_id: Uuid) -> bool {
        self.state
            .debt_history
            .values()
            .any(|row| row.reversal_of == Some(history_id))
    }

    /// Appends an audit row. Enforces reference-number uniqueness and
    /// the one-reversal-per-payment constraint.
    pub fn insert_debt_history(&mut self, row: DebtHistory) -> CoreResult<Uuid> {
        if let Some(reference) = &row.reference_number {
            let taken = self
                .state
                .debt_history
                .values()
                .any(|existing| existing.reference_number.as_deref() == Some(reference.as_str()));
            if taken {
                return Err(CoreError::Constraint(format!(
                    "reference number `{reference}` already recorded"
                )));
            }
        }
        if let Some(reversed) = row.reversal_of {
            if self.reversal_exists(reversed) {
                return Err(CoreError::Constraint(format!(
                    "payment {reversed} has already been reversed"
                )));
            }
        }
        let id = row.id;
        self.state.debt_history.insert(id, row);
        Ok(id)
    }

    // --- bukids / pitaks / assignments --------------------------------

    pub fn bukid(&self, id: Uuid) -> CoreResult<&Bukid> {
        self.state
            .bukids
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("bukid {id}")))
    }

    pub fn bukid_mut(&mut self, id: Uuid) -> CoreResult<&mut Bukid> {
        self.state
            .bukids
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("bukid {id}")))
    }

    pub fn insert_bukid(&mut self, bukid: Bukid) -> Uuid {
        let id = bukid.id;
        self.state.bukids.insert(id, bukid);
        id
    }

    pub fn pitak(&self, id: Uuid) -> CoreResult<&Pitak> {
        self.state
            .pitaks
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("pitak {id}")))
    }

    pub fn pitak_mut(&mut self, id: Uuid) -> CoreResult<&mut Pitak> {
        self.state
            .pitaks
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("pitak {id}")))
    }

    pub fn insert_pitak(&mut self, pitak: Pitak) -> Uuid {
        let id = pitak.id;
        self.state.pitaks.insert(id, pitak);
        id
    }

    pub fn pitak_ids_for_bukid(&self, bukid_id: Uuid) -> Vec<Uuid> {
        self.state
            .pitaks
            .values()
            .filter(|pitak| pitak.bukid_id == bukid_id)
            .map(|pitak| pitak.id)
            .collect()
    }

    pub fn assignment(&self, id: Uuid) -> CoreResult<&Assignment> {
        self.state
            .assignments
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("assignment {id}")))
    }

    pub fn assignment_mut(&mut self, id: Uuid) -> CoreResult<&mut Assignment> {
        self.state
            .assignments
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("assignment {id}")))
    }

    /// Inserts an assignment; (worker, pitak) is unique.
    pub fn insert_assignment(&mut self, assignment: Assignment) -> CoreResult<Uuid> {
        let duplicate = self.state.assignments.values().any(|existing| {
            existing.worker_id == assignment.worker_id && existing.pitak_id == assignment.pitak_id
        });
        if duplicate {
            return Err(CoreError::Constraint(format!(
                "worker {} is already assigned to pitak {}",
                assignment.worker_id, assignment.pitak_id
            )));
        }
        let id = assignment.id;
        self.state.assignments.insert(id, assignment);
        Ok(id)
    }

    pub fn assignment_ids_for_pitak(&self, pitak_id: Uuid) -> Vec<Uuid> {
        self.state
            .assignments
            .values()
            .filter(|assignment| assignment.pitak_id == pitak_id)
            .map(|assignment| assignment.id)
            .collect()
    }

    // --- payments -----------------------------------------------------

    pub fn payment(&self, id: Uuid) -> CoreResult<&Payment> {
        self.state
            .payments
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("payment {id}")))
    }

    /// Looks up a payment by its natural key.
    pub fn payment_by_key(&self, pitak_id: Uuid, worker_id: Uuid, session_id: Uuid) -> Option<&Payment> {
        self.state.payments.values().find(|payment| {
            payment.pitak_id == Some(pitak_id)
                && payment.worker_id == worker_id
                && payment.session_id == session_id
        })
    }

    /// Inserts a payment; (pitak, worker, session) is unique when the
    /// payment is tied to a pitak.
    pub fn insert_payment(&mut self, payment: Payment) -> CoreResult<Uuid> {
        if let Some(pitak_id) = payment.pitak_id {
            if self
                .payment_by_key(pitak_id, payment.worker_id, payment.session_id)
                .is_some()
            {
                return Err(CoreError::Constraint(format!(
                    "payment already exists for pitak {} / worker {} / session {}",
                    pitak_id, payment.worker_id, payment.session_id
                )));
            }
        }
        let id = payment.id;
        self.state.payments.insert(id, payment);
        Ok(id)
    }

    /// Create-if-not-exists keyed by the payment's natural uniqueness.
    /// Returns the canonical payment id and whether this call created
    /// it. A unique-constraint collision from a concurrent writer is
    /// resolved by re-reading the existing row.
    pub fn find_or_create_payment(&mut self, payment: Payment) -> CoreResult<(Uuid, bool)> {
        if let Some(pitak_id) = payment.pitak_id {
            if let Some(existing) = self.payment_by_key(pitak_id, payment.worker_id, payment.session_id)
            {
                return Ok((existing.id, false));
            }
        }
        let pitak_id = payment.pitak_id;
        let worker_id = payment.worker_id;
        let session_id = payment.session_id;
        match self.insert_payment(payment) {
            Ok(id) => Ok((id, true)),
            Err(CoreError::Constraint(message)) => {
                let existing = pitak_id
                    .and_then(|pitak| self.payment_by_key(pitak, worker_id, session_id))
                    .map(|payment| payment.id);
                match existing {
                    Some(id) => Ok((id, false)),
                    None => Err(CoreError::Constraint(message)),
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn insert_payment_history(&mut self, row: PaymentHistory) -> Uuid {
        let id = row.id;
        self.state.payment_history.insert(id, row);
        id
    }

    pub fn history_for_payment(&self, payment_id: Uuid) -> Vec<&PaymentHistory> {
        self.state
            .payment_history
            .values()
            .filter(|row| row.payment_id == payment_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DebtTransactionType, Worker};
    use rust_decimal_macros::dec;

    #[test]
    fn uncommitted_unit_of_work_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut uow = store.begin();
            uow.insert_worker(Worker::new("Ana"));
            // dropped without commit
        }
        assert!(store.snapshot().workers.is_empty());
    }

    #[test]
    fn commit_publishes_staged_writes() {
        let store = MemoryStore::new();
        let mut uow = store.begin();
        let id = uow.insert_worker(Worker::new("Ben"));
        uow.commit();
        assert!(store.snapshot().workers.contains_key(&id));
    }

    #[test]
    fn payment_natural_key_is_unique() {
        let store = MemoryStore::new();
        let mut uow = store.begin();
        let pitak = Uuid::new_v4();
        let worker = Uuid::new_v4();
        let session = Uuid::new_v4();
        uow.insert_payment(Payment::new(worker, Some(pitak), session, dec!(100)))
            .unwrap();
        let err = uow
            .insert_payment(Payment::new(worker, Some(pitak), session, dec!(200)))
            .expect_err("duplicate key must be rejected");
        assert!(matches!(err, CoreError::Constraint(_)));
    }

    #[test]
    fn find_or_create_returns_existing_row() {
        let store = MemoryStore::new();
        let mut uow = store.begin();
        let pitak = Uuid::new_v4();
        let worker = Uuid::new_v4();
        let session = Uuid::new_v4();
        let (first, created) = uow
            .find_or_create_payment(Payment::new(worker, Some(pitak), session, dec!(100)))
            .unwrap();
        assert!(created);
        let (second, created) = uow
            .find_or_create_payment(Payment::new(worker, Some(pitak), session, dec!(100)))
            .unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_reference_number_is_rejected() {
        let store = MemoryStore::new();
        let mut uow = store.begin();
        let debt_id = Uuid::new_v4();
        let mut row = DebtHistory::new(
            debt_id,
            DebtTransactionType::Payment,
            dec!(50),
            dec!(100),
            dec!(50),
        );
        row.reference_number = Some("OR-0001".into());
        uow.insert_debt_history(row).unwrap();

        let mut dup = DebtHistory::new(
            debt_id,
            DebtTransactionType::Payment,
            dec!(25),
            dec!(50),
            dec!(25),
        );
        dup.reference_number = Some("OR-0001".into());
        let err = uow
            .insert_debt_history(dup)
            .expect_err("duplicate reference must be rejected");
        assert!(matches!(err, CoreError::Constraint(_)));
    }
}
