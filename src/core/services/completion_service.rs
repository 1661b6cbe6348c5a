//! Completion cascade: marking a bukid completed completes its pitaks
//! and their active assignments, and generates one pending payment per
//! (pitak, worker, session) with duplicate prevention. The only place
//! payments are auto-generated.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::domain::money::round2;
use crate::domain::{CompletionStatus, Payment, PaymentHistory, PaymentTransactionType};
use crate::errors::CoreResult;
use crate::store::UnitOfWork;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CompletionReport {
    pub updated_pitak_count: usize,
    pub updated_assignment_count: usize,
    pub generated_payments_count: usize,
    pub skipped_payments_count: usize,
}

pub struct CompletionService;

impl CompletionService {
    /// Sets a bukid's status. A non-completed target touches only the
    /// bukid itself; `completed` runs the full cascade. Re-running
    /// against an already-completed bukid is a no-op with zero counts.
    pub fn update_bukid_status(
        uow: &mut UnitOfWork<'_>,
        settings: &Settings,
        bukid_id: Uuid,
        target: CompletionStatus,
        notes: Option<&str>,
    ) -> CoreResult<CompletionReport> {
        uow.bukid(bukid_id)?;
        if target != CompletionStatus::Completed {
            Self::set_bukid(uow, bukid_id, target, notes)?;
            return Ok(CompletionReport::default());
        }

        let session_id = settings.require_default_session()?;
        uow.session(session_id)?;
        let rate_per_luwang = settings.require_rate_per_luwang()?;

        let mut report = CompletionReport::default();
        let open_pitaks: Vec<Uuid> = uow
            .pitak_ids_for_bukid(bukid_id)
            .into_iter()
            .filter(|&id| {
                uow.pitak(id)
                    .map(|pitak| pitak.status != CompletionStatus::Completed)
                    .unwrap_or(false)
            })
            .collect();

        for pitak_id in open_pitaks {
            let (period_start, period_end) = {
                let pitak = uow.pitak_mut(pitak_id)?;
                pitak.status = CompletionStatus::Completed;
                if pitak.end_date.is_none() {
                    pitak.end_date = Some(Utc::now().date_naive());
                }
                pitak.touch();
                (pitak.start_date, pitak.end_date)
            };
            report.updated_pitak_count += 1;

            let active_assignments: Vec<Uuid> = uow
                .assignment_ids_for_pitak(pitak_id)
                .into_iter()
                .filter(|&id| {
                    uow.assignment(id)
                        .map(|assignment| assignment.status == CompletionStatus::Active)
                        .unwrap_or(false)
                })
                .collect();

            for assignment_id in active_assignments {
                let (worker_id, luwang_count) = {
                    let assignment = uow.assignment_mut(assignment_id)?;
                    assignment.status = CompletionStatus::Completed;
                    assignment.touch();
                    (assignment.worker_id, assignment.luwang_count)
                };
                report.updated_assignment_count += 1;

                let gross_pay = round2(luwang_count * rate_per_luwang);
                let mut payment = Payment::new(worker_id, Some(pitak_id), session_id, gross_pay);
                payment.period_start = period_start;
                payment.period_end = period_end;

                let (payment_id, created) = uow.find_or_create_payment(payment)?;
                if created {
                    let mut row = PaymentHistory::new(
                        payment_id,
                        PaymentTransactionType::Create,
                        gross_pay,
                    );
                    row.notes = Some(format!("generated on completion of pitak {pitak_id}"));
                    uow.insert_payment_history(row);
                    report.generated_payments_count += 1;
                } else {
                    tracing::debug!(%pitak_id, %worker_id, "payment already exists, skipping");
                    report.skipped_payments_count += 1;
                }
            }
        }

        Self::set_bukid(uow, bukid_id, CompletionStatus::Completed, notes)?;
        tracing::info!(
            %bukid_id,
            pitaks = report.updated_pitak_count,
            assignments = report.updated_assignment_count,
            generated = report.generated_payments_count,
            skipped = report.skipped_payments_count,
            "bukid completion cascade finished"
        );
        Ok(report)
    }

    fn set_bukid(
        uow: &mut UnitOfWork<'_>,
        bukid_id: Uuid,
        status: CompletionStatus,
        notes: Option<&str>,
    ) -> CoreResult<()> {
        let bukid = uow.bukid_mut(bukid_id)?;
        bukid.status = status;
        if let Some(note) = notes {
            bukid.notes = Some(note.to_string());
        }
        bukid.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Assignment, Bukid, Pitak, Session, Worker};
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    struct Farm {
        store: MemoryStore,
        settings: Settings,
        bukid_id: Uuid,
        pitak_id: Uuid,
        worker_id: Uuid,
    }

    fn farm_with_one_assignment() -> Farm {
        let store = MemoryStore::new();
        let mut uow = store.begin();
        let session_id = uow.insert_session(Session::new("2026 wet season"));
        let worker_id = uow.insert_worker(Worker::new("Fely"));
        let bukid_id = uow.insert_bukid(Bukid::new(session_id, "North field"));
        let pitak_id = uow.insert_pitak(Pitak::new(bukid_id, "N-1"));
        uow.insert_assignment(Assignment::new(worker_id, pitak_id, dec!(10)))
            .unwrap();
        uow.commit();
        let settings = Settings {
            rate_per_luwang: Some(dec!(50)),
            default_interest_rate: dec!(0),
            debt_limit: None,
            default_session: Some(session_id),
        };
        Farm {
            store,
            settings,
            bukid_id,
            pitak_id,
            worker_id,
        }
    }

    #[test]
    fn completing_generates_one_pending_payment() {
        let farm = farm_with_one_assignment();
        let mut uow = farm.store.begin();
        let report = CompletionService::update_bukid_status(
            &mut uow,
            &farm.settings,
            farm.bukid_id,
            CompletionStatus::Completed,
            Some("harvest done"),
        )
        .unwrap();
        assert_eq!(report.updated_pitak_count, 1);
        assert_eq!(report.updated_assignment_count, 1);
        assert_eq!(report.generated_payments_count, 1);
        assert_eq!(report.skipped_payments_count, 0);

        let session_id = farm.settings.default_session.unwrap();
        let payment = uow
            .payment_by_key(farm.pitak_id, farm.worker_id, session_id)
            .expect("payment generated");
        assert_eq!(payment.gross_pay, dec!(500.00));
        assert_eq!(payment.net_pay, dec!(500.00));
        assert_eq!(payment.status, crate::domain::PaymentStatus::Pending);
        assert_eq!(uow.history_for_payment(payment.id).len(), 1);
    }

    #[test]
    fn rerunning_completion_is_a_no_op() {
        let farm = farm_with_one_assignment();
        let mut uow = farm.store.begin();
        CompletionService::update_bukid_status(
            &mut uow,
            &farm.settings,
            farm.bukid_id,
            CompletionStatus::Completed,
            None,
        )
        .unwrap();
        uow.commit();

        let mut uow = farm.store.begin();
        let report = CompletionService::update_bukid_status(
            &mut uow,
            &farm.settings,
            farm.bukid_id,
            CompletionStatus::Completed,
            None,
        )
        .unwrap();
        assert_eq!(report, CompletionReport::default());
    }

    #[test]
    fn pre_existing_payment_is_skipped_not_duplicated() {
        let farm = farm_with_one_assignment();
        let session_id = farm.settings.default_session.unwrap();
        {
            let mut uow = farm.store.begin();
            uow.insert_payment(Payment::new(
                farm.worker_id,
                Some(farm.pitak_id),
                session_id,
                dec!(123),
            ))
            .unwrap();
            uow.commit();
        }

        let mut uow = farm.store.begin();
        let report = CompletionService::update_bukid_status(
            &mut uow,
            &farm.settings,
            farm.bukid_id,
            CompletionStatus::Completed,
            None,
        )
        .unwrap();
        assert_eq!(report.generated_payments_count, 0);
        assert_eq!(report.skipped_payments_count, 1);
        let existing = uow
            .payment_by_key(farm.pitak_id, farm.worker_id, session_id)
            .unwrap();
        assert_eq!(existing.gross_pay, dec!(123));
    }

    #[test]
    fn non_completed_target_touches_only_the_bukid() {
        let farm = farm_with_one_assignment();
        let mut uow = farm.store.begin();
        let report = CompletionService::update_bukid_status(
            &mut uow,
            &farm.settings,
            farm.bukid_id,
            CompletionStatus::Active,
            Some("replanting"),
        )
        .unwrap();
        assert_eq!(report, CompletionReport::default());
        let pitak = uow.pitak(farm.pitak_id).unwrap();
        assert_eq!(pitak.status, CompletionStatus::Active);
    }
}
