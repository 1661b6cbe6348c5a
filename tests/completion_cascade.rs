use std::sync::Arc;

use kabisilya_core::api::{CoreApi, ReconcileWorkerRequest, UpdateBukidStatusRequest};
use kabisilya_core::audit::{ActivityRecord, AuditSink, MemorySink};
use kabisilya_core::config::Settings;
use kabisilya_core::core::services::CompletionService;
use kabisilya_core::domain::{
    Assignment, Bukid, CompletionStatus, PaymentStatus, Pitak, Session, Worker,
};
use kabisilya_core::errors::CoreResult;
use kabisilya_core::store::MemoryStore;
use rust_decimal_macros::dec;
use uuid::Uuid;

struct SharedSink(Arc<MemorySink>);

impl AuditSink for SharedSink {
    fn record(&self, record: &ActivityRecord) -> CoreResult<()> {
        self.0.record(record)
    }
}

struct Farm {
    store: MemoryStore,
    settings: Settings,
    session_id: Uuid,
    bukid_id: Uuid,
    pitak_ids: Vec<Uuid>,
    worker_ids: Vec<Uuid>,
}

fn farm(pitak_count: usize, workers_per_pitak: usize) -> Farm {
    let store = MemoryStore::new();
    let mut uow = store.begin();
    let session_id = uow.insert_session(Session::new("2026 wet season"));
    let bukid_id = uow.insert_bukid(Bukid::new(session_id, "Riverside"));
    let mut pitak_ids = Vec::new();
    let mut worker_ids = Vec::new();
    for p in 0..pitak_count {
        let pitak_id = uow.insert_pitak(Pitak::new(bukid_id, format!("R-{}", p + 1)));
        pitak_ids.push(pitak_id);
        for w in 0..workers_per_pitak {
            let worker_id = uow.insert_worker(Worker::new(format!("Worker {p}-{w}")));
            worker_ids.push(worker_id);
            uow.insert_assignment(Assignment::new(worker_id, pitak_id, dec!(10)))
                .unwrap();
        }
    }
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
        session_id,
        bukid_id,
        pitak_ids,
        worker_ids,
    }
}

#[test]
fn single_assignment_generates_one_pending_payment() {
    let farm = farm(1, 1);
    let mut uow = farm.store.begin();
    let report = CompletionService::update_bukid_status(
        &mut uow,
        &farm.settings,
        farm.bukid_id,
        CompletionStatus::Completed,
        None,
    )
    .unwrap();
    uow.commit();

    assert_eq!(report.updated_pitak_count, 1);
    assert_eq!(report.updated_assignment_count, 1);
    assert_eq!(report.generated_payments_count, 1);

    let uow = farm.store.begin();
    let payment = uow
        .payment_by_key(farm.pitak_ids[0], farm.worker_ids[0], farm.session_id)
        .expect("generated payment");
    assert_eq!(payment.gross_pay, dec!(500.00));
    assert_eq!(payment.net_pay, dec!(500.00));
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[test]
fn cascade_covers_every_pitak_and_assignment() {
    let farm = farm(3, 2);
    let mut uow = farm.store.begin();
    let report = CompletionService::update_bukid_status(
        &mut uow,
        &farm.settings,
        farm.bukid_id,
        CompletionStatus::Completed,
        Some("season closed"),
    )
    .unwrap();
    uow.commit();

    assert_eq!(report.updated_pitak_count, 3);
    assert_eq!(report.updated_assignment_count, 6);
    assert_eq!(report.generated_payments_count, 6);
    assert_eq!(report.skipped_payments_count, 0);

    let uow = farm.store.begin();
    for &pitak_id in &farm.pitak_ids {
        assert_eq!(uow.pitak(pitak_id).unwrap().status, CompletionStatus::Completed);
    }
    assert_eq!(uow.bukid(farm.bukid_id).unwrap().status, CompletionStatus::Completed);
}

#[test]
fn rerun_is_idempotent_with_zero_counts() {
    let farm = farm(2, 1);
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
    assert_eq!(report.updated_pitak_count, 0);
    assert_eq!(report.generated_payments_count, 0);
    assert_eq!(report.skipped_payments_count, 0);

    let pitak_count = farm.pitak_ids.len();
    let payments = farm.store.snapshot().payments;
    assert_eq!(payments.len(), pitak_count);
}

#[test]
fn missing_rate_per_luwang_fails_before_any_mutation() {
    let farm = farm(1, 1);
    let mut settings = farm.settings.clone();
    settings.rate_per_luwang = None;

    let mut uow = farm.store.begin();
    let err = CompletionService::update_bukid_status(
        &mut uow,
        &settings,
        farm.bukid_id,
        CompletionStatus::Completed,
        None,
    )
    .expect_err("missing rate must fail");
    assert!(format!("{err}").contains("rate per luwang"));
    drop(uow);

    let uow = farm.store.begin();
    assert_eq!(uow.pitak(farm.pitak_ids[0]).unwrap().status, CompletionStatus::Active);
}

#[test]
fn api_envelope_reports_cascade_counts_and_audits() {
    let farm = farm(1, 1);
    let sink = Arc::new(MemorySink::new());
    let api = CoreApi::new(
        MemoryStore::with_state(farm.store.snapshot()),
        farm.settings.clone(),
        Box::new(SharedSink(Arc::clone(&sink))),
    );

    let response = api.update_bukid_status(UpdateBukidStatusRequest {
        bukid_id: farm.bukid_id,
        status: CompletionStatus::Completed,
        notes: None,
        performed_by: Some("admin".into()),
    });
    assert!(response.status, "unexpected failure: {}", response.message);
    let data = response.data.expect("report payload");
    assert_eq!(data["generated_payments_count"], 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "bukid:status");
    assert_eq!(records[0].user.as_deref(), Some("admin"));
}

#[test]
fn api_surfaces_missing_bukid_as_error_envelope() {
    let farm = farm(1, 1);
    let api = CoreApi::new(
        MemoryStore::with_state(farm.store.snapshot()),
        farm.settings.clone(),
        Box::new(MemorySink::new()),
    );
    let response = api.update_bukid_status(UpdateBukidStatusRequest {
        bukid_id: Uuid::new_v4(),
        status: CompletionStatus::Completed,
        notes: None,
        performed_by: None,
    });
    assert!(!response.status);
    assert!(response.message.contains("bukid"));
    assert!(response.data.is_none());
}

#[test]
fn reconcile_worker_repairs_drifted_aggregates() {
    let farm = farm(1, 1);
    let worker_id = farm.worker_ids[0];
    {
        let mut uow = farm.store.begin();
        let worker = uow.worker_mut(worker_id).unwrap();
        worker.current_balance = dec!(9999);
        worker.total_debt = dec!(9999);
        uow.commit();
    }

    let api = CoreApi::new(
        MemoryStore::with_state(farm.store.snapshot()),
        farm.settings.clone(),
        Box::new(MemorySink::new()),
    );
    let response = api.reconcile_worker(ReconcileWorkerRequest {
        worker_id,
        performed_by: None,
    });
    assert!(response.status);
    assert_eq!(response.data, Some(serde_json::Value::Bool(true)));

    let uow = api.store().begin();
    let worker = uow.worker(worker_id).unwrap();
    assert_eq!(worker.current_balance, rust_decimal::Decimal::ZERO);
    assert_eq!(worker.total_debt, rust_decimal::Decimal::ZERO);
}
