pub mod completion_service;
pub mod debt_service;
pub mod interest;
pub mod worker_totals;

pub use completion_service::{CompletionReport, CompletionService};
pub use debt_service::{
    BulkStatusResult, DebtLimitCheck, DebtService, DebtUpdate, NewDebt,
};
pub use interest::{calculate_interest, CompoundingPeriod, InterestBreakdown};
pub use worker_totals::{WorkerAggregates, WorkerDelta};
