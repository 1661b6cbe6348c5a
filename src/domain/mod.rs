pub mod common;
pub mod debt;
pub mod land;
pub mod money;
pub mod payment;
pub mod session;
pub mod worker;

pub use debt::{Debt, DebtHistory, DebtStatus, DebtTransactionType};
pub use land::{Assignment, Bukid, CompletionStatus, Pitak};
pub use payment::{Payment, PaymentHistory, PaymentStatus, PaymentTransactionType};
pub use session::Session;
pub use worker::{Worker, WorkerStatus};
