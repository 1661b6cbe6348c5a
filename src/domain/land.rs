use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared status for the bukid → pitak → assignment hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Active,
    Completed,
}

/// A farm plot; the top-level land unit for a session. Completing a
/// bukid is the sole trigger for the payment-generation cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bukid {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub status: CompletionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bukid {
    pub fn new(session_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            name: name.into(),
            status: CompletionStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A sub-plot within a bukid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitak {
    pub id: Uuid,
    pub bukid_id: Uuid,
    pub name: String,
    pub status: CompletionStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_luwang: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pitak {
    pub fn new(bukid_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bukid_id,
            name: name.into(),
            status: CompletionStatus::Active,
            start_date: None,
            end_date: None,
            total_luwang: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A worker's stint on a pitak, measured in luwang. Unique per
/// (worker, pitak); the store enforces the pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub worker_id: Uuid,
    pub pitak_id: Uuid,
    pub luwang_count: Decimal,
    pub status: CompletionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(worker_id: Uuid, pitak_id: Uuid, luwang_count: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            worker_id,
            pitak_id,
            luwang_count,
            status: CompletionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
