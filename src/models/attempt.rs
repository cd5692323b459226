use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";

/// One learner's timed session against an assessment.
///
/// `started_at` is immutable once set; expiry is never stored but derived
/// from it on read. `ended_at` records an explicit end so a completed
/// attempt reports zero time remaining without touching the start time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}
