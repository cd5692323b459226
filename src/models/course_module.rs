use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Course content module. The engine only reads these to attach
/// remediation hints to incorrectly answered questions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseModule {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
