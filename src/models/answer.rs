use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A learner's selected option for one attempt question. At most one row
/// per (attempt, option); single-correct questions additionally keep at
/// most one row per attempt question.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub attempt_question_id: Uuid,
    pub option_id: Uuid,
    pub created_at: DateTime<Utc>,
}
