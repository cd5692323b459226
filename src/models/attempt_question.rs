use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable binding between an attempt and one selected question.
/// `position` is the draw order at start time and is the presentation
/// order for the life of the attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptQuestion {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub position: i32,
}
