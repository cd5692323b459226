use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub text: String,
    pub remediation_module_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
