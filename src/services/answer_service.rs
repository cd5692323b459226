use crate::dto::attempt_dto::QuestionsResponse;
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::attempt_question::AttemptQuestion;
use crate::services::attempt_service::{load_question_views, AttemptService};
use crate::utils::time::{self, time_budget};
use sqlx::PgPool;
use uuid::Uuid;

/// What a toggle request does once resolved against the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    /// Record the selection (and for single-select, sweep the siblings).
    Select,
    /// Multi-select only: clicking a selected option clears it.
    Deselect,
    /// Single-select: re-clicking the chosen option is a no-op, matching
    /// radio-button UX where a set choice cannot be unset.
    Noop,
}

pub fn decide_toggle(is_multi: bool, already_selected: bool) -> ToggleAction {
    match (is_multi, already_selected) {
        (true, true) => ToggleAction::Deselect,
        (_, false) => ToggleAction::Select,
        (false, true) => ToggleAction::Noop,
    }
}

#[derive(Clone)]
pub struct AnswerService {
    pool: PgPool,
}

impl AnswerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies one answer toggle and returns the full ordered question list
    /// with the resulting selections, so the call is idempotent and
    /// side-effect-visible in a single round trip.
    pub async fn set_answer(
        &self,
        attempt_id: Uuid,
        option_id: Uuid,
        user_id: Uuid,
    ) -> Result<QuestionsResponse> {
        let attempt_service = AttemptService::new(self.pool.clone());
        let attempt = attempt_service.get_owned_attempt(attempt_id, user_id).await?;
        if attempt.is_completed() {
            return Err(Error::State(
                "Attempt has already been completed".to_string(),
            ));
        }
        let assessment = attempt_service.get_assessment(attempt.assessment_id).await?;
        let budget = time_budget(time::now(), attempt.started_at, assessment.duration_minutes);
        if !budget.has_time_left() {
            attempt_service
                .finalize_expired(&attempt, assessment.duration_minutes)
                .await?;
            return Err(Error::State("Attempt time has expired".to_string()));
        }

        // Option -> question -> binding. Fails if any link is missing.
        let binding = sqlx::query_as::<_, AttemptQuestion>(
            r#"
            SELECT aq.* FROM attempt_questions aq
            JOIN answer_options ao ON ao.question_id = aq.question_id
            WHERE aq.attempt_id = $1 AND ao.id = $2
            "#,
        )
        .bind(attempt_id)
        .bind(option_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Option is not part of this attempt".to_string()))?;

        // Single vs multi is the authored correct-option count, derived on
        // every call rather than stored, so option edits cannot go stale.
        let correct_count: i64 = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM answer_options WHERE question_id = $1 AND is_correct"#,
        )
        .bind(binding.question_id)
        .fetch_one(&self.pool)
        .await?;

        let existing = sqlx::query_as::<_, Answer>(
            r#"SELECT * FROM answers WHERE attempt_id = $1 AND option_id = $2"#,
        )
        .bind(attempt_id)
        .bind(option_id)
        .fetch_optional(&self.pool)
        .await?;

        let is_multi = correct_count > 1;
        match decide_toggle(is_multi, existing.is_some()) {
            ToggleAction::Deselect => {
                if let Some(answer) = existing {
                    sqlx::query(r#"DELETE FROM answers WHERE id = $1"#)
                        .bind(answer.id)
                        .execute(&self.pool)
                        .await?;
                }
            }
            ToggleAction::Noop => {}
            ToggleAction::Select if is_multi => {
                sqlx::query(
                    r#"
                    INSERT INTO answers (attempt_id, attempt_question_id, option_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (attempt_id, option_id) DO NOTHING
                    "#,
                )
                .bind(attempt_id)
                .bind(binding.id)
                .bind(option_id)
                .execute(&self.pool)
                .await?;
            }
            ToggleAction::Select => {
                // Radio semantics: insert, then sweep siblings so exactly one
                // answer survives. One transaction, so two competing writes
                // cannot both survive.
                let mut tx = self.pool.begin().await?;
                sqlx::query(
                    r#"
                    INSERT INTO answers (attempt_id, attempt_question_id, option_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (attempt_id, option_id) DO NOTHING
                    "#,
                )
                .bind(attempt_id)
                .bind(binding.id)
                .bind(option_id)
                .execute(&mut *tx)
                .await?;
                sqlx::query(
                    r#"DELETE FROM answers WHERE attempt_question_id = $1 AND option_id <> $2"#,
                )
                .bind(binding.id)
                .bind(option_id)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
            }
        }

        let questions = load_question_views(&self.pool, attempt_id).await?;
        Ok(QuestionsResponse { questions })
    }
}
