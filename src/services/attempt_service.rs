use crate::dto::attempt_dto::{
    AttemptOptionView, AttemptQuestionView, AttemptStateResponse, CheckAttemptResponse,
    EndAttemptResponse,
};
use crate::error::{Error, Result};
use crate::models::assessment::Assessment;
use crate::models::attempt::{Attempt, STATUS_COMPLETED, STATUS_IN_PROGRESS};
use crate::services::scoring_service::ScoringService;
use crate::services::selector_service::SelectorService;
use crate::utils::time::{self, time_budget};
use chrono::Duration;
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reports whether a prior attempt exists for this learner and whether it
    /// still has time on the clock. Pure function of the stored start time and
    /// the current wall clock; expiry is never tracked by a timer.
    pub async fn check(&self, assessment_id: Uuid, user_id: Uuid) -> Result<CheckAttemptResponse> {
        let assessment = self.get_assessment(assessment_id).await?;

        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM attempts
            WHERE assessment_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(assessment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(attempt) = attempt else {
            return Ok(CheckAttemptResponse {
                exists: false,
                has_time_left: false,
                time_used: None,
                time_remaining: None,
                attempt_id: None,
                duration: assessment.duration_minutes,
                score: None,
            });
        };

        if attempt.is_completed() {
            // Time used up to the recorded end; a completed attempt never has
            // time left regardless of the clock.
            let ended = attempt.ended_at.unwrap_or_else(time::now);
            let budget = time_budget(ended, attempt.started_at, assessment.duration_minutes);
            let score = ScoringService::new(self.pool.clone())
                .score(attempt.id)
                .await?;
            return Ok(CheckAttemptResponse {
                exists: true,
                has_time_left: false,
                time_used: Some(budget.time_used),
                time_remaining: Some(0),
                attempt_id: Some(attempt.id),
                duration: assessment.duration_minutes,
                score: Some(score),
            });
        }

        let budget = time_budget(time::now(), attempt.started_at, assessment.duration_minutes);
        if !budget.has_time_left() {
            // First to notice the expiry finalizes the row
            self.finalize_expired(&attempt, assessment.duration_minutes)
                .await?;
            let score = ScoringService::new(self.pool.clone())
                .score(attempt.id)
                .await?;
            return Ok(CheckAttemptResponse {
                exists: true,
                has_time_left: false,
                time_used: Some(budget.time_used),
                time_remaining: Some(0),
                attempt_id: Some(attempt.id),
                duration: assessment.duration_minutes,
                score: Some(score),
            });
        }

        Ok(CheckAttemptResponse {
            exists: true,
            has_time_left: true,
            time_used: Some(budget.time_used),
            time_remaining: Some(budget.time_remaining),
            attempt_id: Some(attempt.id),
            duration: assessment.duration_minutes,
            score: None,
        })
    }

    /// Starts a fresh attempt: draws the questions, then persists the attempt
    /// and its ordered question bindings in one transaction. The binding set
    /// is immutable for the life of the attempt.
    pub async fn start(&self, assessment_id: Uuid, user_id: Uuid) -> Result<AttemptStateResponse> {
        let assessment = self.get_assessment(assessment_id).await?;

        if let Some(existing) = self.find_in_progress(assessment_id, user_id).await? {
            let budget = time_budget(time::now(), existing.started_at, assessment.duration_minutes);
            if budget.has_time_left() {
                return Err(Error::State(
                    "An attempt is already in progress for this assessment".to_string(),
                ));
            }
            // Expired attempts are finalized lazily, here on the next start.
            self.finalize_expired(&existing, assessment.duration_minutes)
                .await?;
        }

        let drawn = SelectorService::new(self.pool.clone())
            .select_questions(assessment_id)
            .await?;
        if drawn.is_empty() {
            return Err(Error::State(
                "Assessment has no eligible questions".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let attempt = match sqlx::query_as::<_, Attempt>(
            r#"
            INSERT INTO attempts (assessment_id, user_id, status, started_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(assessment_id)
        .bind(user_id)
        .bind(STATUS_IN_PROGRESS)
        .bind(time::now())
        .fetch_one(&mut *tx)
        .await
        {
            Ok(attempt) => attempt,
            // Two concurrent starts can both pass the in-progress lookup;
            // the partial unique index decides the loser here.
            Err(err) if is_unique_violation(&err) => {
                return Err(Error::State(
                    "An attempt is already in progress for this assessment".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        for (index, item) in drawn.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO attempt_questions (attempt_id, question_id, position) VALUES ($1, $2, $3)"#,
            )
            .bind(attempt.id)
            .bind(item.question.id)
            .bind(index as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt.id,
            assessment_id = %assessment_id,
            questions = drawn.len(),
            "attempt started"
        );

        let questions = load_question_views(&self.pool, attempt.id).await?;
        Ok(AttemptStateResponse {
            attempt_id: attempt.id,
            duration: assessment.duration_minutes,
            questions,
        })
    }

    /// Replays the stored draw order with the learner's current selections.
    /// Never re-randomizes: the view is identical to where the learner left
    /// off, no matter how many answers were recorded in between.
    pub async fn resume(&self, attempt_id: Uuid, user_id: Uuid) -> Result<AttemptStateResponse> {
        let attempt = self.get_owned_attempt(attempt_id, user_id).await?;
        let assessment = self.get_assessment(attempt.assessment_id).await?;

        if attempt.is_completed() {
            return Err(Error::State(
                "Attempt has already been completed".to_string(),
            ));
        }

        let budget = time_budget(time::now(), attempt.started_at, assessment.duration_minutes);
        if !budget.has_time_left() {
            self.finalize_expired(&attempt, assessment.duration_minutes)
                .await?;
            return Err(Error::State("Attempt time has expired".to_string()));
        }

        let questions = load_question_views(&self.pool, attempt.id).await?;
        if questions.is_empty() {
            return Err(Error::State("Attempt has no questions".to_string()));
        }

        Ok(AttemptStateResponse {
            attempt_id: attempt.id,
            duration: assessment.duration_minutes,
            questions,
        })
    }

    /// Ends the attempt and returns its score. Ending an already-completed
    /// attempt just returns the score again.
    pub async fn end(&self, attempt_id: Uuid, user_id: Uuid) -> Result<EndAttemptResponse> {
        let attempt = self.get_owned_attempt(attempt_id, user_id).await?;
        let assessment = self.get_assessment(attempt.assessment_id).await?;

        if !attempt.is_completed() {
            sqlx::query(
                r#"UPDATE attempts SET status = $1, ended_at = $2 WHERE id = $3 AND status = $4"#,
            )
            .bind(STATUS_COMPLETED)
            .bind(time::now())
            .bind(attempt.id)
            .bind(STATUS_IN_PROGRESS)
            .execute(&self.pool)
            .await?;
        }

        let score = ScoringService::new(self.pool.clone()).score(attempt.id).await?;
        tracing::info!(
            attempt_id = %attempt.id,
            score = score.score_percent,
            passed = ScoringService::is_passing(score.score_percent, assessment.pass_mark),
            "attempt ended"
        );
        Ok(EndAttemptResponse { score })
    }

    /// Ad-hoc score of any attempt owned by the caller, completed or not.
    pub async fn score(&self, attempt_id: Uuid, user_id: Uuid) -> Result<EndAttemptResponse> {
        let attempt = self.get_owned_attempt(attempt_id, user_id).await?;
        let score = ScoringService::new(self.pool.clone()).score(attempt.id).await?;
        Ok(EndAttemptResponse { score })
    }

    pub(crate) async fn get_owned_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> Result<Attempt> {
        let attempt = sqlx::query_as::<_, Attempt>(r#"SELECT * FROM attempts WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;

        // Ownership failures look identical to missing attempts on purpose
        match attempt {
            Some(attempt) if attempt.user_id == user_id => Ok(attempt),
            _ => Err(Error::NotFound("Attempt not found".to_string())),
        }
    }

    pub(crate) async fn get_assessment(&self, assessment_id: Uuid) -> Result<Assessment> {
        sqlx::query_as::<_, Assessment>(r#"SELECT * FROM assessments WHERE id = $1"#)
            .bind(assessment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))
    }

    async fn find_in_progress(
        &self,
        assessment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"SELECT * FROM attempts WHERE assessment_id = $1 AND user_id = $2 AND status = $3"#,
        )
        .bind(assessment_id)
        .bind(user_id)
        .bind(STATUS_IN_PROGRESS)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    /// Marks a timed-out attempt completed, with `ended_at` clamped to the
    /// moment the budget ran out rather than the moment we noticed. Every
    /// operation that detects expiry goes through here.
    pub(crate) async fn finalize_expired(
        &self,
        attempt: &Attempt,
        duration_minutes: i32,
    ) -> Result<()> {
        let ended = attempt.started_at + Duration::seconds(i64::from(duration_minutes) * 60);
        sqlx::query(
            r#"UPDATE attempts SET status = $1, ended_at = $2 WHERE id = $3 AND status = $4"#,
        )
        .bind(STATUS_COMPLETED)
        .bind(ended)
        .bind(attempt.id)
        .bind(STATUS_IN_PROGRESS)
        .execute(&self.pool)
        .await?;
        tracing::info!(attempt_id = %attempt.id, "expired attempt finalized");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(FromRow)]
struct BoundQuestionRow {
    question_id: Uuid,
    text: String,
}

#[derive(FromRow)]
struct BoundOptionRow {
    option_id: Uuid,
    question_id: Uuid,
    text: String,
    is_correct: bool,
}

/// Rebuilds the learner-facing question list for an attempt: stored draw
/// order, current selections, and no correctness flags. Whether a question
/// is multi-select is derived from the authored correct-option count on
/// every read, never stored.
pub(crate) async fn load_question_views(
    pool: &PgPool,
    attempt_id: Uuid,
) -> Result<Vec<AttemptQuestionView>> {
    let question_rows = sqlx::query_as::<_, BoundQuestionRow>(
        r#"
        SELECT q.id AS question_id, q.text
        FROM attempt_questions aq
        JOIN questions q ON q.id = aq.question_id
        WHERE aq.attempt_id = $1
        ORDER BY aq.position
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;

    let option_rows = sqlx::query_as::<_, BoundOptionRow>(
        r#"
        SELECT ao.id AS option_id, ao.question_id, ao.text, ao.is_correct
        FROM answer_options ao
        JOIN attempt_questions aq ON aq.question_id = ao.question_id
        WHERE aq.attempt_id = $1
        ORDER BY ao.position, ao.created_at
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;

    let selected: HashSet<Uuid> =
        sqlx::query_scalar::<_, Uuid>(r#"SELECT option_id FROM answers WHERE attempt_id = $1"#)
            .bind(attempt_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let mut options_by_question: HashMap<Uuid, Vec<BoundOptionRow>> = HashMap::new();
    for row in option_rows {
        options_by_question
            .entry(row.question_id)
            .or_default()
            .push(row);
    }

    let views = question_rows
        .into_iter()
        .map(|row| {
            let options = options_by_question
                .remove(&row.question_id)
                .unwrap_or_default();
            let is_multi = options.iter().filter(|o| o.is_correct).count() > 1;
            AttemptQuestionView {
                id: row.question_id,
                question: row.text,
                is_multi,
                answers: options
                    .into_iter()
                    .map(|o| AttemptOptionView {
                        id: o.option_id,
                        text: o.text,
                        selected: selected.contains(&o.option_id),
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(views)
}
