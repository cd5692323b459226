use crate::error::{Error, Result};
use crate::models::answer_option::AnswerOption;
use crate::models::assessment::Assessment;
use crate::models::question::Question;
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// A pool question together with its options, as handed to the lifecycle
/// manager at attempt start.
#[derive(Debug, Clone)]
pub struct PoolQuestion {
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

#[derive(Clone)]
pub struct SelectorService {
    pool: PgPool,
}

impl SelectorService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Draws `assessment.number_of_questions` questions uniformly at random
    /// (without replacement) from the assessment's eligible pool. The order
    /// of the returned list is the draw order. Pure read: persisting the
    /// choice is the caller's job.
    pub async fn select_questions(&self, assessment_id: Uuid) -> Result<Vec<PoolQuestion>> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments WHERE id = $1"#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))?;

        // Only questions with at least one correct option are eligible
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT q.* FROM questions q
            WHERE q.assessment_id = $1
              AND EXISTS (
                  SELECT 1 FROM answer_options ao
                  WHERE ao.question_id = q.id AND ao.is_correct
              )
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, AnswerOption>(
            r#"
            SELECT ao.* FROM answer_options ao
            JOIN questions q ON q.id = ao.question_id
            WHERE q.assessment_id = $1
            ORDER BY ao.position, ao.created_at
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        let mut options_by_question: HashMap<Uuid, Vec<AnswerOption>> = HashMap::new();
        for option in options {
            options_by_question
                .entry(option.question_id)
                .or_default()
                .push(option);
        }

        let pool_items: Vec<PoolQuestion> = questions
            .into_iter()
            .map(|question| {
                let options = options_by_question.remove(&question.id).unwrap_or_default();
                PoolQuestion { question, options }
            })
            .collect();

        let n = assessment.number_of_questions.max(0) as usize;
        Ok(Self::draw(pool_items, n, &mut rand::thread_rng()))
    }

    /// Uniform draw without replacement, clamped to the pool size.
    pub fn draw<R: Rng>(mut pool: Vec<PoolQuestion>, n: usize, rng: &mut R) -> Vec<PoolQuestion> {
        pool.shuffle(rng);
        pool.truncate(n.min(pool.len()));
        pool
    }
}
