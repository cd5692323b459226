use crate::dto::attempt_dto::{RecommendationView, ScoreReport};
use crate::error::Result;
use crate::models::course_module::CourseModule;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

/// Everything needed to grade one attempt question, lifted out of the
/// stored rows. Grading never sees mutable counters.
#[derive(Debug, Clone)]
pub struct GradedQuestion {
    pub correct_option_ids: Vec<Uuid>,
    pub selected_option_ids: Vec<Uuid>,
    pub remediation: Option<RecommendationView>,
}

#[derive(Clone)]
pub struct ScoringService {
    pool: PgPool,
}

#[derive(FromRow)]
struct AttemptQuestionRow {
    attempt_question_id: Uuid,
    question_id: Uuid,
    remediation_module_id: Option<Uuid>,
}

#[derive(FromRow)]
struct CorrectOptionRow {
    question_id: Uuid,
    option_id: Uuid,
}

#[derive(FromRow)]
struct SelectedOptionRow {
    attempt_question_id: Uuid,
    option_id: Uuid,
}

impl ScoringService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Computes the score for an attempt from its stored rows. Reproducible:
    /// the same stored state always yields the same report, so this is never
    /// cached and may be called at any point of the attempt's life.
    pub async fn score(&self, attempt_id: Uuid) -> Result<ScoreReport> {
        let question_rows = sqlx::query_as::<_, AttemptQuestionRow>(
            r#"
            SELECT aq.id AS attempt_question_id,
                   q.id AS question_id,
                   q.remediation_module_id
            FROM attempt_questions aq
            JOIN questions q ON q.id = aq.question_id
            WHERE aq.attempt_id = $1
            ORDER BY aq.position
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        let modules = sqlx::query_as::<_, CourseModule>(
            r#"
            SELECT DISTINCT cm.* FROM course_modules cm
            JOIN questions q ON q.remediation_module_id = cm.id
            JOIN attempt_questions aq ON aq.question_id = q.id
            WHERE aq.attempt_id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        let module_titles: HashMap<Uuid, String> =
            modules.into_iter().map(|m| (m.id, m.title)).collect();

        let correct_rows = sqlx::query_as::<_, CorrectOptionRow>(
            r#"
            SELECT ao.question_id, ao.id AS option_id
            FROM answer_options ao
            JOIN attempt_questions aq ON aq.question_id = ao.question_id
            WHERE aq.attempt_id = $1 AND ao.is_correct
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        let selected_rows = sqlx::query_as::<_, SelectedOptionRow>(
            r#"SELECT attempt_question_id, option_id FROM answers WHERE attempt_id = $1"#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        let mut correct_by_question: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in correct_rows {
            correct_by_question
                .entry(row.question_id)
                .or_default()
                .push(row.option_id);
        }
        let mut selected_by_binding: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in selected_rows {
            selected_by_binding
                .entry(row.attempt_question_id)
                .or_default()
                .push(row.option_id);
        }

        let graded: Vec<GradedQuestion> = question_rows
            .into_iter()
            .map(|row| GradedQuestion {
                correct_option_ids: correct_by_question
                    .remove(&row.question_id)
                    .unwrap_or_default(),
                selected_option_ids: selected_by_binding
                    .remove(&row.attempt_question_id)
                    .unwrap_or_default(),
                remediation: row.remediation_module_id.and_then(|module_id| {
                    module_titles.get(&module_id).map(|title| RecommendationView {
                        module_id,
                        title: title.clone(),
                    })
                }),
            })
            .collect();

        Ok(Self::grade(&graded))
    }

    /// Exact-match grading over sorted option-id sets: missing a correct
    /// option or including an incorrect one both count as wrong.
    pub fn grade(questions: &[GradedQuestion]) -> ScoreReport {
        let total_questions = questions.len();
        let mut correct_answers = 0usize;
        let mut recommendations: Vec<RecommendationView> = Vec::new();

        for item in questions {
            let mut want = item.correct_option_ids.clone();
            let mut got = item.selected_option_ids.clone();
            want.sort();
            got.sort();

            if want == got {
                correct_answers += 1;
            } else if let Some(remediation) = &item.remediation {
                // dedupe by module, first-seen order
                if !recommendations
                    .iter()
                    .any(|r| r.module_id == remediation.module_id)
                {
                    recommendations.push(remediation.clone());
                }
            }
        }

        let score_percent = if total_questions == 0 {
            0.0
        } else {
            round2(correct_answers as f64 / total_questions as f64 * 100.0)
        };

        ScoreReport {
            total_questions,
            correct_answers,
            score_percent,
            recommendations,
        }
    }

    /// Pass mark comparison is inclusive: scoring exactly the mark passes.
    pub fn is_passing(score_percent: f64, pass_mark: rust_decimal::Decimal) -> bool {
        use rust_decimal::prelude::ToPrimitive;
        score_percent >= pass_mark.to_f64().unwrap_or(0.0)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
