use lms_backend::error::Error;
use lms_backend::services::answer_service::AnswerService;
use lms_backend::services::attempt_service::AttemptService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

async fn seed_module(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(r#"INSERT INTO course_modules (title) VALUES ('Module') RETURNING id"#)
        .fetch_one(pool)
        .await
        .expect("seed module")
}

async fn seed_assessment(
    pool: &PgPool,
    module_id: Uuid,
    number_of_questions: i32,
    duration_minutes: i32,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO assessments (module_id, title, duration_minutes, number_of_questions, pass_mark)
        VALUES ($1, 'Quiz', $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(module_id)
    .bind(duration_minutes)
    .bind(number_of_questions)
    .bind(Decimal::new(70, 0))
    .fetch_one(pool)
    .await
    .expect("seed assessment")
}

async fn seed_question(pool: &PgPool, assessment_id: Uuid, text: &str) -> Uuid {
    sqlx::query_scalar(
        r#"INSERT INTO questions (assessment_id, text) VALUES ($1, $2) RETURNING id"#,
    )
    .bind(assessment_id)
    .bind(text)
    .fetch_one(pool)
    .await
    .expect("seed question")
}

async fn seed_option(
    pool: &PgPool,
    question_id: Uuid,
    text: &str,
    is_correct: bool,
    position: i32,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO answer_options (question_id, text, is_correct, position)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(question_id)
    .bind(text)
    .bind(is_correct)
    .bind(position)
    .fetch_one(pool)
    .await
    .expect("seed option")
}

async fn backdate_attempt(pool: &PgPool, attempt_id: Uuid, minutes: i32) {
    sqlx::query(
        r#"UPDATE attempts SET started_at = started_at - make_interval(mins => $2) WHERE id = $1"#,
    )
    .bind(attempt_id)
    .bind(minutes)
    .execute(pool)
    .await
    .expect("backdate attempt");
}

async fn attempt_status(pool: &PgPool, attempt_id: Uuid) -> String {
    sqlx::query_scalar(r#"SELECT status FROM attempts WHERE id = $1"#)
        .bind(attempt_id)
        .fetch_one(pool)
        .await
        .expect("attempt status")
}

#[sqlx::test]
async fn single_correct_question_keeps_exactly_one_answer(pool: PgPool) {
    let module = seed_module(&pool).await;
    let assessment = seed_assessment(&pool, module, 1, 10).await;
    let question = seed_question(&pool, assessment, "Capital of France?").await;
    seed_option(&pool, question, "Paris", true, 0).await;
    let lyon = seed_option(&pool, question, "Lyon", false, 1).await;
    let nice = seed_option(&pool, question, "Nice", false, 2).await;
    seed_option(&pool, question, "Lille", false, 3).await;

    let user = Uuid::new_v4();
    let started = AttemptService::new(pool.clone())
        .start(assessment, user)
        .await
        .expect("start attempt");

    let answers = AnswerService::new(pool.clone());
    answers
        .set_answer(started.attempt_id, lyon, user)
        .await
        .expect("select lyon");
    let state = answers
        .set_answer(started.attempt_id, nice, user)
        .await
        .expect("select nice");

    // Radio semantics: picking a second option replaces the first, so
    // exactly one answer row survives and it is the later pick.
    let rows: Vec<Uuid> =
        sqlx::query_scalar(r#"SELECT option_id FROM answers WHERE attempt_id = $1"#)
            .bind(started.attempt_id)
            .fetch_all(&pool)
            .await
            .expect("answer rows");
    assert_eq!(rows, vec![nice]);

    let selected: Vec<Uuid> = state.questions[0]
        .answers
        .iter()
        .filter(|o| o.selected)
        .map(|o| o.id)
        .collect();
    assert_eq!(selected, vec![nice]);
}

#[sqlx::test]
async fn resume_replays_the_original_draw_order(pool: PgPool) {
    let module = seed_module(&pool).await;
    let assessment = seed_assessment(&pool, module, 5, 10).await;
    let mut correct_options = Vec::new();
    for i in 0..5 {
        let question = seed_question(&pool, assessment, &format!("Question {}", i)).await;
        let right = seed_option(&pool, question, "right", true, 0).await;
        seed_option(&pool, question, "wrong", false, 1).await;
        correct_options.push(right);
    }

    let user = Uuid::new_v4();
    let service = AttemptService::new(pool.clone());
    let started = service.start(assessment, user).await.expect("start attempt");
    let order: Vec<Uuid> = started.questions.iter().map(|q| q.id).collect();
    assert_eq!(order.len(), 5);

    // Answering out of order must not disturb the stored draw order
    let answers = AnswerService::new(pool.clone());
    answers
        .set_answer(started.attempt_id, correct_options[3], user)
        .await
        .expect("answer fourth question");
    answers
        .set_answer(started.attempt_id, correct_options[0], user)
        .await
        .expect("answer first question");

    let resumed = service
        .resume(started.attempt_id, user)
        .await
        .expect("resume attempt");
    let resumed_order: Vec<Uuid> = resumed.questions.iter().map(|q| q.id).collect();
    assert_eq!(resumed_order, order);

    let again = service
        .resume(started.attempt_id, user)
        .await
        .expect("resume twice");
    let again_order: Vec<Uuid> = again.questions.iter().map(|q| q.id).collect();
    assert_eq!(again_order, order);
}

#[sqlx::test]
async fn second_start_while_live_is_a_state_conflict(pool: PgPool) {
    let module = seed_module(&pool).await;
    let assessment = seed_assessment(&pool, module, 1, 10).await;
    let question = seed_question(&pool, assessment, "Pick one").await;
    seed_option(&pool, question, "right", true, 0).await;
    seed_option(&pool, question, "wrong", false, 1).await;

    let user = Uuid::new_v4();
    let service = AttemptService::new(pool.clone());
    service.start(assessment, user).await.expect("first start");

    let err = service.start(assessment, user).await.unwrap_err();
    assert!(matches!(err, Error::State(_)));
}

#[sqlx::test]
async fn check_finalizes_an_expired_attempt(pool: PgPool) {
    let module = seed_module(&pool).await;
    let assessment = seed_assessment(&pool, module, 1, 10).await;
    let question = seed_question(&pool, assessment, "Pick one").await;
    seed_option(&pool, question, "right", true, 0).await;
    seed_option(&pool, question, "wrong", false, 1).await;

    let user = Uuid::new_v4();
    let service = AttemptService::new(pool.clone());
    let started = service.start(assessment, user).await.expect("start attempt");
    backdate_attempt(&pool, started.attempt_id, 11).await;

    let check = service.check(assessment, user).await.expect("check");
    assert!(check.exists);
    assert!(!check.has_time_left);
    assert_eq!(check.time_remaining, Some(0));
    assert!(check.score.is_some());

    assert_eq!(attempt_status(&pool, started.attempt_id).await, "completed");
}

#[sqlx::test]
async fn expired_attempt_rejects_answers_and_is_finalized(pool: PgPool) {
    let module = seed_module(&pool).await;
    let assessment = seed_assessment(&pool, module, 1, 10).await;
    let question = seed_question(&pool, assessment, "Pick one").await;
    let right = seed_option(&pool, question, "right", true, 0).await;
    seed_option(&pool, question, "wrong", false, 1).await;

    let user = Uuid::new_v4();
    let service = AttemptService::new(pool.clone());
    let started = service.start(assessment, user).await.expect("start attempt");
    backdate_attempt(&pool, started.attempt_id, 11).await;

    let err = AnswerService::new(pool.clone())
        .set_answer(started.attempt_id, right, user)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::State(_)));

    assert_eq!(attempt_status(&pool, started.attempt_id).await, "completed");
}
