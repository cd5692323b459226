pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{answer_service::AnswerService, attempt_service::AttemptService};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub attempt_service: AttemptService,
    pub answer_service: AnswerService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let attempt_service = AttemptService::new(pool.clone());
        let answer_service = AnswerService::new(pool.clone());

        Self {
            pool,
            attempt_service,
            answer_service,
        }
    }
}
