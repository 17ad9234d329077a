pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::services::{
    candidate_service::CandidateService, mailer_service::MailerService,
    review_service::ReviewService, submission_service::SubmissionService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub candidate_service: CandidateService,
    pub review_service: ReviewService,
    pub submission_service: SubmissionService,
    pub mailer: MailerService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let candidate_service = CandidateService::new(
            pool.clone(),
            config.uploads_identity_dir.clone(),
            config.max_identity_file_bytes,
        );
        let review_service = ReviewService::new(pool.clone(), config.step2_token_bytes);
        let submission_service = SubmissionService::new(
            pool.clone(),
            config.uploads_project_dir.clone(),
            config.max_project_file_bytes,
        );
        let mailer = MailerService::new(&config);

        Self {
            pool,
            config: Arc::new(config),
            candidate_service,
            review_service,
            submission_service,
            mailer,
        }
    }
}
