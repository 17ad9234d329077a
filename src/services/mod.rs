pub mod candidate_service;
pub mod mailer_service;
pub mod review_service;
pub mod submission_service;
