pub mod candidate_routes;
pub mod health;
pub mod jury_routes;
pub mod submission_routes;
