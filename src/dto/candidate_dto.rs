use crate::models::candidate::CandidateStatus;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Uniform response envelope used by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Text fields of the step-1 registration form, collected from the multipart
/// body before the identity documents are touched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegistrationFields {
    #[validate(length(min = 1, message = "Last name is required"))]
    pub nom: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub prenom: String,
    #[validate(length(min = 1, message = "Birth date is required"))]
    pub date_naissance: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "A valid phone number is required"))]
    pub telephone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub adresse: String,
    #[validate(length(min = 1, message = "CNOA registration number is required"))]
    pub numero_cnoa: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: uuid::Uuid,
    pub statut: CandidateStatus,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub statut: CandidateStatus,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListCandidatesQuery {
    pub statut: Option<String>,
    pub q: Option<String>,
}
