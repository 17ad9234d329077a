use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::dto::candidate_dto::{ApiResponse, SubmissionResponse};
use crate::error::{Error, Result};
use crate::services::candidate_service::IncomingFile;
use crate::services::submission_service::SubmissionFiles;
use crate::AppState;

async fn read_file_field(field: axum::extract::multipart::Field<'_>) -> Result<IncomingFile> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let data = field.bytes().await.map_err(|e| {
        tracing::error!(error = ?e, "upload transfer failed");
        Error::BadRequest("File upload was interrupted, please retry".to_string())
    })?;
    Ok(IncomingFile { filename, data })
}

/// Step-2 submission: the single-use token, the notification language and the
/// three project files, as one multipart form.
pub async fn submit_project(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse> {
    tracing::info!("step-2 submission request received");

    let mut token = String::new();
    let mut langue = String::from("fr");
    let mut biographie: Option<IncomingFile> = None;
    let mut note_intention: Option<IncomingFile> = None;
    let mut projet: Option<IncomingFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "token" => token = field.text().await.unwrap_or_default().trim().to_string(),
            "langue" => langue = field.text().await.unwrap_or_default(),
            "biographie" => biographie = Some(read_file_field(field).await?),
            "note_intention" => note_intention = Some(read_file_field(field).await?),
            "projet" => projet = Some(read_file_field(field).await?),
            _ => {}
        }
    }

    if token.is_empty() {
        return Err(Error::invalid_token());
    }
    let biographie = biographie
        .ok_or_else(|| Error::BadRequest("The biography file is required".to_string()))?;
    let note_intention = note_intention.ok_or_else(|| {
        Error::BadRequest("The statement-of-intent file is required".to_string())
    })?;
    let projet = projet
        .ok_or_else(|| Error::BadRequest("The preliminary project file is required".to_string()))?;

    let candidat = state
        .submission_service
        .submit(
            &token,
            &langue,
            SubmissionFiles {
                biographie,
                note_intention,
                projet,
            },
        )
        .await?;

    tracing::info!(candidate_id = %candidat.id, "project dossier submitted");

    // Only after the commit: confirmation to the candidate, alert to the jury.
    state
        .mailer
        .dispatch_submission_confirmed(&candidat.email, &candidat.prenom, &candidat.langue);
    state
        .mailer
        .dispatch_jury_new_submission(&candidat.nom, &candidat.prenom, &candidat.email);

    Ok(Json(ApiResponse::ok(
        "Project dossier recorded",
        SubmissionResponse {
            statut: candidat.statut,
            submitted_at: candidat.submitted_at.unwrap_or_else(chrono::Utc::now),
        },
    )))
}
