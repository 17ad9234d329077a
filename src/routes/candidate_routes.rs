use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::dto::candidate_dto::{ApiResponse, RegisterResponse, RegistrationFields};
use crate::error::{Error, Result};
use crate::services::candidate_service::IncomingFile;
use crate::AppState;

async fn read_file_field(field: axum::extract::multipart::Field<'_>) -> Result<IncomingFile> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let data = field.bytes().await.map_err(|e| {
        tracing::error!(error = ?e, "upload transfer failed");
        Error::BadRequest("File upload was interrupted, please retry".to_string())
    })?;
    Ok(IncomingFile { filename, data })
}

/// Step-1 registration: identity fields plus both sides of the identity
/// document, as one multipart form.
pub async fn register_candidate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse> {
    tracing::info!("registration request received");

    let mut fields = RegistrationFields::default();
    let mut recto: Option<IncomingFile> = None;
    let mut verso: Option<IncomingFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "nom" => fields.nom = field.text().await.unwrap_or_default(),
            "prenom" => fields.prenom = field.text().await.unwrap_or_default(),
            "date_naissance" => fields.date_naissance = field.text().await.unwrap_or_default(),
            "email" => fields.email = field.text().await.unwrap_or_default().trim().to_lowercase(),
            "telephone" => fields.telephone = field.text().await.unwrap_or_default(),
            "adresse" => fields.adresse = field.text().await.unwrap_or_default(),
            "numero_cnoa" => {
                fields.numero_cnoa = field.text().await.unwrap_or_default().trim().to_string()
            }
            "piece_recto" => recto = Some(read_file_field(field).await?),
            "piece_verso" => verso = Some(read_file_field(field).await?),
            _ => {}
        }
    }

    fields.validate()?;
    let date_naissance =
        chrono::NaiveDate::parse_from_str(&fields.date_naissance, "%Y-%m-%d").map_err(|_| {
            Error::BadRequest("Birth date must use the YYYY-MM-DD format".to_string())
        })?;
    let recto = recto.ok_or_else(|| {
        Error::BadRequest("The front side of the identity document is required".to_string())
    })?;
    let verso = verso.ok_or_else(|| {
        Error::BadRequest("The back side of the identity document is required".to_string())
    })?;

    let candidat = state
        .candidate_service
        .register(&fields, date_naissance, recto, verso)
        .await?;

    tracing::info!(candidate_id = %candidat.id, "candidate registered");

    // Best-effort notifications, dispatched only after the row exists.
    state
        .mailer
        .dispatch_registration_received(&candidat.email, &candidat.prenom, &candidat.langue);
    state
        .mailer
        .dispatch_jury_new_registration(&candidat.nom, &candidat.prenom, &candidat.email);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Registration recorded",
            RegisterResponse {
                id: candidat.id,
                statut: candidat.statut,
            },
        )),
    ))
}
