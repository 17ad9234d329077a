use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::dto::candidate_dto::{ApiResponse, ListCandidatesQuery};
use crate::error::{Error, Result};
use crate::models::candidate::CandidateStatus;
use crate::AppState;

pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<ListCandidatesQuery>,
) -> Result<impl axum::response::IntoResponse> {
    let statut = match query.statut.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<CandidateStatus>()
                .map_err(|_| Error::BadRequest(format!("Unknown status filter: {}", raw)))?,
        ),
    };
    let q = query.q.filter(|s| !s.trim().is_empty());

    let candidats = state.candidate_service.list(statut, q).await?;
    Ok(Json(ApiResponse::ok("Candidates", candidats)))
}

pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse> {
    let candidat = state
        .candidate_service
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))?;
    Ok(Json(ApiResponse::ok("Candidate", candidat)))
}

/// pending -> approved. The approval commits first; the notification carrying
/// the step-2 link is dispatched afterwards and cannot roll it back.
pub async fn approve_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse> {
    let candidat = state.review_service.approve(id).await?;
    tracing::info!(candidate_id = %id, "candidature approved");

    if let Some(ref token) = candidat.token_step2 {
        state
            .mailer
            .dispatch_approved(&candidat.email, &candidat.prenom, &candidat.langue, token);
    }

    Ok(Json(ApiResponse::ok(
        "Candidature approved",
        serde_json::json!({ "id": candidat.id, "statut": candidat.statut }),
    )))
}

/// pending -> rejected. Terminal.
pub async fn reject_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse> {
    let candidat = state.review_service.reject(id).await?;
    tracing::info!(candidate_id = %id, "candidature rejected");

    state
        .mailer
        .dispatch_rejected(&candidat.email, &candidat.prenom, &candidat.langue);

    Ok(Json(ApiResponse::ok(
        "Candidature rejected",
        serde_json::json!({ "id": candidat.id, "statut": candidat.statut }),
    )))
}
