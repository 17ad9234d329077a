use crate::error::{Error, Result};
use crate::models::candidate::Candidat;
use crate::utils::token::generate_step2_token;
use sqlx::PgPool;
use uuid::Uuid;

const CANDIDAT_COLUMNS: &str = "id, nom, prenom, date_naissance, email, telephone, adresse, \
     numero_cnoa, piece_identite_recto, piece_identite_verso, fichier_biographie, \
     fichier_note_intention, fichier_projet, statut, token_step2, langue, created_at, submitted_at";

/// Jury decisions on pending candidatures. Both transitions are single
/// conditioned updates: the WHERE clause carries the state-machine guard, and
/// an unmatched row means the candidate was missing or already reviewed.
#[derive(Clone)]
pub struct ReviewService {
    pool: PgPool,
    token_bytes: usize,
}

impl ReviewService {
    pub fn new(pool: PgPool, token_bytes: usize) -> Self {
        Self { pool, token_bytes }
    }

    /// pending -> approved. Sets the status and a fresh single-use step-2
    /// token in one statement.
    pub async fn approve(&self, id: Uuid) -> Result<Candidat> {
        let token = generate_step2_token(self.token_bytes);

        let updated = sqlx::query_as::<_, Candidat>(&format!(
            r#"
            UPDATE candidats
            SET statut = 'approved', token_step2 = $1
            WHERE id = $2 AND statut = 'pending'
            RETURNING {}
            "#,
            CANDIDAT_COLUMNS
        ))
        .bind(&token)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| self.decision_conflict(id))
    }

    /// pending -> rejected. Terminal; the token column stays null.
    pub async fn reject(&self, id: Uuid) -> Result<Candidat> {
        let updated = sqlx::query_as::<_, Candidat>(&format!(
            r#"
            UPDATE candidats
            SET statut = 'rejected'
            WHERE id = $1 AND statut = 'pending'
            RETURNING {}
            "#,
            CANDIDAT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| self.decision_conflict(id))
    }

    fn decision_conflict(&self, id: Uuid) -> Error {
        tracing::warn!(candidate_id = %id, "jury decision on a non-pending candidature");
        Error::BadRequest("This candidature has already been reviewed or does not exist".to_string())
    }
}
