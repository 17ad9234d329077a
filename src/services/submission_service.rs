use crate::error::{Error, FieldError, Result};
use crate::models::candidate::Candidat;
use crate::services::candidate_service::IncomingFile;
use crate::utils::upload::{self, UploadRules, PROJECT_EXTS};
use sqlx::PgPool;

const CANDIDAT_COLUMNS: &str = "id, nom, prenom, date_naissance, email, telephone, adresse, \
     numero_cnoa, piece_identite_recto, piece_identite_verso, fichier_biographie, \
     fichier_note_intention, fichier_projet, statut, token_step2, langue, created_at, submitted_at";

/// The three required step-2 project files.
#[derive(Debug)]
pub struct SubmissionFiles {
    pub biographie: IncomingFile,
    pub note_intention: IncomingFile,
    pub projet: IncomingFile,
}

/// Step-2 submission pipeline: token check, file validation and storage, and
/// the compare-and-swap update that consumes the token. A failed pipeline
/// deletes every file it already wrote.
#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
    project_dir: String,
    max_project_bytes: usize,
}

impl SubmissionService {
    pub fn new(pool: PgPool, project_dir: String, max_project_bytes: usize) -> Self {
        Self {
            pool,
            project_dir,
            max_project_bytes,
        }
    }

    pub async fn submit(
        &self,
        token: &str,
        langue: &str,
        files: SubmissionFiles,
    ) -> Result<Candidat> {
        // Whatever is wrong with the token (unknown, consumed, rejected
        // owner), the answer is the same generic rejection.
        let owner: Option<(uuid::Uuid,)> = sqlx::query_as(
            "SELECT id FROM candidats WHERE token_step2 = $1 AND statut = 'approved'",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        if owner.is_none() {
            tracing::warn!("step-2 submission with an unusable token");
            return Err(Error::invalid_token());
        }

        let rules = UploadRules {
            allowed_exts: PROJECT_EXTS,
            max_bytes: self.max_project_bytes,
        };

        let required = [
            ("biographie", &files.biographie),
            ("note_intention", &files.note_intention),
            ("projet", &files.projet),
        ];

        // Validate everything first so the response names every bad file, not
        // just the first one.
        let mut errors: Vec<FieldError> = Vec::new();
        let mut exts: Vec<String> = Vec::with_capacity(3);
        for (field, file) in &required {
            match upload::validate_upload(field, &file.filename, &file.data, &rules) {
                Ok(ext) => exts.push(ext),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            return Err(Error::Files(errors));
        }

        let mut stored: Vec<String> = Vec::with_capacity(3);
        for ((prefix, file), ext) in required.iter().zip(&exts) {
            match upload::store_upload(&self.project_dir, prefix, ext, &file.data).await {
                Ok(path) => stored.push(path),
                Err(e) => {
                    // Fail fast; nothing written so far may outlive the attempt.
                    upload::remove_files(stored.iter().map(String::as_str)).await;
                    return Err(e);
                }
            }
        }

        let langue = if langue == "en" { "en" } else { "fr" };

        // Compare-and-swap: the WHERE clause re-checks token and status, so of
        // two racing submissions exactly one row matches for exactly one of
        // them. The loser sees no row and cleans up its files.
        let updated = sqlx::query_as::<_, Candidat>(&format!(
            r#"
            UPDATE candidats
            SET fichier_biographie = $1,
                fichier_note_intention = $2,
                fichier_projet = $3,
                statut = 'completed',
                token_step2 = NULL,
                submitted_at = NOW(),
                langue = $4
            WHERE token_step2 = $5 AND statut = 'approved'
            RETURNING {}
            "#,
            CANDIDAT_COLUMNS
        ))
        .bind(&stored[0])
        .bind(&stored[1])
        .bind(&stored[2])
        .bind(langue)
        .bind(token)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(candidat)) => Ok(candidat),
            Ok(None) => {
                upload::remove_files(stored.iter().map(String::as_str)).await;
                tracing::warn!("step-2 token consumed by a concurrent submission");
                Err(Error::invalid_token())
            }
            Err(e) => {
                upload::remove_files(stored.iter().map(String::as_str)).await;
                Err(e.into())
            }
        }
    }
}
