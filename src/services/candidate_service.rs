use crate::dto::candidate_dto::RegistrationFields;
use crate::error::{Error, FieldError, Result};
use crate::models::candidate::{Candidat, CandidateStatus};
use crate::utils::upload::{self, UploadRules, IDENTITY_EXTS};
use bytes::Bytes;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

const CANDIDAT_COLUMNS: &str = "id, nom, prenom, date_naissance, email, telephone, adresse, \
     numero_cnoa, piece_identite_recto, piece_identite_verso, fichier_biographie, \
     fichier_note_intention, fichier_projet, statut, token_step2, langue, created_at, submitted_at";

/// One uploaded file as it came off the multipart body.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub data: Bytes,
}

/// Step-1 registration intake plus the jury-facing candidate queries.
#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
    identity_dir: String,
    max_identity_bytes: usize,
}

impl CandidateService {
    pub fn new(pool: PgPool, identity_dir: String, max_identity_bytes: usize) -> Self {
        Self {
            pool,
            identity_dir,
            max_identity_bytes,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Candidat>> {
        let candidat = sqlx::query_as::<_, Candidat>(&format!(
            "SELECT {} FROM candidats WHERE id = $1",
            CANDIDAT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidat)
    }

    pub async fn list(
        &self,
        statut: Option<CandidateStatus>,
        q: Option<String>,
    ) -> Result<Vec<Candidat>> {
        let candidats = sqlx::query_as::<_, Candidat>(&format!(
            r#"
            SELECT {} FROM candidats
            WHERE ($1::candidate_status IS NULL OR statut = $1)
              AND ($2::text IS NULL
                   OR nom ILIKE '%' || $2 || '%'
                   OR prenom ILIKE '%' || $2 || '%'
                   OR email ILIKE '%' || $2 || '%'
                   OR numero_cnoa ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            "#,
            CANDIDAT_COLUMNS
        ))
        .bind(statut)
        .bind(q)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidats)
    }

    /// Full intake pipeline: duplicate pre-checks, both identity documents
    /// validated and stored, then the row inserted. Any failure after a file
    /// hit disk deletes what was written in this attempt.
    pub async fn register(
        &self,
        fields: &RegistrationFields,
        date_naissance: NaiveDate,
        recto: IncomingFile,
        verso: IncomingFile,
    ) -> Result<Candidat> {
        // Pre-checks before any file is written, so duplicates get a friendly
        // message instead of a constraint violation.
        let email_taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM candidats WHERE email = $1")
                .bind(&fields.email)
                .fetch_optional(&self.pool)
                .await?;
        if email_taken.is_some() {
            return Err(Error::BadRequest(
                "A candidate with this email address is already registered".to_string(),
            ));
        }

        let cnoa_taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM candidats WHERE numero_cnoa = $1")
                .bind(&fields.numero_cnoa)
                .fetch_optional(&self.pool)
                .await?;
        if cnoa_taken.is_some() {
            return Err(Error::BadRequest(
                "A candidate with this CNOA number is already registered".to_string(),
            ));
        }

        let rules = UploadRules {
            allowed_exts: IDENTITY_EXTS,
            max_bytes: self.max_identity_bytes,
        };

        let mut file_errors: Vec<FieldError> = Vec::new();
        let recto_ext = match upload::validate_upload("piece_recto", &recto.filename, &recto.data, &rules)
        {
            Ok(ext) => Some(ext),
            Err(e) => {
                file_errors.push(e);
                None
            }
        };
        let verso_ext = match upload::validate_upload("piece_verso", &verso.filename, &verso.data, &rules)
        {
            Ok(ext) => Some(ext),
            Err(e) => {
                file_errors.push(e);
                None
            }
        };
        if !file_errors.is_empty() {
            return Err(Error::Files(file_errors));
        }
        let (recto_ext, verso_ext) = (recto_ext.unwrap(), verso_ext.unwrap());

        let recto_path =
            upload::store_upload(&self.identity_dir, "piece_recto", &recto_ext, &recto.data).await?;
        let verso_path =
            match upload::store_upload(&self.identity_dir, "piece_verso", &verso_ext, &verso.data)
                .await
            {
                Ok(path) => path,
                Err(e) => {
                    upload::remove_files([recto_path.as_str()]).await;
                    return Err(e);
                }
            };

        let inserted = sqlx::query_as::<_, Candidat>(&format!(
            r#"
            INSERT INTO candidats
                (nom, prenom, date_naissance, email, telephone, adresse, numero_cnoa,
                 piece_identite_recto, piece_identite_verso, statut)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING {}
            "#,
            CANDIDAT_COLUMNS
        ))
        .bind(&fields.nom)
        .bind(&fields.prenom)
        .bind(date_naissance)
        .bind(&fields.email)
        .bind(&fields.telephone)
        .bind(&fields.adresse)
        .bind(&fields.numero_cnoa)
        .bind(&recto_path)
        .bind(&verso_path)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(candidat) => Ok(candidat),
            Err(e) => {
                // The row never landed; the documents written in this attempt
                // must not survive it.
                upload::remove_files([recto_path.as_str(), verso_path.as_str()]).await;
                Err(map_unique_violation(e))
            }
        }
    }
}

/// Backstop for the duplicate pre-checks: a concurrent registration can still
/// hit the unique indexes, and that loser deserves the same friendly message.
fn map_unique_violation(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref db) = err {
        match db.constraint() {
            Some("candidats_email_key") => {
                return Error::BadRequest(
                    "A candidate with this email address is already registered".to_string(),
                )
            }
            Some("candidats_numero_cnoa_key") => {
                return Error::BadRequest(
                    "A candidate with this CNOA number is already registered".to_string(),
                )
            }
            _ => {}
        }
    }
    err.into()
}
