use bytes::Bytes;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use concours_backend::dto::candidate_dto::RegistrationFields;
use concours_backend::error::Error;
use concours_backend::models::candidate::CandidateStatus;
use concours_backend::services::candidate_service::{CandidateService, IncomingFile};
use concours_backend::services::review_service::ReviewService;
use concours_backend::services::submission_service::{SubmissionFiles, SubmissionService};

// End-to-end lifecycle tests against a live Postgres. Each test skips itself
// when DATABASE_URL is not set, so the suite still passes on machines without
// a database. Upload directories are per-test temp dirs so on-disk file
// counts can be asserted exactly.

const MAX_BYTES: usize = 5 * 1024 * 1024;

async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    Some(pool)
}

fn temp_dir(tag: &str) -> String {
    std::env::temp_dir()
        .join(format!("concours-{}-{}", tag, Uuid::new_v4()))
        .to_string_lossy()
        .to_string()
}

fn registration(email: &str, cnoa: &str) -> RegistrationFields {
    RegistrationFields {
        nom: "Diallo".to_string(),
        prenom: "Awa".to_string(),
        date_naissance: "1985-12-31".to_string(),
        email: email.to_string(),
        telephone: "+221771234567".to_string(),
        adresse: "12 avenue Bourguiba, Dakar".to_string(),
        numero_cnoa: cnoa.to_string(),
    }
}

fn birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1985, 12, 31).expect("valid date")
}

fn identity_file(name: &str) -> IncomingFile {
    IncomingFile {
        filename: name.to_string(),
        data: Bytes::from_static(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3]),
    }
}

fn project_file(name: &str) -> IncomingFile {
    IncomingFile {
        filename: name.to_string(),
        data: Bytes::from_static(b"%PDF-1.4 dossier de projet"),
    }
}

fn submission_files() -> SubmissionFiles {
    SubmissionFiles {
        biographie: project_file("biographie.pdf"),
        note_intention: project_file("note.pdf"),
        projet: project_file("projet.pdf"),
    }
}

async fn file_count(dir: &str) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Some(_) = entries.next_entry().await.expect("read_dir") {
        count += 1;
    }
    count
}

async fn rows_with_email(pool: &PgPool, email: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM candidats WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("count rows");
    count
}

#[tokio::test]
async fn duplicate_registration_creates_no_row_and_no_files() {
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let identity_dir = temp_dir("identite");
    let service = CandidateService::new(pool.clone(), identity_dir.clone(), MAX_BYTES);

    let email = format!("awa.{}@example.org", Uuid::new_v4().simple());
    let cnoa = format!("CNOA-{}", Uuid::new_v4().simple());

    service
        .register(
            &registration(&email, &cnoa),
            birth_date(),
            identity_file("recto.png"),
            identity_file("verso.png"),
        )
        .await
        .expect("first registration");
    assert_eq!(file_count(&identity_dir).await, 2);

    // Same email, fresh CNOA.
    let other_cnoa = format!("CNOA-{}", Uuid::new_v4().simple());
    let err = service
        .register(
            &registration(&email, &other_cnoa),
            birth_date(),
            identity_file("recto.png"),
            identity_file("verso.png"),
        )
        .await
        .expect_err("duplicate email must be rejected");
    assert!(matches!(err, Error::BadRequest(ref msg) if msg.contains("email")));

    // Same CNOA, fresh email.
    let other_email = format!("awa.{}@example.org", Uuid::new_v4().simple());
    let err = service
        .register(
            &registration(&other_email, &cnoa),
            birth_date(),
            identity_file("recto.png"),
            identity_file("verso.png"),
        )
        .await
        .expect_err("duplicate CNOA must be rejected");
    assert!(matches!(err, Error::BadRequest(ref msg) if msg.contains("CNOA")));

    // One row, and only the first attempt's two documents on disk.
    assert_eq!(rows_with_email(&pool, &email).await, 1);
    assert_eq!(rows_with_email(&pool, &other_email).await, 0);
    assert_eq!(file_count(&identity_dir).await, 2);

    let _ = tokio::fs::remove_dir_all(&identity_dir).await;
}

#[tokio::test]
async fn approve_sets_token_and_reject_leaves_none() {
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let identity_dir = temp_dir("identite");
    let candidates = CandidateService::new(pool.clone(), identity_dir.clone(), MAX_BYTES);
    let review = ReviewService::new(pool.clone(), 32);

    let mut ids = Vec::new();
    for _ in 0..2 {
        let email = format!("jury.{}@example.org", Uuid::new_v4().simple());
        let cnoa = format!("CNOA-{}", Uuid::new_v4().simple());
        let candidat = candidates
            .register(
                &registration(&email, &cnoa),
                birth_date(),
                identity_file("recto.png"),
                identity_file("verso.png"),
            )
            .await
            .expect("registration");
        ids.push(candidat.id);
    }

    let approved = review.approve(ids[0]).await.expect("approve");
    assert_eq!(approved.statut, CandidateStatus::Approved);
    assert!(approved.token_step2.is_some());

    let rejected = review.reject(ids[1]).await.expect("reject");
    assert_eq!(rejected.statut, CandidateStatus::Rejected);
    assert!(rejected.token_step2.is_none());

    // Both are out of pending now; a second decision must not go through.
    assert!(review.approve(ids[0]).await.is_err());
    assert!(review.approve(ids[1]).await.is_err());

    let _ = tokio::fs::remove_dir_all(&identity_dir).await;
}

#[tokio::test]
async fn consumed_token_cannot_submit_a_second_file_set() {
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let identity_dir = temp_dir("identite");
    let project_dir = temp_dir("dossiers");
    let candidates = CandidateService::new(pool.clone(), identity_dir.clone(), MAX_BYTES);
    let review = ReviewService::new(pool.clone(), 32);
    let submissions = SubmissionService::new(pool.clone(), project_dir.clone(), MAX_BYTES);

    let email = format!("token.{}@example.org", Uuid::new_v4().simple());
    let cnoa = format!("CNOA-{}", Uuid::new_v4().simple());
    let candidat = candidates
        .register(
            &registration(&email, &cnoa),
            birth_date(),
            identity_file("recto.png"),
            identity_file("verso.png"),
        )
        .await
        .expect("registration");
    let approved = review.approve(candidat.id).await.expect("approve");
    let token = approved.token_step2.expect("token after approval");

    let completed = submissions
        .submit(&token, "fr", submission_files())
        .await
        .expect("first submission");
    assert_eq!(completed.statut, CandidateStatus::Completed);
    assert!(completed.fichier_biographie.is_some());
    assert!(completed.fichier_note_intention.is_some());
    assert!(completed.fichier_projet.is_some());
    assert!(completed.token_step2.is_none());
    assert!(completed.submitted_at.is_some());
    assert_eq!(file_count(&project_dir).await, 3);

    // The token was consumed: the retry gets the generic rejection and must
    // not leave a second set of files behind.
    let err = submissions
        .submit(&token, "fr", submission_files())
        .await
        .expect_err("consumed token must be rejected");
    assert!(matches!(err, Error::Forbidden(_)));
    assert_eq!(file_count(&project_dir).await, 3);

    let _ = tokio::fs::remove_dir_all(&identity_dir).await;
    let _ = tokio::fs::remove_dir_all(&project_dir).await;
}

#[tokio::test]
async fn racing_submissions_leave_one_winner_and_no_orphans() {
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let identity_dir = temp_dir("identite");
    let project_dir = temp_dir("dossiers");
    let candidates = CandidateService::new(pool.clone(), identity_dir.clone(), MAX_BYTES);
    let review = ReviewService::new(pool.clone(), 32);
    let submissions = SubmissionService::new(pool.clone(), project_dir.clone(), MAX_BYTES);

    let email = format!("race.{}@example.org", Uuid::new_v4().simple());
    let cnoa = format!("CNOA-{}", Uuid::new_v4().simple());
    let candidat = candidates
        .register(
            &registration(&email, &cnoa),
            birth_date(),
            identity_file("recto.png"),
            identity_file("verso.png"),
        )
        .await
        .expect("registration");
    let approved = review.approve(candidat.id).await.expect("approve");
    let token = approved.token_step2.expect("token after approval");

    let (first, second) = tokio::join!(
        submissions.submit(&token, "fr", submission_files()),
        submissions.submit(&token, "en", submission_files()),
    );

    // Exactly one winner; the loser gets the generic rejection.
    assert_eq!(
        first.is_ok() as u8 + second.is_ok() as u8,
        1,
        "exactly one of two racing submissions may succeed"
    );
    let loser = if first.is_err() { first } else { second };
    assert!(matches!(loser.unwrap_err(), Error::Forbidden(_)));

    // Only the winner's three files survive on disk.
    assert_eq!(file_count(&project_dir).await, 3);

    let final_state = candidates
        .get(candidat.id)
        .await
        .expect("fetch")
        .expect("row exists");
    assert_eq!(final_state.statut, CandidateStatus::Completed);
    assert!(final_state.token_step2.is_none());

    let _ = tokio::fs::remove_dir_all(&identity_dir).await;
    let _ = tokio::fs::remove_dir_all(&project_dir).await;
}
