use crate::error::{Error, FieldError, Result};
use bytes::Bytes;
use std::path::Path;
use tokio::fs;

/// Validation policy for one class of uploads (identity documents or project
/// files): which extensions are accepted and how large a file may be.
#[derive(Debug, Clone)]
pub struct UploadRules {
    pub allowed_exts: &'static [&'static str],
    pub max_bytes: usize,
}

pub const IDENTITY_EXTS: &[&str] = &["jpg", "jpeg", "png", "pdf"];
pub const PROJECT_EXTS: &[&str] = &["pdf", "doc", "docx"];

/// Extracts a lowercase extension from the client-supplied filename. This is
/// the only thing the client filename is trusted for.
fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Magic-byte check per extension. The filename already claimed the type;
/// the content has to agree, so a payload renamed to `.pdf` is rejected.
fn content_matches(ext: &str, data: &Bytes) -> bool {
    match ext {
        "pdf" => data.starts_with(b"%PDF"),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8]),
        "png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "doc" => data.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]),
        "docx" => data.starts_with(b"PK\x03\x04"),
        _ => false,
    }
}

fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Validates one uploaded file against the rules; returns its extension on
/// success, or a user-facing per-field error naming the exact problem.
pub fn validate_upload(
    field: &str,
    filename: &str,
    data: &Bytes,
    rules: &UploadRules,
) -> std::result::Result<String, FieldError> {
    let fail = |message: String| FieldError {
        field: field.to_string(),
        message,
    };

    let ext = extension_of(filename)
        .ok_or_else(|| fail("File has no extension".to_string()))?;
    if !rules.allowed_exts.contains(&ext.as_str()) {
        return Err(fail(format!(
            "File type .{} is not allowed (accepted: {})",
            ext,
            rules.allowed_exts.join(", ")
        )));
    }
    if data.is_empty() {
        return Err(fail("File is empty".to_string()));
    }
    if data.len() > rules.max_bytes {
        return Err(fail(format!(
            "File exceeds the maximum allowed size of {}",
            human_size(rules.max_bytes)
        )));
    }
    if !content_matches(&ext, data) {
        return Err(fail(format!(
            "File content does not match its .{} extension",
            ext
        )));
    }

    Ok(ext)
}

/// Writes validated data under `dir` with a generated name combining the
/// field prefix, a fresh uniqueness token and a timestamp. The directory is
/// created on demand. Returns the stored path.
pub async fn store_upload(dir: &str, prefix: &str, ext: &str, data: &Bytes) -> Result<String> {
    fs::create_dir_all(dir).await?;

    let name = format!(
        "{}_{}_{}.{}",
        prefix,
        uuid::Uuid::new_v4().simple(),
        chrono::Utc::now().timestamp(),
        ext
    );
    let path = format!("{}/{}", dir, name);

    fs::write(&path, data).await.map_err(|e| {
        tracing::error!(path = %path, error = ?e, "failed to write upload");
        Error::Internal(format!("Failed to store file for field {}", prefix))
    })?;

    Ok(path)
}

/// Best-effort removal of stored files after a failed pipeline, so a partial
/// failure never leaves files on disk unreferenced by any database row.
pub async fn remove_files<I, S>(paths: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for path in paths {
        let path = path.as_ref();
        if let Err(e) = fs::remove_file(path).await {
            tracing::warn!(path = %path, error = ?e, "failed to remove orphaned upload");
        }
    }
}
