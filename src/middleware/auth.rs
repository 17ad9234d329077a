use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JuryClaims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JuryAuth {
    secret: String,
}

impl JuryAuth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

/// One generic 403 for every shape of failed jury authentication; the reason
/// is not revealed to the caller.
fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "success": false, "message": "Access denied" })),
    )
        .into_response()
}

pub async fn require_jury(
    State(auth): State<JuryAuth>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return forbidden();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return forbidden();
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return forbidden();
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<JuryClaims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => {
            req.extensions_mut().insert(data.claims);
            next.run(req).await
        }
        Err(_) => forbidden(),
    }
}
