use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::token::{hash_token, parse_authorization};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    // Malformed keys are rejected here without touching the database.
    let key = parse_authorization(auth_header).ok_or(AppError::Unauthorized)?;

    let (id, username) = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT u.id, u.username
        FROM auth_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.token_hash = $1
        "#,
    )
    .bind(hash_token(key))
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized)?;

    tracing::debug!(user_id = %id, "Authenticated request");

    req.extensions_mut().insert(AuthUser { id, username });
    Ok(next.run(req).await)
}
