use axum::{extract::State, http::StatusCode, Extension, Json};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    middleware::AuthUser,
    password::{hash_password, verify_password},
    token::generate_token,
};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::models::user::{CredentialsRequest, LoginResponse, RegisterResponse, User};
use crate::AppState;

/// Create a token for the user and store its hash. Returns the raw key.
async fn issue_token(db: &PgPool, user_id: Uuid) -> AppResult<String> {
    let (key, token_hash) = generate_token();

    sqlx::query("INSERT INTO auth_tokens (id, user_id, token_hash) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&token_hash)
        .execute(db)
        .await?;

    Ok(key)
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let (username, password) = body
        .pair()
        .ok_or_else(|| AppError::Validation("Username and password are required.".into()))?;
    body.validate()?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Username already exists.".into()));
    }

    let pwd_hash = hash_password(password)?;

    // A concurrent registration can still win the race; the unique index
    // turns that into a 409 as well.
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(&pwd_hash)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Username already exists.".into()),
        other => other,
    })?;

    let token = issue_token(&state.db, user.id).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token,
            username: user.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<CredentialsRequest>,
) -> AppResult<Json<LoginResponse>> {
    let invalid = || AppError::Validation("Unable to log in with provided credentials.".into());

    let (username, password) = body
        .pair()
        .ok_or_else(|| AppError::Validation("Username and password are required.".into()))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(invalid());
    }

    let token = issue_token(&state.db, user.id).await?;
    Ok(Json(LoginResponse { token }))
}

/// Revoke every token held by the caller.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let revoked = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
        .bind(auth_user.id)
        .execute(&state.db)
        .await?
        .rows_affected();

    tracing::info!(user_id = %auth_user.id, revoked, "User logged out");
    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}
