use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::habits::find_owned_habit;
use crate::models::daily_log::{
    CreateDailyLogRequest, DailyLogQuery, HabitDailyLog, UpdateDailyLogRequest,
};
use crate::AppState;

fn log_not_found() -> AppError {
    AppError::NotFound("Daily log not found".into())
}

fn duplicate_log(e: sqlx::Error) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict("A log for this habit and date already exists.".into())
        }
        other => other,
    }
}

/// Logs are reachable only through a habit owned by `user_id`.
async fn find_owned_log(db: &PgPool, log_id: Uuid, user_id: Uuid) -> AppResult<HabitDailyLog> {
    sqlx::query_as::<_, HabitDailyLog>(
        r#"
        SELECT l.* FROM habit_daily_logs l
        JOIN habits h ON h.id = l.habit_id
        WHERE l.id = $1 AND h.user_id = $2
        "#,
    )
    .bind(log_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(log_not_found)
}

pub async fn list_daily_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DailyLogQuery>,
) -> AppResult<Json<Vec<HabitDailyLog>>> {
    let logs = sqlx::query_as::<_, HabitDailyLog>(
        r#"
        SELECT l.* FROM habit_daily_logs l
        JOIN habits h ON h.id = l.habit_id
        WHERE h.user_id = $1
            AND ($2::uuid IS NULL OR l.habit_id = $2)
            AND ($3::date IS NULL OR l.date >= $3)
            AND ($4::date IS NULL OR l.date <= $4)
        ORDER BY l.date DESC, l.id ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(query.habit)
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}

pub async fn create_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<CreateDailyLogRequest>,
) -> AppResult<(StatusCode, Json<HabitDailyLog>)> {
    find_owned_habit(&state.db, body.habit, auth_user.id).await?;

    let log = sqlx::query_as::<_, HabitDailyLog>(
        r#"
        INSERT INTO habit_daily_logs (id, habit_id, date, is_completed)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(body.habit)
    .bind(body.date)
    .bind(body.is_completed)
    .fetch_one(&state.db)
    .await
    .map_err(duplicate_log)?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn get_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<HabitDailyLog>> {
    Ok(Json(find_owned_log(&state.db, log_id, auth_user.id).await?))
}

pub async fn update_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateDailyLogRequest>,
) -> AppResult<Json<HabitDailyLog>> {
    if body.habit.is_none() || body.date.is_none() {
        return Err(AppError::Validation("Both habit and date are required.".into()));
    }
    apply_log_update(&state.db, log_id, auth_user.id, body).await.map(Json)
}

pub async fn patch_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateDailyLogRequest>,
) -> AppResult<Json<HabitDailyLog>> {
    apply_log_update(&state.db, log_id, auth_user.id, body).await.map(Json)
}

async fn apply_log_update(
    db: &PgPool,
    log_id: Uuid,
    user_id: Uuid,
    body: UpdateDailyLogRequest,
) -> AppResult<HabitDailyLog> {
    find_owned_log(db, log_id, user_id).await?;

    // Moving a log is only allowed onto another habit of the same user.
    if let Some(habit_id) = body.habit {
        find_owned_habit(db, habit_id, user_id).await?;
    }

    sqlx::query_as::<_, HabitDailyLog>(
        r#"
        UPDATE habit_daily_logs AS l SET
            habit_id = COALESCE($3, l.habit_id),
            date = COALESCE($4, l.date),
            is_completed = COALESCE($5, l.is_completed)
        FROM habits h
        WHERE l.id = $1 AND h.id = l.habit_id AND h.user_id = $2
        RETURNING l.*
        "#,
    )
    .bind(log_id)
    .bind(user_id)
    .bind(body.habit)
    .bind(body.date)
    .bind(body.is_completed)
    .fetch_optional(db)
    .await
    .map_err(duplicate_log)?
    .ok_or_else(log_not_found)
}

pub async fn delete_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let result = sqlx::query(
        r#"
        DELETE FROM habit_daily_logs l
        USING habits h
        WHERE l.id = $1 AND h.id = l.habit_id AND h.user_id = $2
        "#,
    )
    .bind(log_id)
    .bind(auth_user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(log_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
