use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::models::daily_log::HabitDailyLog;
use crate::models::habit::{Habit, HabitRequest, HabitWithStatus, PatchHabitRequest};
use crate::AppState;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn habit_not_found() -> AppError {
    AppError::NotFound("Habit not found".into())
}

/// Fetch a habit only if it belongs to `user_id`.
pub(crate) async fn find_owned_habit(
    db: &PgPool,
    habit_id: Uuid,
    user_id: Uuid,
) -> AppResult<Habit> {
    sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = $1 AND user_id = $2")
        .bind(habit_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(habit_not_found)
}

async fn completed_on(db: &PgPool, habit_id: Uuid, date: NaiveDate) -> AppResult<bool> {
    let flag = sqlx::query_scalar::<_, bool>(
        "SELECT is_completed FROM habit_daily_logs WHERE habit_id = $1 AND date = $2",
    )
    .bind(habit_id)
    .bind(date)
    .fetch_optional(db)
    .await?;

    Ok(flag.unwrap_or(false))
}

async fn with_status(db: &PgPool, habit: Habit) -> AppResult<HabitWithStatus> {
    let is_completed = completed_on(db, habit.id, today()).await?;
    Ok(HabitWithStatus::new(habit, is_completed))
}

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<HabitWithStatus>>> {
    let habits = sqlx::query_as::<_, HabitWithStatus>(
        r#"
        SELECT h.*, COALESCE(l.is_completed, false) AS is_completed
        FROM habits h
        LEFT JOIN habit_daily_logs l ON l.habit_id = h.id AND l.date = $2
        WHERE h.user_id = $1
        ORDER BY h.created_at ASC, h.id ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(today())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(habits))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<HabitWithStatus>> {
    let habit = find_owned_habit(&state.db, habit_id, auth_user.id).await?;
    Ok(Json(with_status(&state.db, habit).await?))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<HabitRequest>,
) -> AppResult<(StatusCode, Json<HabitWithStatus>)> {
    body.validate()?;

    // The owner is always the caller; any `user` in the body is ignored.
    let habit = sqlx::query_as::<_, Habit>(
        r#"
        INSERT INTO habits (id, user_id, name, description, frequency, reminder_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(&body.name)
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(&body.frequency)
    .bind(body.reminder_time.flatten())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %auth_user.id, habit_id = %habit.id, "Habit created");

    Ok((StatusCode::CREATED, Json(HabitWithStatus::new(habit, false))))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    AppJson(body): AppJson<HabitRequest>,
) -> AppResult<Json<HabitWithStatus>> {
    body.validate()?;

    let habit = sqlx::query_as::<_, Habit>(
        r#"
        UPDATE habits SET
            name = $3,
            description = COALESCE($4, description),
            frequency = $5,
            reminder_time = CASE WHEN $7 THEN $6 ELSE reminder_time END
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(habit_id)
    .bind(auth_user.id)
    .bind(&body.name)
    .bind(&body.description)
    .bind(&body.frequency)
    .bind(body.reminder_time.flatten())
    .bind(body.reminder_time.is_some())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(habit_not_found)?;

    Ok(Json(with_status(&state.db, habit).await?))
}

pub async fn patch_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    AppJson(body): AppJson<PatchHabitRequest>,
) -> AppResult<Json<HabitWithStatus>> {
    body.validate()?;

    let habit = sqlx::query_as::<_, Habit>(
        r#"
        UPDATE habits SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            frequency = COALESCE($5, frequency),
            reminder_time = CASE WHEN $7 THEN $6 ELSE reminder_time END
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(habit_id)
    .bind(auth_user.id)
    .bind(&body.name)
    .bind(&body.description)
    .bind(&body.frequency)
    .bind(body.reminder_time.flatten())
    .bind(body.reminder_time.is_some())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(habit_not_found)?;

    Ok(Json(with_status(&state.db, habit).await?))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    // Daily logs go with it (ON DELETE CASCADE)
    let result = sqlx::query("DELETE FROM habits WHERE id = $1 AND user_id = $2")
        .bind(habit_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(habit_not_found());
    }

    tracing::info!(user_id = %auth_user.id, habit_id = %habit_id, "Habit deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Flip today's completion flag.
pub async fn toggle_complete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<HabitWithStatus>> {
    let habit = find_owned_habit(&state.db, habit_id, auth_user.id).await?;
    let log = HabitDailyLog::toggle(&state.db, habit.id, today()).await?;

    tracing::debug!(habit_id = %habit.id, is_completed = log.is_completed, "Habit toggled");
    Ok(Json(HabitWithStatus::new(habit, log.is_completed)))
}

/// Mark today as completed; repeated calls leave it completed.
pub async fn complete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<HabitWithStatus>> {
    let habit = find_owned_habit(&state.db, habit_id, auth_user.id).await?;
    let log = HabitDailyLog::mark_complete(&state.db, habit.id, today()).await?;

    Ok(Json(HabitWithStatus::new(habit, log.is_completed)))
}
