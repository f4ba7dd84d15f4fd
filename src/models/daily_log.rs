use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HabitDailyLog {
    pub id: Uuid,
    #[serde(rename = "habit")]
    pub habit_id: Uuid,
    pub date: NaiveDate,
    pub is_completed: bool,
}

impl HabitDailyLog {
    /// Flip the flag of the (habit, date) log, creating it first if needed.
    /// A fresh log starts out not completed, so its first flip yields `true`.
    pub async fn toggle(db: &PgPool, habit_id: Uuid, date: NaiveDate) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, HabitDailyLog>(
            r#"
            INSERT INTO habit_daily_logs (id, habit_id, date, is_completed)
            VALUES ($1, $2, $3, true)
            ON CONFLICT (habit_id, date) DO UPDATE
                SET is_completed = NOT habit_daily_logs.is_completed
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(habit_id)
        .bind(date)
        .fetch_one(db)
        .await
    }

    /// Force the (habit, date) log to completed, creating it if needed.
    pub async fn mark_complete(
        db: &PgPool,
        habit_id: Uuid,
        date: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, HabitDailyLog>(
            r#"
            INSERT INTO habit_daily_logs (id, habit_id, date, is_completed)
            VALUES ($1, $2, $3, true)
            ON CONFLICT (habit_id, date) DO UPDATE
                SET is_completed = true
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(habit_id)
        .bind(date)
        .fetch_one(db)
        .await
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDailyLogRequest {
    pub habit: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
}

/// Body of both PUT (all fields expected) and PATCH (any subset).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDailyLogRequest {
    pub habit: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyLogQuery {
    pub habit: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
