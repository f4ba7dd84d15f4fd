use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub frequency: String,
    #[serde(with = "time_of_day")]
    pub reminder_time: Option<NaiveTime>,
}

/// A habit together with today's completion flag.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HabitWithStatus {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub habit: Habit,
    pub is_completed: bool,
}

impl HabitWithStatus {
    pub fn new(habit: Habit, is_completed: bool) -> Self {
        Self {
            habit,
            is_completed,
        }
    }
}

/// POST /api/habits/ and PUT /api/habits/{id}/. On PUT, omitted optional
/// fields keep their stored values.
#[derive(Debug, Deserialize, Validate)]
pub struct HabitRequest {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 255, message = "Name must be 1-255 characters")
    )]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 50, message = "Frequency must be 1-50 characters")
    )]
    pub frequency: Option<String>,
    /// Outer `None`: key absent. `Some(None)`: explicit null.
    #[serde(default, deserialize_with = "time_of_day::deserialize_present")]
    pub reminder_time: Option<Option<NaiveTime>>,
}

/// PATCH /api/habits/{id}/
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchHabitRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Frequency must be 1-50 characters"))]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "time_of_day::deserialize_present")]
    pub reminder_time: Option<Option<NaiveTime>>,
}

/// `HH:MM:SS` on output; `HH:MM`, `HH:MM:SS` and fractional seconds on input.
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const OUTPUT_FORMAT: &str = "%H:%M:%S";
    const INPUT_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(OUTPUT_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid time of day: {s}"))),
        }
    }

    /// For update bodies: a present key yields `Some`, even when it is null.
    pub fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<NaiveTime>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer).map(Some)
    }

    pub fn parse(s: &str) -> Option<NaiveTime> {
        INPUT_FORMATS
            .iter()
            .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_habit() -> Habit {
        Habit {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Morning exercise".into(),
            description: "30 minutes of exercise".into(),
            created_at: Utc::now(),
            frequency: "daily".into(),
            reminder_time: NaiveTime::from_hms_opt(7, 0, 0),
        }
    }

    #[test]
    fn test_habit_with_status_shape() {
        let habit = sample_habit();
        let owner = habit.user_id;
        let json = serde_json::to_value(HabitWithStatus::new(habit, false)).unwrap();

        assert_eq!(json["user"], json!(owner));
        assert_eq!(json["name"], "Morning exercise");
        assert_eq!(json["frequency"], "daily");
        assert_eq!(json["reminder_time"], "07:00:00");
        assert_eq!(json["is_completed"], false);
        assert!(json.get("user_id").is_none());
        assert!(json.get("habit").is_none());
    }

    #[test]
    fn test_null_reminder_time_serializes_as_null() {
        let mut habit = sample_habit();
        habit.reminder_time = None;
        let json = serde_json::to_value(&habit).unwrap();
        assert!(json["reminder_time"].is_null());
    }

    #[test]
    fn test_create_request_accepts_short_time() {
        let req: HabitRequest = serde_json::from_value(json!({
            "name": "Read",
            "frequency": "daily",
            "reminder_time": "21:30"
        }))
        .unwrap();
        assert_eq!(req.reminder_time, Some(NaiveTime::from_hms_opt(21, 30, 0)));
        assert!(req.description.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_bad_time() {
        let res = serde_json::from_value::<HabitRequest>(json!({
            "name": "Read",
            "frequency": "daily",
            "reminder_time": "25:99"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_create_request_requires_name_and_frequency() {
        let req: HabitRequest = serde_json::from_value(json!({ "description": "x" })).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("frequency"));
    }

    #[test]
    fn test_create_request_rejects_long_frequency() {
        let req: HabitRequest = serde_json::from_value(json!({
            "name": "Read",
            "frequency": "x".repeat(51),
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_patch_request_is_all_optional() {
        let req: PatchHabitRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_ok());

        let req: PatchHabitRequest = serde_json::from_value(json!({ "name": "" })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_patch_request_distinguishes_null_from_absent() {
        let absent: PatchHabitRequest = serde_json::from_value(json!({ "name": "Read" })).unwrap();
        assert_eq!(absent.reminder_time, None);

        let cleared: PatchHabitRequest =
            serde_json::from_value(json!({ "reminder_time": null })).unwrap();
        assert_eq!(cleared.reminder_time, Some(None));

        let set: PatchHabitRequest =
            serde_json::from_value(json!({ "reminder_time": "07:00" })).unwrap();
        assert_eq!(set.reminder_time, Some(NaiveTime::from_hms_opt(7, 0, 0)));
    }

    #[test]
    fn test_owner_in_body_is_ignored() {
        let req: HabitRequest = serde_json::from_value(json!({
            "user": Uuid::new_v4(),
            "name": "Read",
            "frequency": "weekly",
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }
}
