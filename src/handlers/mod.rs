pub mod auth;
pub mod daily_logs;
pub mod habits;
pub mod health;
