pub mod daily_log;
pub mod habit;
pub mod user;
