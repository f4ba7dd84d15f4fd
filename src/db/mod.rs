pub mod pool;

pub use pool::{create_pool, ping, run_migrations};
