//! Database initialization, migrations and transaction helpers

pub mod init;
pub mod migrations;
pub mod monitor;
pub mod retry;

pub use init::{connect, create_schema, init_database};
pub use migrations::run_migrations;
pub use monitor::{begin_monitored, MonitoredTransaction};
pub use retry::retry_on_lock;
