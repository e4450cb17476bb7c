pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, ConnectionSettings, DbPool};
pub use fixtures::{DemoStorefront, SeedResult};
pub use repositories::{InMemoryRepository, SqlRepository};
