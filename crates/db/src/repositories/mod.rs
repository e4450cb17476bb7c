pub mod memory;
pub mod sql;

pub use memory::InMemoryRepository;
pub use sql::SqlRepository;
