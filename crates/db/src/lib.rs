//! `db` crate: pure persistence layer.
//!
//! Provides a connection pool, typed row structs, repository functions for
//! the schedule tables, and the store traits the engine is written against.
//! No business logic lives here.

pub mod error;
pub mod pool;
pub mod repository;
pub mod models;
pub mod store;
pub mod pg;
pub mod memory;

pub use pool::DbPool;
pub use error::DbError;
pub use store::{AlertStore, ScheduleStore};
pub use pg::PgStore;
pub use memory::MemoryStore;
