//! Repository functions: one function per database operation.
//!
//! Every function takes a sqlx executor (a pool or an open transaction) and
//! returns a `Result<T, DbError>`. No business logic, no domain types: pure SQL.

pub mod schedules;
pub mod alerts;
