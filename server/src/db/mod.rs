//! Database module for PostgreSQL persistence.

mod commits;
mod models;
mod pool;

pub use commits::*;
pub use models::*;
pub use pool::*;
