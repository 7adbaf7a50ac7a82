//! Request handlers for models, commits and versions.

mod commits;
mod models;
mod versions;

pub use commits::*;
pub use models::*;
pub use versions::*;
