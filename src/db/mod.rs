//! Database module for stored SSH profiles.

mod models;
mod repository;
mod schema;

pub use models::{AuthType, Credential, Profile, ProfileInput};
pub use repository::ProfileRepository;
pub use schema::{init_db, prepare_schema};
