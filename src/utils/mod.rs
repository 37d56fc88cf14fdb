//! Utility functions shared across the application.

mod error;
mod format;
pub(crate) mod permissions;
pub mod prompt;
pub mod validation;

pub use error::format_error;
pub use format::{format_size, render_table};
pub use permissions::{create_private_file, file_mode, restrict_file_permissions};
