//! Command handlers for the sshman CLI.
//!
//! One handler per subcommand. Handlers print to the terminal and return
//! errors to `main`, which reports them.

mod config_cmd;
mod connect;
mod create;
mod delete;
mod export_import;
mod list;
mod picker;
mod transfer;
mod update;

pub use config_cmd::handle_config;
pub use connect::handle_connect;
pub use create::handle_new;
pub use delete::handle_delete;
pub use export_import::{handle_export, handle_import, read_profiles, write_profiles};
pub use list::handle_list;
pub use picker::{select_many, select_one};
pub use transfer::handle_transfer;
pub use update::{ProfileChanges, handle_update};
