//! File transfer between the local machine and a profile's host.
//!
//! Exactly one of the two arguments names a profile, as `profile:path`.
//! That side decides the direction.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::db::Profile;
use crate::error::{Result, SshmanError};
use crate::session::Transport;
use crate::utils::file_mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

/// A `profile:path` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    pub profile: String,
    pub path: String,
}

/// Split on the first colon. Anything without two non-empty halves is a
/// local path.
pub fn parse_remote(arg: &str) -> Option<RemoteSpec> {
    let (profile, path) = arg.split_once(':')?;
    if profile.is_empty() || path.is_empty() {
        return None;
    }
    Some(RemoteSpec {
        profile: profile.to_string(),
        path: path.to_string(),
    })
}

/// A resolved transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub direction: Direction,
    /// Profile id or alias, as given.
    pub profile: String,
    pub local: PathBuf,
    pub remote: String,
}

/// Work out direction and paths from the two command-line arguments.
pub fn resolve(from: &str, to: &str) -> Result<TransferPlan> {
    match (parse_remote(from), parse_remote(to)) {
        (Some(source), None) => Ok(TransferPlan {
            direction: Direction::Download,
            profile: source.profile,
            local: PathBuf::from(to),
            remote: source.path,
        }),
        (None, Some(dest)) => {
            let local = PathBuf::from(from);
            let mut remote = dest.path;
            if remote.ends_with('/')
                && let Some(name) = local.file_name()
            {
                remote.push_str(&name.to_string_lossy());
            }
            Ok(TransferPlan {
                direction: Direction::Upload,
                profile: dest.profile,
                local,
                remote,
            })
        }
        (Some(_), Some(_)) => Err(SshmanError::invalid_transfer(
            "only one of source and destination may name a profile",
        )),
        (None, None) => Err(SshmanError::invalid_transfer(
            "either source or destination must name a profile (format: profile:path)",
        )),
    }
}

/// Authenticate with the unlocked `profile` and copy the file. Returns the
/// number of bytes transferred. A partially written destination is left as is.
pub fn execute(
    plan: &TransferPlan,
    profile: &Profile,
    transport: &mut dyn Transport,
) -> Result<u64> {
    if plan.direction == Direction::Upload && !plan.local.is_file() {
        return Err(SshmanError::validation(format!(
            "local file does not exist: {}",
            plan.local.display()
        )));
    }

    transport.authenticate(profile)?;
    let result = copy(plan, transport);
    transport.disconnect();
    result
}

fn copy(plan: &TransferPlan, transport: &mut dyn Transport) -> Result<u64> {
    let remote = Path::new(&plan.remote);
    match plan.direction {
        Direction::Upload => {
            let mut file = File::open(&plan.local)?;
            let metadata = file.metadata()?;
            tracing::info!(
                local = %plan.local.display(),
                remote = %plan.remote,
                bytes = metadata.len(),
                "uploading"
            );
            transport.upload(&mut file, remote, file_mode(&metadata), metadata.len())
        }
        Direction::Download => {
            tracing::info!(remote = %plan.remote, local = %plan.local.display(), "downloading");
            let mut file = File::create(&plan.local)?;
            transport.download(remote, &mut file)
        }
    }
}
