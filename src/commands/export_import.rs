//! Export and import command handlers - profiles as CSV.
//!
//! The file has one header row and eight columns:
//! `Id, Alias, User, Host/IP, Auth Type, Authentication, Encrypted, Created At`.
//! `Encrypted` is `+` or `-` and dates are `DD.MM.YYYY`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::picker::select_many;
use crate::config::Config;
use crate::credentials::{TerminalPrompt, unlock_profiles};
use crate::db::{AuthType, Credential, Profile, ProfileInput, ProfileRepository};
use crate::error::{Result, SshmanError};
use crate::utils::create_private_file;
use crate::utils::validation::{validate_alias, validate_host, validate_user};

const DATE_FORMAT: &str = "%d.%m.%Y";
const COLUMNS: usize = 8;

#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Alias")]
    alias: &'a str,
    #[serde(rename = "User")]
    user: &'a str,
    #[serde(rename = "Host/IP")]
    host: &'a str,
    #[serde(rename = "Auth Type")]
    auth_type: &'a str,
    #[serde(rename = "Authentication")]
    secret: String,
    #[serde(rename = "Encrypted")]
    encrypted: &'a str,
    #[serde(rename = "Created At")]
    created_at: String,
}

impl<'a> From<&'a Profile> for ExportRecord<'a> {
    fn from(profile: &'a Profile) -> Self {
        ExportRecord {
            id: profile.id,
            alias: &profile.alias,
            user: &profile.user,
            host: &profile.host,
            auth_type: profile.auth_type().name(),
            secret: String::from_utf8_lossy(profile.credential.as_bytes()).into_owned(),
            encrypted: if profile.encrypted { "+" } else { "-" },
            created_at: profile.created_at.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Write `profiles` as CSV, header first.
pub fn write_profiles<W: Write>(writer: W, profiles: &[Profile]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for profile in profiles {
        csv.serialize(ExportRecord::from(profile))?;
    }
    csv.flush()?;
    Ok(())
}

fn parse_record(record: &csv::StringRecord) -> Result<ProfileInput> {
    let field = |i: usize| record.get(i).unwrap_or_default().trim();

    let auth_type = AuthType::from_name(field(4))?;
    // Secrets are kept byte for byte: PEM keys end in a newline
    let secret = record.get(5).unwrap_or_default().to_string();
    let credential = match auth_type {
        AuthType::Password => Credential::Password(secret),
        AuthType::PrivateKey => Credential::PrivateKey(secret.into_bytes()),
    };
    let created_at = NaiveDate::parse_from_str(field(7), DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| SshmanError::validation(format!("malformed date '{}'", field(7))))?;

    Ok(ProfileInput {
        alias: field(1).to_string(),
        user: field(2).to_string(),
        host: field(3).to_string(),
        credential,
        encrypted: field(6) == "+",
        startup_command: String::new(),
        created_at: Some(created_at),
    })
}

/// Parse an export file into profile records, each tagged with its line
/// number. The header and rows with fewer than eight columns are skipped.
/// An unknown auth type or a malformed date aborts the whole parse.
pub fn read_profiles<R: Read>(reader: R) -> Result<Vec<(u64, ProfileInput)>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = Vec::new();
    for record in csv.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() < COLUMNS {
            tracing::debug!(line, columns = record.len(), "skipping short row");
            continue;
        }
        let input = parse_record(&record)
            .map_err(|e| SshmanError::validation(format!("line {}: {}", line, e)))?;
        parsed.push((line, input));
    }
    Ok(parsed)
}

fn default_export_path() -> PathBuf {
    PathBuf::from(format!("{}.csv", Utc::now().timestamp()))
}

/// Handle the export command - write the selected profiles to a CSV file
pub async fn handle_export(
    config: &Config,
    repo: &ProfileRepository,
    identifier: Option<String>,
    decrypt: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut profiles = select_many(repo, identifier.as_deref()).await?;
    if profiles.is_empty() {
        println!("Nothing selected.");
        return Ok(());
    }

    if decrypt {
        let mut prompt = TerminalPrompt::new(config.mask_input());
        unlock_profiles(&mut profiles, &mut prompt, config.decryption_retries())?;
        eprintln!("Warning: the export contains plaintext secrets");
    }

    let path = output.unwrap_or_else(default_export_path);
    let file = create_private_file(&path)?;
    write_profiles(file, &profiles)?;

    tracing::info!(
        count = profiles.len(),
        decrypted = decrypt,
        path = %path.display(),
        "profiles exported"
    );
    println!("Exported {} profile(s) to {}", profiles.len(), path.display());
    Ok(())
}

fn import_row(repo: &ProfileRepository, input: &ProfileInput) -> Result<Profile> {
    validate_alias(&input.alias)?;
    validate_user(&input.user)?;
    validate_host(&input.host)?;
    repo.create(input)
}

/// Handle the import command - create one profile per CSV row
pub fn handle_import(repo: &ProfileRepository, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(SshmanError::not_found(format!(
            "import file not found: {}",
            path.display()
        )));
    }

    let rows = read_profiles(File::open(path)?)?;
    let total = rows.len();
    let mut failed = 0;

    for (line, input) in rows {
        match import_row(repo, &input) {
            Ok(profile) => {
                tracing::info!(id = profile.id, alias = %profile.alias, line, "profile imported");
                println!("  imported {} ({})", profile.alias, profile.id);
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(line, error = %e, "row not imported");
                eprintln!("  line {}: {}", line, e);
            }
        }
    }

    println!("Imported {} of {} profile(s)", total - failed, total);
    if failed > 0 {
        return Err(SshmanError::Other(format!(
            "{} of {} row(s) could not be imported",
            failed, total
        )));
    }
    Ok(())
}
