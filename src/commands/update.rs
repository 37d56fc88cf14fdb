//! Update command handler - editing a stored profile.
//!
//! The profile is unlocked first so the operator sees plaintext defaults.
//! Edits are collected in a [`ProfileChanges`] set and only written when at
//! least one field changed and the operator confirms.

use super::create::{check_alias, choose_auth_type, prompt_credential, warn_weak_kdf};
use super::picker::select_one;
use crate::config::Config;
use crate::credentials::{TerminalPrompt, seal_credential, unlock_profile};
use crate::crypto::{self, VaultKey};
use crate::db::{Credential, Profile, ProfileInput, ProfileRepository};
use crate::error::{Result, SshmanError};
use crate::utils::prompt::{confirm, prompt, prompt_secret, prompt_validated};
use crate::utils::validation::{validate_host, validate_user};

/// Answer that clears the startup command.
const CLEAR_MARKER: &str = "-";

/// Field edits against a stored profile.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    alias: Option<String>,
    host: Option<String>,
    user: Option<String>,
    startup_command: Option<String>,
    /// New plaintext secret.
    credential: Option<Credential>,
    /// Key for sealing a new secret. `None` keeps the key the profile was
    /// unlocked with.
    key: Option<VaultKey>,
    changed: usize,
}

impl ProfileChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields that differ from the stored profile.
    pub fn count(&self) -> usize {
        self.changed
    }

    fn text(slot: &mut Option<String>, changed: &mut usize, current: &str, answer: String) {
        if answer != current {
            *slot = Some(answer);
            *changed += 1;
        }
    }

    pub fn set_alias(&mut self, current: &str, answer: String) {
        Self::text(&mut self.alias, &mut self.changed, current, answer);
    }

    pub fn set_host(&mut self, current: &str, answer: String) {
        Self::text(&mut self.host, &mut self.changed, current, answer);
    }

    pub fn set_user(&mut self, current: &str, answer: String) {
        Self::text(&mut self.user, &mut self.changed, current, answer);
    }

    pub fn set_startup_command(&mut self, current: &str, answer: String) {
        Self::text(&mut self.startup_command, &mut self.changed, current, answer);
    }

    /// Replace the secret. Counts as one change even when the auth type
    /// changes with it.
    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
        self.changed += 1;
    }

    pub fn set_key(&mut self, key: VaultKey) {
        self.key = Some(key);
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Build the record to persist. `stored` is the row as read from the
    /// database, still sealed; `unlock_key` is the key that opened it.
    pub fn apply(self, stored: &Profile, unlock_key: Option<&VaultKey>) -> Result<ProfileInput> {
        let mut input = stored.to_input();
        if let Some(alias) = self.alias {
            input.alias = alias;
        }
        if let Some(host) = self.host {
            input.host = host;
        }
        if let Some(user) = self.user {
            input.user = user;
        }
        if let Some(command) = self.startup_command {
            input.startup_command = command;
        }

        if let Some(credential) = self.credential {
            input.credential = if stored.encrypted {
                let key = self.key.as_ref().or(unlock_key).ok_or_else(|| {
                    SshmanError::Other(format!("no key available to seal '{}'", stored.alias))
                })?;
                seal_credential(&credential, key)?
            } else {
                credential
            };
        }
        Ok(input)
    }
}

/// Ask for a replacement passphrase. Empty keeps the current key.
fn prompt_replacement_key(masked: bool) -> Result<Option<VaultKey>> {
    loop {
        let first = prompt_secret(
            "New encryption passphrase (empty keeps the current one)",
            masked,
        )?;
        if first.is_empty() {
            return Ok(None);
        }
        let second = prompt_secret("Confirm passphrase", masked)?;
        if first == second {
            return Ok(Some(crypto::derive_key(&first)));
        }
        eprintln!("  Passphrases do not match");
    }
}

fn collect_changes(
    repo: &ProfileRepository,
    working: &Profile,
    sealed: bool,
    masked: bool,
) -> Result<ProfileChanges> {
    let mut changes = ProfileChanges::new();

    let alias = prompt_validated("Alias", Some(&working.alias), |a| {
        check_alias(repo, a, Some(&working.alias))
    })?;
    changes.set_alias(&working.alias, alias);

    let user = prompt_validated("User", Some(&working.user), validate_user)?;
    changes.set_user(&working.user, user);

    let host = prompt_validated("Host/IP", Some(&working.host), validate_host)?;
    changes.set_host(&working.host, host);

    let auth_type = choose_auth_type(working.auth_type())?;
    let switched = auth_type != working.auth_type();
    if let Some(credential) = prompt_credential(auth_type, masked, !switched)? {
        changes.set_credential(credential);
    }

    let startup = prompt(
        &format!("Startup command ('{}' clears it)", CLEAR_MARKER),
        Some(&working.startup_command),
    )?;
    let startup = if startup == CLEAR_MARKER {
        String::new()
    } else {
        startup
    };
    changes.set_startup_command(&working.startup_command, startup);

    if changes.has_credential() && sealed {
        warn_weak_kdf();
        if let Some(key) = prompt_replacement_key(masked)? {
            changes.set_key(key);
        }
    }

    Ok(changes)
}

/// Handle the update command
pub async fn handle_update(
    config: &Config,
    repo: &ProfileRepository,
    identifier: Option<String>,
) -> Result<()> {
    let Some(stored) = select_one(repo, identifier.as_deref()).await? else {
        return Ok(());
    };

    let mut working = stored.clone();
    let mut prompt = TerminalPrompt::new(config.mask_input());
    let outcome = unlock_profile(&mut working, &mut prompt, config.decryption_retries())?;

    println!("Editing profile {} (press Enter to keep a value)", stored.id);
    let changes = collect_changes(repo, &working, stored.encrypted, config.mask_input())?;

    if changes.count() == 0 {
        println!("No changes.");
        return Ok(());
    }
    if !confirm(&format!("Save {} change(s)?", changes.count()))? {
        println!("Cancelled.");
        return Ok(());
    }

    let input = changes.apply(&stored, outcome.key())?;
    let updated = repo.update(stored.id, &input)?;
    tracing::info!(id = updated.id, alias = %updated.alias, "profile updated");
    println!("Updated profile {} ({})", updated.id, updated.alias);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::open_credential;
    use chrono::Utc;

    fn stored(encrypted: bool, key: &VaultKey) -> Profile {
        let plain = Credential::Password("old".into());
        Profile {
            id: 3,
            alias: "web".into(),
            host: "10.0.0.1".into(),
            user: "root".into(),
            credential: if encrypted {
                seal_credential(&plain, key).unwrap()
            } else {
                plain
            },
            encrypted,
            startup_command: "uptime".into(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn test_unchanged_answers_are_not_counted() {
        let key = crypto::derive_key("k");
        let p = stored(false, &key);
        let mut changes = ProfileChanges::new();
        changes.set_alias(&p.alias, "web".into());
        changes.set_host(&p.host, "10.0.0.1".into());
        changes.set_startup_command(&p.startup_command, "uptime".into());
        assert_eq!(changes.count(), 0);

        changes.set_user(&p.user, "deploy".into());
        changes.set_startup_command(&p.startup_command, String::new());
        assert_eq!(changes.count(), 2);

        let input = changes.apply(&p, None).unwrap();
        assert_eq!(input.user, "deploy");
        assert_eq!(input.startup_command, "");
        assert_eq!(input.alias, "web");
        assert_eq!(input.created_at, Some(p.created_at));
    }

    #[test]
    fn test_untouched_secret_keeps_stored_ciphertext() {
        let key = crypto::derive_key("k");
        let p = stored(true, &key);
        let mut changes = ProfileChanges::new();
        changes.set_host(&p.host, "example.com".into());
        let input = changes.apply(&p, Some(&key)).unwrap();
        assert_eq!(input.credential, p.credential);
        assert!(input.encrypted);
    }

    #[test]
    fn test_new_secret_is_sealed_with_unlock_key() {
        let key = crypto::derive_key("k");
        let p = stored(true, &key);
        let mut changes = ProfileChanges::new();
        changes.set_credential(Credential::Password("new".into()));
        let input = changes.apply(&p, Some(&key)).unwrap();
        assert!(input.encrypted);
        assert_eq!(
            open_credential(&input.credential, &key).unwrap(),
            Credential::Password("new".into())
        );
    }

    #[test]
    fn test_new_secret_with_replacement_key() {
        let old = crypto::derive_key("old");
        let new = crypto::derive_key("new");
        let p = stored(true, &old);
        let mut changes = ProfileChanges::new();
        changes.set_credential(Credential::PrivateKey(b"PEM".to_vec()));
        changes.set_key(new.clone());
        let input = changes.apply(&p, Some(&old)).unwrap();
        assert!(open_credential(&input.credential, &old).is_err());
        assert_eq!(
            open_credential(&input.credential, &new).unwrap(),
            Credential::PrivateKey(b"PEM".to_vec())
        );
    }

    #[test]
    fn test_plaintext_profile_stores_new_secret_as_is() {
        let key = crypto::derive_key("k");
        let p = stored(false, &key);
        let mut changes = ProfileChanges::new();
        changes.set_credential(Credential::Password("new".into()));
        let input = changes.apply(&p, None).unwrap();
        assert_eq!(input.credential, Credential::Password("new".into()));
        assert!(!input.encrypted);
    }
}
