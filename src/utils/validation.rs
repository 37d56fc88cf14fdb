//! Input validation for profile fields.

use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;

use crate::error::{Result, SshmanError};

pub const MAX_USER_LEN: usize = 100;
pub const MAX_ALIAS_LEN: usize = 500;

// scheme? (user(:pass)?@)? label(.label)*.tld (:port)? (/path)?
static HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://(?:www\.)?|//|/)?(?:[A-Za-z0-9_-]+(?::[A-Za-z0-9_-]*)?@)?[A-Za-z0-9]+(?:[-.][A-Za-z0-9]+)*\.[A-Za-z]{2,63}(?::[0-9]{1,5})?(?:/.*)?$",
    )
    .expect("host pattern is valid")
});

pub fn validate_user(user: &str) -> Result<()> {
    let len = user.trim().chars().count();
    if len == 0 || len > MAX_USER_LEN {
        return Err(SshmanError::validation(format!(
            "user must be between 1 and {} characters",
            MAX_USER_LEN
        )));
    }
    Ok(())
}

/// Aliases are free text, but a purely numeric alias would be unreachable
/// because numeric identifiers resolve by id.
pub fn validate_alias(alias: &str) -> Result<()> {
    let alias = alias.trim();
    let len = alias.chars().count();
    if len == 0 || len > MAX_ALIAS_LEN {
        return Err(SshmanError::validation(format!(
            "alias must be between 1 and {} characters",
            MAX_ALIAS_LEN
        )));
    }
    if alias.parse::<i64>().is_ok() {
        return Err(SshmanError::validation(
            "alias cannot be a number, numbers are reserved for profile ids",
        ));
    }
    Ok(())
}

pub fn validate_host(host: &str) -> Result<()> {
    let host = host.trim();
    if host.parse::<IpAddr>().is_ok()
        || host.parse::<SocketAddr>().is_ok()
        || host == "localhost"
        || HOST_PATTERN.is_match(host)
    {
        return Ok(());
    }
    Err(SshmanError::validation(format!(
        "'{}' is not a valid IP address or hostname",
        host
    )))
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(SshmanError::validation("password cannot be empty"));
    }
    Ok(())
}
