//! Error formatting utilities.

use crate::error::SshmanError;

/// Format an error in a user-friendly way.
/// Translates the common libssh2 failure texts into readable messages.
pub fn format_error(e: &SshmanError) -> String {
    let msg = e.to_string();
    if !matches!(e, SshmanError::Connection(_)) {
        return msg;
    }

    if msg.contains("Username/PublicKey combination invalid") {
        return "connection error: the server rejected the private key".to_string();
    }
    if msg.contains("Authentication failed") || msg.contains("Unable to authenticate") {
        return "connection error: the server rejected the credentials".to_string();
    }
    if msg.contains("Connection refused") {
        return "connection error: connection refused (is sshd running on that port?)".to_string();
    }
    if msg.contains("Unable to extract public key from private key") {
        return "connection error: the private key could not be parsed".to_string();
    }

    msg
}
