//! Input validators for operator-supplied answers
//!
//! Pure, side-effect-free checks. Every rejection carries a one-line,
//! human-readable reason; the wizard re-prompts the same step and never
//! aborts the session on a validation failure.

use crate::error::{Result, SetupError};

/// Recognized SSH public key type identifiers.
///
/// Kept as a versioned table so new key types can be added without touching
/// the validation logic.
pub const SSH_KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ssh-ed25519",
    "ssh-dss",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519",
    "sk-ecdsa-sha2-nistp256",
];

/// Maximum hostname length (RFC 1035 label limit)
pub const HOSTNAME_MAX_LEN: usize = 63;

/// Minimum WPA passphrase length
pub const WIFI_PASSWORD_MIN_LEN: usize = 8;

/// Validate an SSH public key in `<type> <base64-data> [comment]` form.
pub fn validate_ssh_key(key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        return Err(SetupError::validation("SSH key is empty"));
    }

    let mut parts = key.split_whitespace();
    let key_type = parts.next().unwrap_or_default();
    let Some(key_data) = parts.next() else {
        return Err(SetupError::validation(
            "Invalid SSH key format: must have at least type and key data",
        ));
    };

    if !SSH_KEY_TYPES.contains(&key_type) {
        return Err(SetupError::validation(format!(
            "Unsupported SSH key type: {key_type}"
        )));
    }

    if !is_base64_body(key_data) {
        return Err(SetupError::validation(
            "Invalid SSH key data (not valid base64)",
        ));
    }

    Ok(())
}

/// True if `s` matches `[A-Za-z0-9+/]+` followed by at most two `=` padding chars.
fn is_base64_body(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    if body.is_empty() || s.len() - body.len() > 2 {
        return false;
    }
    body.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Validate a GitHub username: non-empty, letters, digits, and dashes only.
pub fn validate_github_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(SetupError::validation("GitHub username is empty"));
    }
    if !username
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(SetupError::validation(format!(
            "Invalid GitHub username: {username}"
        )));
    }
    Ok(())
}

/// Validate a hostname: non-empty, `[A-Za-z0-9-]`, at most 63 characters.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(SetupError::validation("Hostname is empty"));
    }
    if hostname.len() > HOSTNAME_MAX_LEN {
        return Err(SetupError::validation(format!(
            "Hostname must be {HOSTNAME_MAX_LEN} characters or less"
        )));
    }
    if !hostname
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(SetupError::validation(
            "Hostname may only contain letters, digits, and dashes",
        ));
    }
    Ok(())
}

/// Validate a WPA passphrase for a network that is being configured.
pub fn validate_wifi_password(password: &str) -> Result<()> {
    if password.chars().count() < WIFI_PASSWORD_MIN_LEN {
        return Err(SetupError::validation(format!(
            "WiFi password must be at least {WIFI_PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a runner registration token. Only emptiness blocks; shape issues
/// are advisory (see [`runner_token_warning`]).
pub fn validate_runner_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(SetupError::validation("Runner token is required"));
    }
    Ok(())
}

/// Advisory check on runner token shape.
///
/// GitHub registration tokens are opaque, but in practice start with `A` and
/// run well past 20 alphanumeric characters. A mismatch is a warning the
/// operator may proceed past, never a block.
pub fn runner_token_warning(token: &str) -> Option<String> {
    let token = token.trim();
    let looks_right = token.starts_with('A')
        && token.len() >= 20
        && token.bytes().all(|b| b.is_ascii_alphanumeric());
    if looks_right {
        None
    } else {
        Some("Token does not look like a GitHub runner registration token".to_string())
    }
}
