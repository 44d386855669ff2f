//! SSH key sources
//!
//! Three interchangeable strategies produce a candidate key blob: fetch by
//! GitHub username, direct paste, or read from a file. All of them feed the
//! same validator before anything lands in the session record.
//!
//! The GitHub source filters the response line by line and keeps the valid
//! subset; pasted and file blobs are validated once as a single key. The
//! asymmetry is deliberate and covered by tests in both directions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SetupError};
use crate::validate::{validate_github_username, validate_ssh_key};

/// Base URL for the per-user keys endpoint
pub const GITHUB_KEYS_BASE_URL: &str = "https://github.com";

/// Timeout for the keys fetch
pub const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the staged SSH keys came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeySource {
    Github { username: String },
    Pasted,
    File { path: PathBuf },
    #[default]
    None,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Github { username } => write!(f, "github:{username}"),
            Self::Pasted => write!(f, "pasted key"),
            Self::File { path } => write!(f, "file {}", path.display()),
            Self::None => write!(f, "none"),
        }
    }
}

/// Fetches the raw keys document for a username.
///
/// The wizard talks to this trait so tests can substitute a stub and the
/// engine stays off the network.
pub trait KeyFetcher {
    fn fetch_keys(&self, username: &str) -> Result<String>;
}

/// Live fetcher against the GitHub `.keys` endpoint.
pub struct GithubKeyFetcher {
    base_url: String,
}

impl GithubKeyFetcher {
    pub fn new() -> Self {
        Self {
            base_url: GITHUB_KEYS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for GithubKeyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyFetcher for GithubKeyFetcher {
    fn fetch_keys(&self, username: &str) -> Result<String> {
        let url = format!("{}/{}.keys", self.base_url, username);
        tracing::info!("Fetching SSH keys from {url}");

        let client = reqwest::blocking::Client::builder()
            .timeout(KEY_FETCH_TIMEOUT)
            .build()
            .map_err(|e| SetupError::transport(format!("Failed to build HTTP client: {e}")))?;

        let response = client
            .get(&url)
            .send()
            .map_err(|e| SetupError::transport(format!("Failed to fetch keys from GitHub: {e}")))?;

        if !response.status().is_success() {
            return Err(SetupError::transport(format!(
                "Failed to fetch keys from GitHub: {url} returned {}",
                response.status()
            )));
        }

        response
            .text()
            .map_err(|e| SetupError::transport(format!("Failed to read keys response: {e}")))
    }
}

/// Resolve keys for a GitHub username.
///
/// An empty response body is "no keys for user", distinct from a transport
/// failure. Invalid lines are dropped; a response with no valid line at all
/// is a failure.
pub fn resolve_github(fetcher: &dyn KeyFetcher, username: &str) -> Result<Vec<String>> {
    validate_github_username(username)?;

    let body = fetcher.fetch_keys(username)?;
    if body.trim().is_empty() {
        return Err(SetupError::validation(format!(
            "No SSH keys found for GitHub user: {username}"
        )));
    }

    let keys: Vec<String> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && validate_ssh_key(line).is_ok())
        .map(str::to_string)
        .collect();

    if keys.is_empty() {
        return Err(SetupError::validation(format!(
            "No valid SSH keys in response for GitHub user: {username}"
        )));
    }

    tracing::info!("Resolved {} valid key(s) for {username}", keys.len());
    Ok(keys)
}

/// Resolve a pasted key blob: trimmed and validated once, as a single key.
pub fn resolve_pasted(text: &str) -> Result<String> {
    let key = text.trim();
    validate_ssh_key(key)?;
    Ok(key.to_string())
}

/// Read a key blob from a file, expanding a leading `~`.
///
/// The content comes back unvalidated; callers run it through the same
/// validation as a pasted blob.
pub fn read_key_file(path: &str) -> Result<String> {
    let expanded = expand_home(path);
    if !expanded.exists() {
        return Err(SetupError::validation(format!("File not found: {path}")));
    }

    let content = std::fs::read_to_string(&expanded)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(SetupError::validation(format!("File is empty: {path}")));
    }
    Ok(content.to_string())
}

/// Expand a leading `~` or `~/` to the current home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct StubFetcher {
        // None simulates a transport failure
        body: Option<String>,
    }

    impl StubFetcher {
        fn ok(body: &str) -> Self {
            Self {
                body: Some(body.to_string()),
            }
        }

        fn transport_failure() -> Self {
            Self { body: None }
        }
    }

    impl KeyFetcher for StubFetcher {
        fn fetch_keys(&self, _username: &str) -> Result<String> {
            match &self.body {
                Some(body) => Ok(body.clone()),
                None => Err(SetupError::transport("connection timed out")),
            }
        }
    }

    #[test]
    fn test_github_keeps_valid_subset() {
        let fetcher = StubFetcher::ok(
            "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2\nnot a key at all\n",
        );
        let keys = resolve_github(&fetcher, "alice").unwrap();
        assert_eq!(keys, vec!["ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2"]);
    }

    #[test]
    fn test_github_empty_body_is_no_keys() {
        let fetcher = StubFetcher::ok("\n\n");
        let err = resolve_github(&fetcher, "alice").unwrap_err();
        assert!(err.to_string().contains("No SSH keys found"));
        assert!(matches!(err, SetupError::Validation(_)));
    }

    #[test]
    fn test_github_all_invalid_is_failure() {
        let fetcher = StubFetcher::ok("garbage line\nanother garbage line\n");
        let err = resolve_github(&fetcher, "alice").unwrap_err();
        assert!(err.to_string().contains("No valid SSH keys"));
    }

    #[test]
    fn test_github_transport_failure_is_distinct() {
        let fetcher = StubFetcher::transport_failure();
        let err = resolve_github(&fetcher, "alice").unwrap_err();
        assert!(matches!(err, SetupError::Transport(_)));
    }

    #[test]
    fn test_github_bad_username_never_fetches() {
        let fetcher = StubFetcher::ok("ssh-ed25519 AAAA");
        assert!(resolve_github(&fetcher, "bad.name").is_err());
    }

    #[test]
    fn test_pasted_single_key() {
        let key = resolve_pasted("  ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2  \n").unwrap();
        assert_eq!(key, "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2");
    }

    #[test]
    fn test_pasted_multi_key_blob_rejected() {
        // Two keys in one paste fail single-key validation; the github
        // source would have kept both. Deliberate asymmetry.
        let blob = "ssh-ed25519 AAAA\nssh-rsa BBBB";
        assert!(resolve_pasted(blob).is_err());
    }

    #[test]
    fn test_read_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2").unwrap();
        let content = read_key_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(content, "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2");
    }

    #[test]
    fn test_read_key_file_missing() {
        let err = read_key_file("/definitely/not/here.pub").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_read_key_file_empty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = read_key_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("File is empty"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/keys.pub"), home.join("keys.pub"));
            assert_eq!(expand_home("~"), home);
        }
        assert_eq!(expand_home("/etc/keys.pub"), PathBuf::from("/etc/keys.pub"));
    }

    #[test]
    fn test_key_source_display() {
        let source = KeySource::Github {
            username: "alice".to_string(),
        };
        assert_eq!(source.to_string(), "github:alice");
        assert_eq!(KeySource::None.to_string(), "none");
    }
}
