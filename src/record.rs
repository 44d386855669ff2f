//! Session configuration record
//!
//! The single accumulator for one provisioning session. It is created empty,
//! filled in step by step by the wizard (or directly from CLI flags), read
//! by the apply pipeline, and discarded at process exit. Nothing persists
//! across runs.

use std::collections::HashMap;

use crate::keysource::KeySource;
use crate::wizard::StepId;

/// Default hostname applied when the operator skips the hostname step
pub const DEFAULT_HOSTNAME: &str = "pi4-smoke-test";

/// Default timezone applied when the operator skips the timezone step
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Default runner repository URL, also the host configuration template repo
pub const DEFAULT_RUNNER_URL: &str = "https://github.com/denysvitali/nix-hil-rpi";

/// WiFi answer collected by the wizard.
///
/// `enabled == true` implies a non-empty SSID and a passphrase of at least
/// eight characters; the wizard enforces this before it ever stores the
/// value here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiSettings {
    pub enabled: bool,
    pub ssid: String,
    pub password: String,
}

/// All validated answers for one provisioning session.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Where the SSH keys came from
    pub ssh_source: KeySource,
    /// Validated key lines, unique by exact text, in discovery order.
    /// Empty means "skip SSH".
    pub ssh_keys: Vec<String>,
    /// Runner registration token; never logged or displayed unmasked
    pub runner_token: Option<String>,
    pub runner_url: String,
    pub hostname: String,
    pub timezone: String,
    pub wifi: WifiSettings,
    /// Whether the rebuild stage may materialize a configuration from the
    /// template repository when no configuration root exists. Decided at
    /// the summary step, before the pipeline starts.
    pub clone_config_if_missing: bool,
    /// Last validation failure per step, for display only
    pub step_errors: HashMap<StepId, String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            ssh_source: KeySource::None,
            ssh_keys: Vec::new(),
            runner_token: None,
            runner_url: DEFAULT_RUNNER_URL.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            wifi: WifiSettings::default(),
            clone_config_if_missing: false,
            step_errors: HashMap::new(),
        }
    }
}

impl SetupConfig {
    /// Replace the staged keys, dropping duplicates while keeping discovery order.
    pub fn set_ssh_keys(&mut self, keys: Vec<String>) {
        self.ssh_keys.clear();
        for key in keys {
            if !self.ssh_keys.contains(&key) {
                self.ssh_keys.push(key);
            }
        }
    }

    /// Masked display form of the runner token
    pub fn masked_token(&self) -> String {
        match &self.runner_token {
            Some(token) => mask_secret(token),
            None => "not set".to_string(),
        }
    }

    /// Rows for the summary screen, shared by both front-ends
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        vec![
            (
                "SSH keys".to_string(),
                if self.ssh_keys.is_empty() {
                    "not configured".to_string()
                } else {
                    format!("{} key(s) via {}", self.ssh_keys.len(), self.ssh_source)
                },
            ),
            ("Runner token".to_string(), self.masked_token()),
            ("Runner URL".to_string(), self.runner_url.clone()),
            ("Hostname".to_string(), self.hostname.clone()),
            ("Timezone".to_string(), self.timezone.clone()),
            (
                "WiFi".to_string(),
                if self.wifi.enabled {
                    self.wifi.ssid.clone()
                } else {
                    "not configured".to_string()
                },
            ),
        ]
    }
}

/// Mask a secret for display: asterisks, at most eight of them.
pub fn mask_secret(secret: &str) -> String {
    "*".repeat(secret.chars().count().min(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SetupConfig::default();
        assert_eq!(config.hostname, DEFAULT_HOSTNAME);
        assert_eq!(config.timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.runner_url, DEFAULT_RUNNER_URL);
        assert!(config.ssh_keys.is_empty());
        assert!(!config.wifi.enabled);
    }

    #[test]
    fn test_set_ssh_keys_deduplicates_in_order() {
        let mut config = SetupConfig::default();
        config.set_ssh_keys(vec![
            "ssh-ed25519 AAAA".to_string(),
            "ssh-rsa BBBB".to_string(),
            "ssh-ed25519 AAAA".to_string(),
        ]);
        assert_eq!(config.ssh_keys, vec!["ssh-ed25519 AAAA", "ssh-rsa BBBB"]);
    }

    #[test]
    fn test_masked_token_never_leaks() {
        let mut config = SetupConfig::default();
        assert_eq!(config.masked_token(), "not set");

        config.runner_token = Some("AAAAAAAAAAsecretAAAA".to_string());
        let masked = config.masked_token();
        assert_eq!(masked, "********");
        assert!(!masked.contains("secret"));

        config.runner_token = Some("abc".to_string());
        assert_eq!(config.masked_token(), "***");
    }

    #[test]
    fn test_summary_rows_cover_every_setting() {
        let config = SetupConfig::default();
        let rows = config.summary_rows();
        let labels: Vec<&str> = rows
            .iter()
            .map(|(label, _)| label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                "SSH keys",
                "Runner token",
                "Runner URL",
                "Hostname",
                "Timezone",
                "WiFi"
            ]
        );
    }
}
