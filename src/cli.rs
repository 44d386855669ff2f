//! Command-line surface
//!
//! Interactive runs pick a front-end (line prompts by default, `--tui` for
//! the screen flow). `--non-interactive` builds the whole session record
//! from flags, runs the same validators, and goes straight to the apply
//! pipeline.

use clap::{Parser, ValueEnum};

use crate::error::{Result, SetupError};
use crate::keysource::{self, KeyFetcher, KeySource};
use crate::record::{
    DEFAULT_HOSTNAME, DEFAULT_RUNNER_URL, DEFAULT_TIMEZONE, SetupConfig, WifiSettings,
};
use crate::validate::{
    runner_token_warning, validate_hostname, validate_runner_token, validate_wifi_password,
};

/// How `--ssh-key` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SshMethod {
    /// Fetch keys for a GitHub username
    Github,
    /// The flag value is the key itself
    Direct,
    /// Read the key from a file path
    File,
}

/// NixOS Raspberry Pi post-boot configuration tool
#[derive(Parser)]
#[command(name = "nixpi-setup")]
#[command(about = "Configure SSH keys, CI runner, hostname, timezone, and WiFi on a NixOS Pi")]
#[command(version)]
pub struct Cli {
    /// Run without prompts, taking every answer from flags
    #[arg(long)]
    pub non_interactive: bool,

    /// Use the screen-based front-end instead of line prompts
    #[arg(long)]
    pub tui: bool,

    /// SSH public key, GitHub username, or key file path (see --ssh-method)
    #[arg(long)]
    pub ssh_key: Option<String>,

    /// How to get the SSH key
    #[arg(long, value_enum)]
    pub ssh_method: Option<SshMethod>,

    /// GitHub Actions runner registration token
    #[arg(long)]
    pub runner_token: Option<String>,

    /// GitHub repository URL for the runner
    #[arg(long, default_value = DEFAULT_RUNNER_URL)]
    pub runner_url: String,

    /// System hostname
    #[arg(long, default_value = DEFAULT_HOSTNAME)]
    pub hostname: String,

    /// System timezone
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// WiFi network name
    #[arg(long)]
    pub wifi_ssid: Option<String>,

    /// WiFi password
    #[arg(long)]
    pub wifi_password: Option<String>,

    /// Skip WiFi configuration (removes any existing WiFi artifact)
    #[arg(long)]
    pub skip_wifi: bool,
}

impl Cli {
    /// Build a complete session record from flags, running the same
    /// validators the wizard uses.
    pub fn build_config(&self, fetcher: &dyn KeyFetcher) -> Result<SetupConfig> {
        let mut config = SetupConfig::default();

        if let Some(ssh_key) = &self.ssh_key {
            match self.ssh_method.unwrap_or(SshMethod::Direct) {
                SshMethod::Github => {
                    let keys = keysource::resolve_github(fetcher, ssh_key)?;
                    config.set_ssh_keys(keys);
                    config.ssh_source = KeySource::Github {
                        username: ssh_key.clone(),
                    };
                }
                SshMethod::File => {
                    let blob = keysource::read_key_file(ssh_key)?;
                    let key = keysource::resolve_pasted(&blob)?;
                    config.set_ssh_keys(vec![key]);
                    config.ssh_source = KeySource::File {
                        path: ssh_key.into(),
                    };
                }
                SshMethod::Direct => {
                    let key = keysource::resolve_pasted(ssh_key)?;
                    config.set_ssh_keys(vec![key]);
                    config.ssh_source = KeySource::Pasted;
                }
            }
        }

        if let Some(token) = &self.runner_token {
            validate_runner_token(token)?;
            if let Some(warning) = runner_token_warning(token) {
                tracing::warn!("{warning}");
            }
            config.runner_token = Some(token.trim().to_string());
        }
        if self.runner_url.trim().is_empty() {
            return Err(SetupError::validation("Runner URL must not be empty"));
        }
        config.runner_url = self.runner_url.clone();

        validate_hostname(&self.hostname)?;
        config.hostname = self.hostname.clone();
        if !self.timezone.trim().is_empty() {
            config.timezone = self.timezone.trim().to_string();
        }

        match (&self.wifi_ssid, self.skip_wifi) {
            (Some(ssid), false) => {
                if ssid.trim().is_empty() {
                    return Err(SetupError::validation("WiFi SSID must not be empty"));
                }
                let password = self.wifi_password.clone().unwrap_or_default();
                validate_wifi_password(&password)?;
                config.wifi = WifiSettings {
                    enabled: true,
                    ssid: ssid.trim().to_string(),
                    password,
                };
            }
            // no SSID or an explicit skip both mean "ensure absence"
            _ => config.wifi = WifiSettings::default(),
        }

        // matches the interactive default on the clone offer
        config.clone_config_if_missing = true;

        Ok(config)
    }
}
