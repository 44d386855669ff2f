//! Wizard sequencer
//!
//! The navigation state machine both front-ends drive. The engine issues a
//! [`StepPrompt`] describing what to ask, accepts a [`StepInput`] with the
//! answer, and reports accept/reject plus a reason. Front-ends only
//! translate between this interface and their interaction model; every
//! validation rule and transition lives here.
//!
//! # Step Flow
//!
//! ```text
//! Welcome -> SshMethod -> {SshGithub | SshPaste | SshFile} -> Runner
//!         -> Hostname -> Timezone -> [Wifi] -> Summary -> apply
//! ```
//!
//! The WiFi step only exists when the host probe reported a wireless
//! interface. Going back follows the traversal history (a stack, not a
//! fixed predecessor table, because the SSH sub-steps and the conditional
//! WiFi step make predecessors non-uniform).

use std::path::PathBuf;

use crate::apply::rebuild::CONFIG_TEMPLATE_REPO;
use crate::keysource::{self, KeyFetcher, KeySource};
use crate::probe::HostProbe;
use crate::record::SetupConfig;
use crate::record::WifiSettings;
use crate::validate::{
    runner_token_warning, validate_hostname, validate_runner_token, validate_wifi_password,
};

/// Unique identifier for each wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Welcome,
    SshMethod,
    SshGithub,
    SshPaste,
    SshFile,
    Runner,
    Hostname,
    Timezone,
    Wifi,
    Summary,
}

impl StepId {
    pub fn title(self) -> &'static str {
        match self {
            Self::Welcome => "NixOS Raspberry Pi Post-Boot Configuration",
            Self::SshMethod => "SSH Key Configuration",
            Self::SshGithub => "SSH Key from GitHub",
            Self::SshPaste => "SSH Key Paste",
            Self::SshFile => "SSH Key from File",
            Self::Runner => "GitHub Actions Runner",
            Self::Hostname => "Hostname",
            Self::Timezone => "Timezone",
            Self::Wifi => "WiFi Configuration",
            Self::Summary => "Configuration Summary",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::SshMethod | Self::SshGithub | Self::SshPaste | Self::SshFile => "SSH",
            Self::Runner => "Runner",
            Self::Hostname => "Hostname",
            Self::Timezone => "Timezone",
            Self::Wifi => "WiFi",
            Self::Summary => "Summary",
        }
    }
}

/// One selectable entry of a menu prompt
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub label: &'static str,
}

/// One field of a form prompt
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub label: &'static str,
    pub secret: bool,
    pub default: Option<String>,
}

/// What the engine wants the front-end to ask next.
#[derive(Debug, Clone)]
pub enum StepPrompt {
    /// Informational screen; any acknowledgement continues
    Intro {
        title: &'static str,
        body: Vec<&'static str>,
    },
    /// Pick exactly one entry
    Menu {
        title: &'static str,
        entries: Vec<MenuEntry>,
    },
    /// Single line of text
    Text {
        title: &'static str,
        label: &'static str,
        default: Option<String>,
        secret: bool,
        skippable: bool,
        hint: Option<String>,
        suggestions: Vec<String>,
    },
    /// Free-form multi-line text (key paste)
    MultiLine {
        title: &'static str,
        label: &'static str,
    },
    /// Several fields collected together
    Form {
        title: &'static str,
        fields: Vec<FieldSpec>,
    },
    /// Yes/no question
    Confirm {
        title: &'static str,
        question: String,
        default_yes: bool,
    },
    /// Review screen with explicit confirmation
    Summary {
        title: &'static str,
        rows: Vec<(String, String)>,
        question: &'static str,
    },
}

/// The answer a front-end hands back to the engine.
#[derive(Debug, Clone)]
pub enum StepInput {
    Choice(usize),
    Text(String),
    Lines(String),
    Form(Vec<String>),
    Yes,
    No,
    Back,
    Skip,
    Cancel,
}

/// What happened to a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Rejected; the same step re-displays with `last_error`
    Stay,
    /// Accepted; the current step changed
    Moved,
    /// The record is complete and confirmed; run the pipeline
    ReadyToApply,
    /// Session ends without applying anything
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WifiPhase {
    Choice,
    Credentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryPhase {
    Confirmation,
    CloneOffer,
}

/// The navigation state machine. Owns the session record until the apply
/// pipeline takes over.
pub struct Wizard {
    config: SetupConfig,
    probe: HostProbe,
    fetcher: Box<dyn KeyFetcher>,
    step: StepId,
    history: Vec<StepId>,
    wifi_phase: WifiPhase,
    summary_phase: SummaryPhase,
    last_error: Option<String>,
    last_warning: Option<String>,
}

impl Wizard {
    pub fn new(probe: HostProbe, fetcher: Box<dyn KeyFetcher>) -> Self {
        Self {
            config: SetupConfig::default(),
            probe,
            fetcher,
            step: StepId::Welcome,
            history: Vec::new(),
            wifi_phase: WifiPhase::Choice,
            summary_phase: SummaryPhase::Confirmation,
            last_error: None,
            last_warning: None,
        }
    }

    pub fn current_step(&self) -> StepId {
        self.step
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Consume the wizard once `ReadyToApply` has been returned.
    pub fn into_config(self) -> SetupConfig {
        self.config
    }

    /// Reason the last submission was rejected
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Advisory note attached to the last accepted submission
    pub fn last_warning(&self) -> Option<&str> {
        self.last_warning.as_deref()
    }

    pub fn timezones(&self) -> &[String] {
        &self.probe.timezones
    }

    /// Describe what to ask for the current step.
    pub fn prompt(&self) -> StepPrompt {
        match self.step {
            StepId::Welcome => StepPrompt::Intro {
                title: self.step.title(),
                body: vec![
                    "This tool will configure your NixOS Raspberry Pi:",
                    "SSH access, a GitHub Actions runner, hostname, timezone,",
                    "and optional WiFi. Nothing is written until you confirm",
                    "the summary at the end.",
                ],
            },
            StepId::SshMethod => StepPrompt::Menu {
                title: self.step.title(),
                entries: vec![
                    MenuEntry {
                        label: "Fetch from GitHub username",
                    },
                    MenuEntry {
                        label: "Paste public key directly",
                    },
                    MenuEntry {
                        label: "Load from file",
                    },
                    MenuEntry {
                        label: "Skip (not recommended)",
                    },
                ],
            },
            StepId::SshGithub => StepPrompt::Text {
                title: self.step.title(),
                label: "GitHub username",
                default: None,
                secret: false,
                skippable: false,
                hint: None,
                suggestions: Vec::new(),
            },
            StepId::SshPaste => StepPrompt::MultiLine {
                title: self.step.title(),
                label: "Paste your SSH public key",
            },
            StepId::SshFile => StepPrompt::Text {
                title: self.step.title(),
                label: "Key file path",
                default: None,
                secret: false,
                skippable: false,
                hint: Some("A leading ~ expands to your home directory".to_string()),
                suggestions: Vec::new(),
            },
            StepId::Runner => StepPrompt::Form {
                title: self.step.title(),
                fields: vec![
                    FieldSpec {
                        label: "Runner registration token",
                        secret: true,
                        default: None,
                    },
                    FieldSpec {
                        label: "Runner URL",
                        secret: false,
                        default: Some(self.config.runner_url.clone()),
                    },
                ],
            },
            StepId::Hostname => StepPrompt::Text {
                title: self.step.title(),
                label: "Hostname",
                default: Some(self.config.hostname.clone()),
                secret: false,
                skippable: true,
                hint: None,
                suggestions: Vec::new(),
            },
            StepId::Timezone => StepPrompt::Text {
                title: self.step.title(),
                label: "Timezone",
                default: Some(self.config.timezone.clone()),
                secret: false,
                skippable: true,
                hint: Some("Common timezones: UTC, Europe/Zurich, America/New_York".to_string()),
                suggestions: self.probe.timezones.clone(),
            },
            StepId::Wifi => match self.wifi_phase {
                WifiPhase::Choice => StepPrompt::Confirm {
                    title: self.step.title(),
                    question: "Configure WiFi?".to_string(),
                    default_yes: false,
                },
                WifiPhase::Credentials => StepPrompt::Form {
                    title: self.step.title(),
                    fields: vec![
                        FieldSpec {
                            label: "WiFi SSID",
                            secret: false,
                            default: None,
                        },
                        FieldSpec {
                            label: "WiFi password",
                            secret: true,
                            default: None,
                        },
                    ],
                },
            },
            StepId::Summary => match self.summary_phase {
                SummaryPhase::Confirmation => StepPrompt::Summary {
                    title: self.step.title(),
                    rows: self.config.summary_rows(),
                    question: "Apply this configuration?",
                },
                SummaryPhase::CloneOffer => StepPrompt::Confirm {
                    title: self.step.title(),
                    question: format!(
                        "No NixOS configuration found. Clone {CONFIG_TEMPLATE_REPO} to /etc/nixos during apply?"
                    ),
                    default_yes: true,
                },
            },
        }
    }

    /// Submit an answer for the current step.
    pub fn submit(&mut self, input: StepInput) -> EngineEvent {
        self.last_error = None;
        self.last_warning = None;

        match input {
            StepInput::Cancel => return EngineEvent::Cancelled,
            StepInput::Back => return self.go_back(),
            StepInput::Skip => return self.skip_current(),
            _ => {}
        }

        match self.step {
            StepId::Welcome => self.advance(StepId::SshMethod),
            StepId::SshMethod => self.submit_ssh_method(input),
            StepId::SshGithub => self.submit_ssh_github(input),
            StepId::SshPaste => self.submit_ssh_paste(input),
            StepId::SshFile => self.submit_ssh_file(input),
            StepId::Runner => self.submit_runner(input),
            StepId::Hostname => self.submit_hostname(input),
            StepId::Timezone => self.submit_timezone(input),
            StepId::Wifi => self.submit_wifi(input),
            StepId::Summary => self.submit_summary(input),
        }
    }

    fn submit_ssh_method(&mut self, input: StepInput) -> EngineEvent {
        match input {
            StepInput::Choice(0) => self.advance(StepId::SshGithub),
            StepInput::Choice(1) => self.advance(StepId::SshPaste),
            StepInput::Choice(2) => self.advance(StepId::SshFile),
            StepInput::Choice(3) => {
                self.config.ssh_source = KeySource::None;
                self.config.ssh_keys.clear();
                self.last_warning = Some(
                    "No SSH key configured. You will not be able to log in via SSH.".to_string(),
                );
                self.advance(StepId::Runner)
            }
            _ => self.stay("Choose one of the listed options"),
        }
    }

    fn submit_ssh_github(&mut self, input: StepInput) -> EngineEvent {
        let StepInput::Text(username) = input else {
            return self.stay("Enter a GitHub username");
        };
        let username = username.trim().to_string();
        match keysource::resolve_github(self.fetcher.as_ref(), &username) {
            Ok(keys) => {
                self.config.set_ssh_keys(keys);
                self.config.ssh_source = KeySource::Github { username };
                self.advance(StepId::Runner)
            }
            Err(e) => self.stay(e.to_string()),
        }
    }

    fn submit_ssh_paste(&mut self, input: StepInput) -> EngineEvent {
        let StepInput::Lines(blob) = input else {
            return self.stay("Paste an SSH public key");
        };
        match keysource::resolve_pasted(&blob) {
            Ok(key) => {
                self.config.set_ssh_keys(vec![key]);
                self.config.ssh_source = KeySource::Pasted;
                self.advance(StepId::Runner)
            }
            Err(e) => self.stay(e.to_string()),
        }
    }

    fn submit_ssh_file(&mut self, input: StepInput) -> EngineEvent {
        let StepInput::Text(path) = input else {
            return self.stay("Enter a file path");
        };
        let path = path.trim().to_string();
        // content is validated exactly like a pasted blob
        let resolved = keysource::read_key_file(&path).and_then(|blob| keysource::resolve_pasted(&blob));
        match resolved {
            Ok(key) => {
                self.config.set_ssh_keys(vec![key]);
                self.config.ssh_source = KeySource::File {
                    path: PathBuf::from(path),
                };
                self.advance(StepId::Runner)
            }
            Err(e) => self.stay(e.to_string()),
        }
    }

    fn submit_runner(&mut self, input: StepInput) -> EngineEvent {
        let StepInput::Form(values) = input else {
            return self.stay("Enter the runner credentials");
        };
        let token = values.first().map(String::as_str).unwrap_or("").trim();
        if let Err(e) = validate_runner_token(token) {
            return self.stay(e.to_string());
        }
        // shape mismatches warn but never block
        self.last_warning = runner_token_warning(token);

        let url = values.get(1).map(String::as_str).unwrap_or("").trim();
        if !url.is_empty() {
            self.config.runner_url = url.to_string();
        }
        self.config.runner_token = Some(token.to_string());
        self.advance(StepId::Hostname)
    }

    fn submit_hostname(&mut self, input: StepInput) -> EngineEvent {
        let StepInput::Text(hostname) = input else {
            return self.stay("Enter a hostname");
        };
        let hostname = hostname.trim();
        if !hostname.is_empty() {
            if let Err(e) = validate_hostname(hostname) {
                return self.stay(e.to_string());
            }
            self.config.hostname = hostname.to_string();
        }
        self.advance(StepId::Timezone)
    }

    fn submit_timezone(&mut self, input: StepInput) -> EngineEvent {
        let StepInput::Text(timezone) = input else {
            return self.stay("Enter a timezone");
        };
        let timezone = timezone.trim();
        // free text is accepted; the probed list only feeds suggestions
        if !timezone.is_empty() {
            self.config.timezone = timezone.to_string();
        }
        self.advance(self.after_timezone())
    }

    fn submit_wifi(&mut self, input: StepInput) -> EngineEvent {
        match self.wifi_phase {
            WifiPhase::Choice => match input {
                StepInput::Yes => {
                    self.wifi_phase = WifiPhase::Credentials;
                    EngineEvent::Moved
                }
                StepInput::No => {
                    self.config.wifi = WifiSettings::default();
                    self.advance(StepId::Summary)
                }
                _ => self.stay("Answer yes or no"),
            },
            WifiPhase::Credentials => {
                let StepInput::Form(values) = input else {
                    return self.stay("Enter the WiFi credentials");
                };
                let ssid = values.first().map(String::as_str).unwrap_or("").trim();
                if ssid.is_empty() {
                    return self.stay("WiFi SSID must not be empty");
                }
                let password = values.get(1).map(String::as_str).unwrap_or("");
                if let Err(e) = validate_wifi_password(password) {
                    return self.stay(e.to_string());
                }
                self.config.wifi = WifiSettings {
                    enabled: true,
                    ssid: ssid.to_string(),
                    password: password.to_string(),
                };
                self.advance(StepId::Summary)
            }
        }
    }

    fn submit_summary(&mut self, input: StepInput) -> EngineEvent {
        match self.summary_phase {
            SummaryPhase::Confirmation => match input {
                StepInput::Yes => {
                    if self.probe.config_root.is_none() {
                        self.summary_phase = SummaryPhase::CloneOffer;
                        EngineEvent::Moved
                    } else {
                        EngineEvent::ReadyToApply
                    }
                }
                StepInput::No => self.go_back(),
                _ => self.stay("Answer yes to apply, or no to go back"),
            },
            SummaryPhase::CloneOffer => match input {
                StepInput::Yes => {
                    self.config.clone_config_if_missing = true;
                    EngineEvent::ReadyToApply
                }
                StepInput::No => {
                    self.config.clone_config_if_missing = false;
                    EngineEvent::ReadyToApply
                }
                _ => self.stay("Answer yes or no"),
            },
        }
    }

    /// Step after Timezone: WiFi only when the probe saw a wireless interface.
    fn after_timezone(&self) -> StepId {
        if self.probe.wireless.is_present() {
            StepId::Wifi
        } else {
            StepId::Summary
        }
    }

    fn advance(&mut self, next: StepId) -> EngineEvent {
        self.history.push(self.step);
        self.set_step(next);
        EngineEvent::Moved
    }

    fn go_back(&mut self) -> EngineEvent {
        // sub-phases unwind before the history stack does
        if self.step == StepId::Wifi && self.wifi_phase == WifiPhase::Credentials {
            self.wifi_phase = WifiPhase::Choice;
            return EngineEvent::Moved;
        }
        if self.step == StepId::Summary && self.summary_phase == SummaryPhase::CloneOffer {
            self.summary_phase = SummaryPhase::Confirmation;
            return EngineEvent::Moved;
        }
        match self.history.pop() {
            Some(previous) => {
                self.set_step(previous);
                EngineEvent::Moved
            }
            None => self.stay("Already at the first step"),
        }
    }

    fn skip_current(&mut self) -> EngineEvent {
        match self.step {
            // skip keeps the existing default
            StepId::Hostname => self.advance(StepId::Timezone),
            StepId::Timezone => self.advance(self.after_timezone()),
            StepId::Wifi => {
                self.config.wifi = WifiSettings::default();
                self.advance(StepId::Summary)
            }
            _ => self.stay("This step is required"),
        }
    }

    fn set_step(&mut self, step: StepId) {
        self.step = step;
        match step {
            StepId::Wifi => self.wifi_phase = WifiPhase::Choice,
            StepId::Summary => self.summary_phase = SummaryPhase::Confirmation,
            _ => {}
        }
    }

    fn stay(&mut self, reason: impl Into<String>) -> EngineEvent {
        let reason = reason.into();
        self.config.step_errors.insert(self.step, reason.clone());
        self.last_error = Some(reason);
        EngineEvent::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SetupError};
    use crate::probe::WirelessSupport;
    use std::io::Write;

    struct StubFetcher {
        body: Option<String>,
    }

    impl KeyFetcher for StubFetcher {
        fn fetch_keys(&self, _username: &str) -> Result<String> {
            match &self.body {
                Some(body) => Ok(body.clone()),
                None => Err(SetupError::transport("connection timed out")),
            }
        }
    }

    fn probe(wireless: WirelessSupport, config_root: bool) -> HostProbe {
        HostProbe {
            wireless,
            timezones: vec!["UTC".to_string(), "Europe/Zurich".to_string()],
            config_root: config_root.then(|| PathBuf::from("/etc/nixos/flake.nix")),
        }
    }

    fn wizard_with(wireless: WirelessSupport, config_root: bool, body: Option<&str>) -> Wizard {
        Wizard::new(
            probe(wireless, config_root),
            Box::new(StubFetcher {
                body: body.map(str::to_string),
            }),
        )
    }

    fn form(values: &[&str]) -> StepInput {
        StepInput::Form(values.iter().map(|v| v.to_string()).collect())
    }

    /// Drive a wizard from Welcome through Runner (SSH skipped so no
    /// fetcher response is needed).
    fn advance_past_runner(wizard: &mut Wizard) {
        assert_eq!(wizard.submit(StepInput::Yes), EngineEvent::Moved);
        assert_eq!(wizard.submit(StepInput::Choice(3)), EngineEvent::Moved);
        assert_eq!(
            wizard.submit(form(&["AAAAAAAAAAAAAAAAAAAAAAAA", ""])),
            EngineEvent::Moved
        );
        assert_eq!(wizard.current_step(), StepId::Hostname);
    }

    #[test]
    fn test_github_fetch_keeps_valid_subset() {
        // scenario: two lines, one valid Ed25519 key and one malformed
        let mut wizard = wizard_with(
            WirelessSupport::Absent,
            true,
            Some("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2\nssh-rsa !!!invalid!!!\n"),
        );
        wizard.submit(StepInput::Yes);
        wizard.submit(StepInput::Choice(0));
        assert_eq!(
            wizard.submit(StepInput::Text("alice".to_string())),
            EngineEvent::Moved
        );
        assert_eq!(
            wizard.config().ssh_keys,
            vec!["ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2"]
        );
        assert_eq!(
            wizard.config().ssh_source,
            KeySource::Github {
                username: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_transport_failure_stays_on_source_step() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        wizard.submit(StepInput::Choice(0));
        assert_eq!(
            wizard.submit(StepInput::Text("alice".to_string())),
            EngineEvent::Stay
        );
        assert_eq!(wizard.current_step(), StepId::SshGithub);
        assert!(wizard.last_error().unwrap().contains("timed out"));
        assert!(wizard.config().step_errors.contains_key(&StepId::SshGithub));
    }

    #[test]
    fn test_paste_rejects_multi_key_blob() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        wizard.submit(StepInput::Choice(1));
        assert_eq!(wizard.current_step(), StepId::SshPaste);

        let blob = "ssh-ed25519 AAAA\nssh-rsa BBBB".to_string();
        assert_eq!(wizard.submit(StepInput::Lines(blob)), EngineEvent::Stay);

        let single = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2".to_string();
        assert_eq!(wizard.submit(StepInput::Lines(single)), EngineEvent::Moved);
        assert_eq!(wizard.config().ssh_source, KeySource::Pasted);
    }

    #[test]
    fn test_file_source_validates_like_paste() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGZ2").unwrap();

        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        wizard.submit(StepInput::Choice(2));
        assert_eq!(
            wizard.submit(StepInput::Text(
                file.path().to_string_lossy().into_owned()
            )),
            EngineEvent::Moved
        );
        assert_eq!(wizard.config().ssh_keys.len(), 1);
    }

    #[test]
    fn test_ssh_skip_carries_warning() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        assert_eq!(wizard.submit(StepInput::Choice(3)), EngineEvent::Moved);
        assert_eq!(wizard.current_step(), StepId::Runner);
        assert!(wizard.config().ssh_keys.is_empty());
        assert!(wizard.last_warning().unwrap().contains("SSH"));
    }

    #[test]
    fn test_runner_token_required_but_shape_only_warns() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        wizard.submit(StepInput::Choice(3));

        assert_eq!(wizard.submit(form(&["", ""])), EngineEvent::Stay);
        assert!(wizard.last_error().unwrap().contains("required"));

        // odd-looking token: accepted with a warning
        assert_eq!(
            wizard.submit(form(&["weird-token", "https://example.org/repo"])),
            EngineEvent::Moved
        );
        assert!(wizard.last_warning().is_some());
        assert_eq!(wizard.config().runner_url, "https://example.org/repo");
        assert_eq!(
            wizard.config().runner_token.as_deref(),
            Some("weird-token")
        );
    }

    #[test]
    fn test_hostname_validation_redisplays() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);

        assert_eq!(
            wizard.submit(StepInput::Text("bad.host".to_string())),
            EngineEvent::Stay
        );
        assert_eq!(wizard.current_step(), StepId::Hostname);

        assert_eq!(
            wizard.submit(StepInput::Text("a".repeat(64))),
            EngineEvent::Stay
        );

        // empty input keeps the default and advances
        assert_eq!(
            wizard.submit(StepInput::Text(String::new())),
            EngineEvent::Moved
        );
        assert_eq!(wizard.config().hostname, crate::record::DEFAULT_HOSTNAME);
    }

    #[test]
    fn test_skip_keeps_defaults() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);

        assert_eq!(wizard.submit(StepInput::Skip), EngineEvent::Moved);
        assert_eq!(wizard.current_step(), StepId::Timezone);
        assert_eq!(wizard.submit(StepInput::Skip), EngineEvent::Moved);
        assert_eq!(wizard.config().hostname, crate::record::DEFAULT_HOSTNAME);
        assert_eq!(wizard.config().timezone, crate::record::DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_no_wireless_jumps_timezone_to_summary() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        assert_eq!(
            wizard.submit(StepInput::Text("Europe/Zurich".to_string())),
            EngineEvent::Moved
        );
        // never enters Wifi
        assert_eq!(wizard.current_step(), StepId::Summary);
        assert_eq!(wizard.config().timezone, "Europe/Zurich");
    }

    #[test]
    fn test_wireless_present_offers_wifi() {
        let mut wizard = wizard_with(WirelessSupport::Present, true, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        wizard.submit(StepInput::Skip);
        assert_eq!(wizard.current_step(), StepId::Wifi);

        // short password re-displays, valid credentials advance
        assert_eq!(wizard.submit(StepInput::Yes), EngineEvent::Moved);
        assert_eq!(
            wizard.submit(form(&["lab-net", "short"])),
            EngineEvent::Stay
        );
        assert_eq!(wizard.submit(form(&["", "longenough"])), EngineEvent::Stay);
        assert_eq!(
            wizard.submit(form(&["lab-net", "longenough"])),
            EngineEvent::Moved
        );
        assert_eq!(wizard.current_step(), StepId::Summary);
        assert!(wizard.config().wifi.enabled);
        assert_eq!(wizard.config().wifi.ssid, "lab-net");
    }

    #[test]
    fn test_wifi_declined_routes_to_summary_disabled() {
        let mut wizard = wizard_with(WirelessSupport::Present, true, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        wizard.submit(StepInput::Skip);
        assert_eq!(wizard.submit(StepInput::No), EngineEvent::Moved);
        assert_eq!(wizard.current_step(), StepId::Summary);
        assert!(!wizard.config().wifi.enabled);
    }

    #[test]
    fn test_back_follows_traversal_history() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        wizard.submit(StepInput::Choice(1));
        assert_eq!(wizard.current_step(), StepId::SshPaste);

        assert_eq!(wizard.submit(StepInput::Back), EngineEvent::Moved);
        assert_eq!(wizard.current_step(), StepId::SshMethod);
        assert_eq!(wizard.submit(StepInput::Back), EngineEvent::Moved);
        assert_eq!(wizard.current_step(), StepId::Welcome);
        // no further back from Welcome
        assert_eq!(wizard.submit(StepInput::Back), EngineEvent::Stay);
    }

    #[test]
    fn test_summary_no_returns_to_predecessor() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        wizard.submit(StepInput::Skip);
        assert_eq!(wizard.current_step(), StepId::Summary);

        assert_eq!(wizard.submit(StepInput::No), EngineEvent::Moved);
        assert_eq!(wizard.current_step(), StepId::Timezone);
    }

    #[test]
    fn test_summary_gibberish_never_auto_proceeds() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        wizard.submit(StepInput::Skip);
        assert_eq!(
            wizard.submit(StepInput::Text("sure".to_string())),
            EngineEvent::Stay
        );
        assert_eq!(wizard.current_step(), StepId::Summary);
    }

    #[test]
    fn test_summary_confirm_with_existing_config_applies() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        wizard.submit(StepInput::Skip);
        assert_eq!(wizard.submit(StepInput::Yes), EngineEvent::ReadyToApply);
        assert!(!wizard.into_config().clone_config_if_missing);
    }

    #[test]
    fn test_missing_config_root_collects_clone_decision() {
        let mut wizard = wizard_with(WirelessSupport::Absent, false, None);
        advance_past_runner(&mut wizard);
        wizard.submit(StepInput::Skip);
        wizard.submit(StepInput::Skip);

        // first yes moves to the clone offer instead of applying
        assert_eq!(wizard.submit(StepInput::Yes), EngineEvent::Moved);
        assert!(matches!(wizard.prompt(), StepPrompt::Confirm { .. }));
        assert_eq!(wizard.submit(StepInput::Yes), EngineEvent::ReadyToApply);
        assert!(wizard.into_config().clone_config_if_missing);
    }

    #[test]
    fn test_cancel_accepted_everywhere() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        assert_eq!(wizard.submit(StepInput::Cancel), EngineEvent::Cancelled);

        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        advance_past_runner(&mut wizard);
        assert_eq!(wizard.submit(StepInput::Cancel), EngineEvent::Cancelled);
    }

    #[test]
    fn test_skip_rejected_on_required_steps() {
        let mut wizard = wizard_with(WirelessSupport::Absent, true, None);
        wizard.submit(StepInput::Yes);
        assert_eq!(wizard.submit(StepInput::Skip), EngineEvent::Stay);
        assert_eq!(wizard.current_step(), StepId::SshMethod);
    }
}
