//! Apply pipeline
//!
//! Turns a completed session record into on-disk artifacts and a final
//! `nixos-rebuild` invocation. Six ordered stages run strictly one after
//! another; a failing stage is recorded and the pipeline moves on, so a WiFi
//! misconfiguration can never block SSH key installation. Every destructive
//! write is preceded by a timestamped backup of the target.
//!
//! # Stage Flow
//!
//! ```text
//! ssh -> runner -> hostname -> timezone -> wifi -> rebuild
//! ```
//!
//! The pipeline is exposed as a cooperative [`ApplyRun`]: one `step()` call
//! executes one stage, so the screen front-end can redraw between stages.
//! Driving `step()` to completion is exactly the linear behavior.

pub mod rebuild;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fsutil::{backup_file, chown_artifact, ensure_private_dir, write_private_file};
use crate::record::SetupConfig;

/// Owner of SSH material (the interactive login identity)
pub const SSH_ARTIFACT_OWNER: &str = "root";

/// Owner of runner material (the runner service identity)
pub const RUNNER_ARTIFACT_OWNER: &str = "github-runner";

/// One effectful step of the pipeline, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Ssh,
    Runner,
    Hostname,
    Timezone,
    Wifi,
    Rebuild,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: &'static [Self] = &[
        Self::Ssh,
        Self::Runner,
        Self::Hostname,
        Self::Timezone,
        Self::Wifi,
        Self::Rebuild,
    ];

    /// Numeric position in the pipeline (0-based)
    pub fn order(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Human-readable description used for progress display
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ssh => "Configuring SSH authorized keys",
            Self::Runner => "Configuring GitHub Actions runner",
            Self::Hostname => "Configuring hostname",
            Self::Timezone => "Configuring timezone",
            Self::Wifi => "Configuring WiFi",
            Self::Rebuild => "Running nixos-rebuild switch",
        }
    }
}

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Success,
    Failed,
    /// Required input was absent; the stage was not attempted
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "ok"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Immutable record of one stage execution.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub detail: String,
}

impl StageOutcome {
    fn success(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            detail: detail.into(),
        }
    }

    fn failed(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            detail: detail.into(),
        }
    }

    fn skipped(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            detail: detail.into(),
        }
    }
}

/// Aggregated result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<StageOutcome>,
}

impl ApplyReport {
    pub fn any_failed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == StageStatus::Failed)
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    /// Run-level verdict line. Never drops a failed stage silently: the
    /// per-stage outcomes are always listed alongside this.
    pub fn summary_line(&self) -> &'static str {
        if self.any_failed() {
            "Setup completed with errors"
        } else {
            "Setup completed successfully"
        }
    }
}

/// Filesystem targets of the pipeline.
///
/// The defaults point at the live system; tests re-root everything into a
/// temporary directory and drop the ownership transfer.
#[derive(Debug, Clone)]
pub struct ApplyPaths {
    pub ssh_dir: PathBuf,
    pub authorized_keys: PathBuf,
    pub runner_dir: PathBuf,
    pub runner_token_file: PathBuf,
    pub runner_url_file: PathBuf,
    pub nixos_dir: PathBuf,
    /// Candidate configuration entry points, in priority order
    pub config_root_candidates: Vec<PathBuf>,
    /// Ownership targets; `None` leaves ownership untouched
    pub ssh_owner: Option<String>,
    pub runner_owner: Option<String>,
}

impl Default for ApplyPaths {
    fn default() -> Self {
        Self::under(Path::new("/"), true)
    }
}

impl ApplyPaths {
    /// Paths re-rooted under `root`, with ownership transfer disabled.
    pub fn rooted(root: &Path) -> Self {
        Self::under(root, false)
    }

    fn under(root: &Path, live: bool) -> Self {
        let ssh_dir = root.join("root/.ssh");
        let authorized_keys = ssh_dir.join("authorized_keys");
        let runner_dir = root.join("var/lib/github-runner");
        let runner_token_file = runner_dir.join(".runner_token");
        let runner_url_file = runner_dir.join(".runner_url");
        let nixos_dir = root.join("etc/nixos");
        let config_root_candidates = vec![
            nixos_dir.join("configuration.nix"),
            nixos_dir.join("flake.nix"),
            root.join("nix/var/nixos/configuration.nix"),
        ];
        Self {
            ssh_dir,
            authorized_keys,
            runner_dir,
            runner_token_file,
            runner_url_file,
            nixos_dir,
            config_root_candidates,
            ssh_owner: live.then(|| SSH_ARTIFACT_OWNER.to_string()),
            runner_owner: live.then(|| RUNNER_ARTIFACT_OWNER.to_string()),
        }
    }
}

/// A pipeline execution in progress.
///
/// The record is consumed at construction and never mutated afterwards;
/// only outcomes accumulate. Call [`ApplyRun::step`] until it returns
/// `None`, then collect the report.
pub struct ApplyRun {
    config: SetupConfig,
    paths: ApplyPaths,
    cursor: usize,
    outcomes: Vec<StageOutcome>,
}

impl ApplyRun {
    pub fn new(config: SetupConfig, paths: ApplyPaths) -> Self {
        Self {
            config,
            paths,
            cursor: 0,
            outcomes: Vec::new(),
        }
    }

    /// The stage the next `step()` call will execute
    pub fn next_stage(&self) -> Option<Stage> {
        Stage::ALL.get(self.cursor).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= Stage::ALL.len()
    }

    /// Outcomes recorded so far, in stage order
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Execute the next stage. Returns `None` once all six have run.
    pub fn step(&mut self) -> Option<&StageOutcome> {
        let stage = self.next_stage()?;
        self.cursor += 1;

        let outcome = self.execute(stage);
        match outcome.status {
            StageStatus::Failed => {
                tracing::warn!("Stage {stage} failed: {}", outcome.detail)
            }
            status => tracing::info!("Stage {stage}: {status} ({})", outcome.detail),
        }
        self.outcomes.push(outcome);
        self.outcomes.last()
    }

    pub fn into_report(self) -> ApplyReport {
        ApplyReport {
            outcomes: self.outcomes,
        }
    }

    fn execute(&self, stage: Stage) -> StageOutcome {
        match stage {
            Stage::Ssh => {
                if self.config.ssh_keys.is_empty() {
                    StageOutcome::skipped(stage, "no SSH keys staged")
                } else {
                    run_stage(stage, apply_ssh(&self.config, &self.paths))
                }
            }
            Stage::Runner => match self.config.runner_token.as_deref() {
                None => StageOutcome::skipped(stage, "no runner token staged"),
                Some(token) => {
                    run_stage(stage, apply_runner(token, &self.config.runner_url, &self.paths))
                }
            },
            Stage::Hostname => run_stage(stage, apply_hostname(&self.config, &self.paths)),
            Stage::Timezone => run_stage(stage, apply_timezone(&self.config, &self.paths)),
            Stage::Wifi => run_stage(stage, apply_wifi(&self.config, &self.paths)),
            Stage::Rebuild => rebuild::run_stage(&self.config, &self.paths),
        }
    }
}

fn run_stage(stage: Stage, result: Result<String>) -> StageOutcome {
    match result {
        Ok(detail) => StageOutcome::success(stage, detail),
        Err(e) => StageOutcome::failed(stage, e.to_string()),
    }
}

/// Chown every path to `owner`, collecting the advisory note if the owner
/// identity does not exist on this host.
fn chown_all(paths: &[&Path], owner: Option<&str>) -> Result<Option<String>> {
    let Some(owner) = owner else {
        return Ok(None);
    };
    for path in paths {
        if let Some(note) = chown_artifact(path, owner)? {
            // user lookup failed; it will fail identically for the rest
            return Ok(Some(note));
        }
    }
    Ok(None)
}

fn with_note(detail: String, note: Option<String>) -> String {
    match note {
        Some(note) => format!("{detail} ({note})"),
        None => detail,
    }
}

// ============================================================================
// Artifact stages
// ============================================================================

fn apply_ssh(config: &SetupConfig, paths: &ApplyPaths) -> Result<String> {
    ensure_private_dir(&paths.ssh_dir)?;
    backup_file(&paths.authorized_keys)?;
    write_private_file(&paths.authorized_keys, &config.ssh_keys.join("\n"))?;

    let note = chown_all(
        &[&paths.ssh_dir, &paths.authorized_keys],
        paths.ssh_owner.as_deref(),
    )?;
    Ok(with_note(
        format!("installed {} authorized key(s)", config.ssh_keys.len()),
        note,
    ))
}

fn apply_runner(token: &str, url: &str, paths: &ApplyPaths) -> Result<String> {
    ensure_private_dir(&paths.runner_dir)?;
    backup_file(&paths.runner_token_file)?;
    backup_file(&paths.runner_url_file)?;
    write_private_file(&paths.runner_token_file, token)?;
    write_private_file(&paths.runner_url_file, url)?;

    let note = chown_all(
        &[
            &paths.runner_dir,
            &paths.runner_token_file,
            &paths.runner_url_file,
        ],
        paths.runner_owner.as_deref(),
    )?;
    Ok(with_note(format!("runner registration staged for {url}"), note))
}

fn apply_hostname(config: &SetupConfig, paths: &ApplyPaths) -> Result<String> {
    write_fragment(
        &paths.nixos_dir,
        "hostname.nix",
        &hostname_fragment(&config.hostname),
    )?;
    Ok(format!("hostname set to {}", config.hostname))
}

fn apply_timezone(config: &SetupConfig, paths: &ApplyPaths) -> Result<String> {
    write_fragment(
        &paths.nixos_dir,
        "timezone.nix",
        &timezone_fragment(&config.timezone),
    )?;
    Ok(format!("timezone set to {}", config.timezone))
}

/// WiFi is the one stage where absence is itself a state to enforce: when
/// the operator declined WiFi, any pre-existing fragment is backed up and
/// removed.
fn apply_wifi(config: &SetupConfig, paths: &ApplyPaths) -> Result<String> {
    let fragment_path = paths.nixos_dir.join("wifi.nix");

    if config.wifi.enabled {
        write_fragment(
            &paths.nixos_dir,
            "wifi.nix",
            &wifi_fragment(&config.wifi.ssid, &config.wifi.password),
        )?;
        Ok(format!("WiFi configured for network {}", config.wifi.ssid))
    } else if fragment_path.exists() {
        backup_file(&fragment_path)?;
        std::fs::remove_file(&fragment_path)?;
        Ok("removed existing WiFi configuration".to_string())
    } else {
        Ok("no WiFi configuration present".to_string())
    }
}

fn write_fragment(dir: &Path, name: &str, content: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    backup_file(&path)?;
    std::fs::write(&path, content)?;
    Ok(())
}

// ============================================================================
// Declarative fragments
// ============================================================================

const FRAGMENT_HEADER: &str = "# Generated by nixpi-setup";

fn hostname_fragment(hostname: &str) -> String {
    format!(
        r#"{FRAGMENT_HEADER}
{{ config, pkgs, lib, ... }}:
{{
  networking.hostName = "{hostname}";
}}
"#
    )
}

fn timezone_fragment(timezone: &str) -> String {
    format!(
        r#"{FRAGMENT_HEADER}
{{ config, pkgs, lib, ... }}:
{{
  time.timeZone = "{timezone}";
}}
"#
    )
}

fn wifi_fragment(ssid: &str, password: &str) -> String {
    format!(
        r#"{FRAGMENT_HEADER}
{{ config, pkgs, lib, ... }}:
{{
  networking.wireless = {{
    enable = true;
    networks = {{
      "{ssid}" = {{
        psk = "{password}";
      }};
    }};
  }};
}}
"#
    )
}
