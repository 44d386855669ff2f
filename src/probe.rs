//! Host environment probing
//!
//! Read-only queries that feed defaults and branching decisions into the
//! wizard: wireless interface presence, the timezone list, and whether a
//! NixOS configuration root already exists.
//!
//! # Design
//!
//! - Probes never fail the session: a missing binary, non-zero exit, or
//!   timeout degrades silently to a fixed fallback.
//! - Probe subprocesses run under a bounded deadline.
//!
//! Call `HostProbe::detect()` at startup before presenting either front-end.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::apply::ApplyPaths;
use crate::apply::rebuild::find_config_root;
use crate::exec::run_capture_timeout;

/// Deadline for probe subprocesses
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timezones offered when `timedatectl` is unavailable
pub const FALLBACK_TIMEZONES: &[&str] = &[
    "UTC",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Europe/Zurich",
    "Europe/Rome",
    "America/New_York",
    "America/Los_Angeles",
    "America/Chicago",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Australia/Sydney",
];

/// Whether a wireless interface is present on the host.
///
/// Determined by listing interfaces with `iw dev`. Decides whether the
/// wizard offers the WiFi step at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirelessSupport {
    /// At least one wireless interface was reported
    Present,
    /// No interface reported, or the probe failed
    Absent,
}

impl WirelessSupport {
    pub fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}

impl fmt::Display for WirelessSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Aggregated probe results.
///
/// Created once at startup; the wizard consults it for branching (WiFi
/// step), suggestions (timezone picker), and the summary-time clone
/// decision (configuration root presence).
#[derive(Debug, Clone)]
pub struct HostProbe {
    pub wireless: WirelessSupport,
    pub timezones: Vec<String>,
    pub config_root: Option<PathBuf>,
}

impl HostProbe {
    /// Probe the host. Never panics; failures fall back to safe defaults.
    pub fn detect(paths: &ApplyPaths) -> Self {
        let wireless = detect_wireless();
        let timezones = detect_timezones();
        let config_root = find_config_root(paths);

        tracing::info!(
            "Host probe: wireless={}, {} timezone(s), config_root={:?}",
            wireless,
            timezones.len(),
            config_root
        );

        Self {
            wireless,
            timezones,
            config_root,
        }
    }
}

impl fmt::Display for HostProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wireless: {}, Config root: {}",
            self.wireless,
            self.config_root
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

// ============================================================================
// Detection Functions
// ============================================================================

/// Detect wireless interface presence via `iw dev`.
fn detect_wireless() -> WirelessSupport {
    match query_command("iw", &["dev"]) {
        Ok(stdout) if !parse_wireless_interfaces(&stdout).is_empty() => WirelessSupport::Present,
        Ok(_) => WirelessSupport::Absent,
        Err(e) => {
            tracing::debug!("Wireless probe unavailable ({e:#}), assuming no wireless interface");
            WirelessSupport::Absent
        }
    }
}

/// Run a probe command under the deadline and hand back its stdout.
fn query_command(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = run_capture_timeout(program, args, PROBE_TIMEOUT)
        .with_context(|| format!("running {program}"))?;
    if !output.status.success() {
        bail!("{program} exited with {:?}", output.status.code());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract interface names from `iw dev` output.
///
/// Lines of interest look like `\tInterface wlan0`.
pub fn parse_wireless_interfaces(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Interface "))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// List timezones via `timedatectl`, falling back to a fixed set.
fn detect_timezones() -> Vec<String> {
    match query_command("timedatectl", &["list-timezones"]) {
        Ok(stdout) => {
            let zones: Vec<String> = stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if zones.is_empty() { fallback_timezones() } else { zones }
        }
        Err(e) => {
            tracing::debug!("Timezone probe unavailable ({e:#}), using fallback list");
            fallback_timezones()
        }
    }
}

fn fallback_timezones() -> Vec<String> {
    FALLBACK_TIMEZONES.iter().map(|tz| tz.to_string()).collect()
}
