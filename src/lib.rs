//! nixpi-setup library
//!
//! Post-boot provisioning for NixOS Raspberry Pi hosts: a validated wizard
//! (two front-ends, one engine) that stages SSH keys, CI runner
//! credentials, hostname, timezone, and WiFi, then applies them through a
//! fail-soft six-stage pipeline ending in `nixos-rebuild switch`.

pub mod apply;
pub mod cli;
pub mod error;
pub mod exec;
pub mod fsutil;
pub mod keysource;
pub mod probe;
pub mod prompt;
pub mod record;
pub mod theme;
pub mod ui;
pub mod validate;
pub mod wizard;

// Re-export main types for convenience
pub use apply::{ApplyPaths, ApplyReport, ApplyRun, Stage, StageOutcome, StageStatus};
pub use error::{Result, SetupError};
pub use keysource::{GithubKeyFetcher, KeyFetcher, KeySource};
pub use probe::{HostProbe, WirelessSupport};
pub use record::{SetupConfig, WifiSettings};
pub use wizard::{EngineEvent, StepId, StepInput, StepPrompt, Wizard};
