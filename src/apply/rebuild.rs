//! Rebuild stage
//!
//! The terminal effect of the pipeline: locate the NixOS configuration
//! entry point, optionally materialize it from the template repository,
//! pick a flake target, and invoke `nixos-rebuild switch`. The rebuild is
//! the one call allowed to run for minutes; its output is captured and the
//! error tail bounded before it lands in the stage detail.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ApplyPaths, Stage, StageOutcome, StageStatus};
use crate::error::{Result, SetupError};
use crate::exec::{run_capture, tail_chars};
use crate::fsutil::backup_dir_move;
use crate::record::SetupConfig;

/// Repository cloned when no configuration root exists and the operator
/// authorized materializing one
pub const CONFIG_TEMPLATE_REPO: &str = "https://github.com/denysvitali/nix-hil-rpi";

/// Preferred flake targets, most specific first
pub const FLAKE_TARGET_PREFERENCE: &[&str] = &["pi4-aarch64", "pi4-cross"];

/// Bound on the captured error stream carried in a failed stage detail
pub const REBUILD_ERROR_TAIL: usize = 1000;

const FLAKES_NIX_CONFIG: &str = "experimental-features = nix-command flakes";
const DEFAULT_NIX_PATH: &str =
    "nixos-config=/etc/nixos/configuration.nix:/nix/var/nix/profiles/per-user/root/channels";

/// Find the configuration entry point, checking candidates in priority order.
pub fn find_config_root(paths: &ApplyPaths) -> Option<PathBuf> {
    paths
        .config_root_candidates
        .iter()
        .find(|candidate| candidate.exists())
        .cloned()
}

/// Execute the rebuild stage against a completed record.
pub fn run_stage(config: &SetupConfig, paths: &ApplyPaths) -> StageOutcome {
    let stage = Stage::Rebuild;
    let mut notes = Vec::new();

    let mut marker = find_config_root(paths);
    if marker.is_none() {
        if !config.clone_config_if_missing {
            return StageOutcome {
                stage,
                status: StageStatus::Skipped,
                detail: format!(
                    "no NixOS configuration found under {}; set one up and run nixos-rebuild switch manually",
                    paths.nixos_dir.display()
                ),
            };
        }

        match clone_config_repo(&paths.nixos_dir, CONFIG_TEMPLATE_REPO) {
            Ok(Some(backup)) => {
                notes.push(format!("previous contents moved to {}", backup.display()))
            }
            Ok(None) => {}
            Err(e) => {
                return StageOutcome {
                    stage,
                    status: StageStatus::Failed,
                    detail: e.to_string(),
                };
            }
        }

        marker = find_config_root(paths);
        if marker.is_none() {
            return StageOutcome {
                stage,
                status: StageStatus::Failed,
                detail: "configuration still missing after cloning the template repository"
                    .to_string(),
            };
        }
        notes.push(format!("cloned {CONFIG_TEMPLATE_REPO}"));
    }

    let marker = marker.expect("config root checked above");
    let root = marker
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    let flake_style = root.join("flake.nix").exists();

    match invoke_rebuild(&root, flake_style) {
        Ok(mut detail) => {
            if !notes.is_empty() {
                detail = format!("{detail} ({})", notes.join("; "));
            }
            StageOutcome {
                stage,
                status: StageStatus::Success,
                detail,
            }
        }
        Err(e) => StageOutcome {
            stage,
            status: StageStatus::Failed,
            detail: e.to_string(),
        },
    }
}

/// Clone the template repository into `dir`, moving any non-empty existing
/// directory aside first. Returns the backup path, if one was made.
fn clone_config_repo(dir: &Path, repo_url: &str) -> Result<Option<PathBuf>> {
    let backup = if dir.exists() && dir.read_dir()?.next().is_some() {
        backup_dir_move(dir)?
    } else {
        None
    };

    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let dir_arg = dir.to_string_lossy().into_owned();
    let output = run_capture("git", &["clone", repo_url, &dir_arg], &[])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SetupError::external_tool(
            "git",
            output.status.code(),
            tail_chars(&stderr, REBUILD_ERROR_TAIL).to_string(),
        ));
    }
    Ok(backup)
}

fn invoke_rebuild(root: &Path, flake_style: bool) -> Result<String> {
    let root_arg = root.to_string_lossy().into_owned();

    let (args, envs, detail): (Vec<String>, Vec<(&str, String)>, String) = if flake_style {
        let targets = flake_targets(root);
        let flake_ref = match choose_target(&targets) {
            Some(target) => format!("{root_arg}#{target}"),
            None => root_arg.clone(),
        };
        let detail = format!("applied flake configuration {flake_ref}");
        (
            vec!["switch".into(), "--flake".into(), flake_ref],
            vec![("NIX_CONFIG", FLAKES_NIX_CONFIG.to_string())],
            detail,
        )
    } else {
        let mut envs = Vec::new();
        if std::env::var_os("NIX_PATH").is_none() {
            envs.push(("NIX_PATH", DEFAULT_NIX_PATH.to_string()));
        }
        (
            vec!["switch".into()],
            envs,
            format!("applied configuration at {root_arg}"),
        )
    };

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_capture("nixos-rebuild", &arg_refs, &envs)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SetupError::external_tool(
            "nixos-rebuild",
            output.status.code(),
            tail_chars(&stderr, REBUILD_ERROR_TAIL).to_string(),
        ));
    }
    Ok(detail)
}

/// List the configurations a flake root offers. Any failure degrades to an
/// empty list, which falls back to the bare root reference.
fn flake_targets(root: &Path) -> Vec<String> {
    let root_arg = root.to_string_lossy().into_owned();
    let result = run_capture(
        "nix",
        &["flake", "show", &root_arg, "--json"],
        &[("NIX_CONFIG", FLAKES_NIX_CONFIG.to_string())],
    );
    match result {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            parse_flake_targets(&stdout).unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct FlakeShow {
    #[serde(default, rename = "nixosConfigurations")]
    nixos_configurations: serde_json::Map<String, serde_json::Value>,
}

/// Extract configuration names from `nix flake show --json` output.
pub fn parse_flake_targets(json: &str) -> Result<Vec<String>> {
    let show: FlakeShow = serde_json::from_str(json)?;
    Ok(show.nixos_configurations.keys().cloned().collect())
}

/// Pick a build target by fixed preference, falling back to the first listed.
pub fn choose_target(targets: &[String]) -> Option<&str> {
    for preferred in FLAKE_TARGET_PREFERENCE {
        if targets.iter().any(|t| t == preferred) {
            return Some(preferred);
        }
    }
    targets.first().map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_root_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ApplyPaths::rooted(dir.path());
        assert_eq!(find_config_root(&paths), None);

        // lower-priority candidate present
        fs::create_dir_all(&paths.nixos_dir).unwrap();
        fs::write(paths.nixos_dir.join("flake.nix"), "{}").unwrap();
        assert_eq!(
            find_config_root(&paths),
            Some(paths.nixos_dir.join("flake.nix"))
        );

        // higher-priority candidate wins once present
        fs::write(paths.nixos_dir.join("configuration.nix"), "{}").unwrap();
        assert_eq!(
            find_config_root(&paths),
            Some(paths.nixos_dir.join("configuration.nix"))
        );
    }

    #[test]
    fn test_run_stage_skips_without_clone_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ApplyPaths::rooted(dir.path());
        let config = SetupConfig::default();

        let outcome = run_stage(&config, &paths);
        assert_eq!(outcome.status, StageStatus::Skipped);
        assert!(outcome.detail.contains("no NixOS configuration found"));
    }

    #[test]
    fn test_parse_flake_targets() {
        let json = r#"{
            "nixosConfigurations": {
                "pi4-cross": {"type": "nixos-configuration"},
                "pi4-aarch64": {"type": "nixos-configuration"}
            },
            "packages": {}
        }"#;
        let targets = parse_flake_targets(json).unwrap();
        assert!(targets.contains(&"pi4-aarch64".to_string()));
        assert!(targets.contains(&"pi4-cross".to_string()));
    }

    #[test]
    fn test_parse_flake_targets_without_section() {
        assert!(parse_flake_targets("{}").unwrap().is_empty());
        assert!(parse_flake_targets("not json").is_err());
    }

    #[test]
    fn test_choose_target_preference() {
        let targets = vec![
            "other".to_string(),
            "pi4-cross".to_string(),
            "pi4-aarch64".to_string(),
        ];
        assert_eq!(choose_target(&targets), Some("pi4-aarch64"));

        let targets = vec!["other".to_string(), "pi4-cross".to_string()];
        assert_eq!(choose_target(&targets), Some("pi4-cross"));

        let targets = vec!["zz-first".to_string(), "aa-second".to_string()];
        assert_eq!(choose_target(&targets), Some("zz-first"));

        assert_eq!(choose_target(&[]), None);
    }
}
