//! Filesystem helpers for the apply pipeline
//!
//! Backup-before-overwrite, owner-only writes, and advisory ownership
//! transfer. Backups carry a timestamp suffix next to the original path and
//! are never pruned.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::Local;
use nix::unistd::{User, chown};

use crate::error::{Result, SetupError};

/// Mode for directories holding secret-bearing artifacts
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Mode for secret-bearing files
pub const PRIVATE_FILE_MODE: u32 = 0o600;

fn backup_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn backup_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.backup.{}", path.display(), backup_stamp()))
}

/// Copy `path` aside with a timestamp suffix if it exists.
///
/// Returns the backup path, or `None` when there was nothing to back up.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = backup_path_for(path);
    fs::copy(path, &backup)?;
    tracing::info!("Backed up {} -> {}", path.display(), backup.display());
    Ok(Some(backup))
}

/// Move a directory aside with a timestamp suffix if it exists.
///
/// Used before a destructive directory replace (template clone).
pub fn backup_dir_move(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let backup = backup_path_for(dir);
    fs::rename(dir, &backup)?;
    tracing::info!("Backed up {} -> {}", dir.display(), backup.display());
    Ok(Some(backup))
}

/// Create a directory (and parents) with owner-only access.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(PRIVATE_DIR_MODE))?;
    Ok(())
}

/// Write a newline-terminated file readable and writable by the owner only.
pub fn write_private_file(path: &Path, content: &str) -> Result<()> {
    let mut data = content.to_string();
    if !data.ends_with('\n') {
        data.push('\n');
    }
    fs::write(path, data)?;
    fs::set_permissions(path, fs::Permissions::from_mode(PRIVATE_FILE_MODE))?;
    Ok(())
}

/// Transfer ownership of `path` to `owner` (user and primary group).
///
/// A missing user skips the transfer with an advisory note instead of
/// failing; an actual chown error is a real failure.
pub fn chown_artifact(path: &Path, owner: &str) -> Result<Option<String>> {
    match User::from_name(owner) {
        Ok(Some(user)) => {
            chown(path, Some(user.uid), Some(user.gid))
                .map_err(|e| SetupError::Io(io::Error::from_raw_os_error(e as i32)))?;
            Ok(None)
        }
        Ok(None) => Ok(Some(format!(
            "user {owner} not found, ownership left unchanged"
        ))),
        Err(e) => Ok(Some(format!(
            "could not look up user {owner} ({e}), ownership left unchanged"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn test_backup_file_absent_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing");
        assert_eq!(backup_file(&target).unwrap(), None);
    }

    #[test]
    fn test_backup_file_copies_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hostname.nix");
        fs::write(&target, "old contents").unwrap();

        let backup = backup_file(&target).unwrap().unwrap();
        assert!(backup.file_name().unwrap().to_str().unwrap().contains(".backup."));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old contents");
        // original untouched
        assert_eq!(fs::read_to_string(&target).unwrap(), "old contents");
    }

    #[test]
    fn test_backup_dir_move_takes_contents_along() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nixos");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("configuration.nix"), "{}").unwrap();

        let backup = backup_dir_move(&target).unwrap().unwrap();
        assert!(!target.exists());
        assert!(backup.join("configuration.nix").exists());
    }

    #[test]
    fn test_private_dir_and_file_modes() {
        let dir = tempfile::tempdir().unwrap();
        let subdir = dir.path().join("ssh");
        ensure_private_dir(&subdir).unwrap();
        assert_eq!(mode_of(&subdir), PRIVATE_DIR_MODE);

        let file = subdir.join("authorized_keys");
        write_private_file(&file, "ssh-ed25519 AAAA").unwrap();
        assert_eq!(mode_of(&file), PRIVATE_FILE_MODE);
        assert_eq!(fs::read_to_string(&file).unwrap(), "ssh-ed25519 AAAA\n");
    }

    #[test]
    fn test_write_private_file_keeps_existing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("token");
        write_private_file(&file, "value\n").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "value\n");
    }

    #[test]
    fn test_chown_artifact_missing_user_is_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        let note = chown_artifact(&file, "no-such-user-xyz").unwrap();
        assert!(note.unwrap().contains("not found"));
    }
}
