use crate::error::Result;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupSlot {
    /// Taken once, the first time this tool ever touches the file. Never overwritten.
    FirstRun,
    /// Refreshed on every later write
    Rolling,
}

/// The two backup files kept next to a managed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSlots {
    pub first_run: PathBuf,
    pub rolling: PathBuf,
}

impl BackupSlots {
    pub fn for_file(path: &Path) -> Self {
        Self {
            first_run: with_suffix(path, ".ssosync-firstrun.backup"),
            rolling: with_suffix(path, ".ssosync.backup"),
        }
    }

    pub fn path(&self, slot: BackupSlot) -> &Path {
        match slot {
            BackupSlot::FirstRun => &self.first_run,
            BackupSlot::Rolling => &self.rolling,
        }
    }

    /// Copy `source` into the first-run slot if it has never been claimed,
    /// otherwise into the rolling slot. Does nothing if `source` is missing.
    ///
    /// The copy is staged beside the slots and only then linked into place, so a
    /// failed write never leaves a truncated first-run backup claiming the slot.
    pub fn create_backup(&self, source: &Path) -> Result<Option<BackupSlot>> {
        let contents = match fs::read(source) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let staged = self.staging_path();
        write_private(&staged, &contents)?;

        let slot = match fs::hard_link(&staged, &self.first_run) {
            Ok(()) => {
                fs::remove_file(&staged)?;
                BackupSlot::FirstRun
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                fs::rename(&staged, &self.rolling)?;
                BackupSlot::Rolling
            }
            Err(e) => {
                let _ = fs::remove_file(&staged);
                return Err(e.into());
            }
        };

        tracing::debug!(
            "Backed up {} to {}",
            source.display(),
            self.path(slot).display()
        );
        Ok(Some(slot))
    }

    fn staging_path(&self) -> PathBuf {
        with_suffix(&self.rolling, ".tmp")
    }
}

// Backups hold the same secrets as the credentials file
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_slot_paths() {
        let slots = BackupSlots::for_file(Path::new("/home/me/.aws/credentials"));
        assert_eq!(
            slots.first_run,
            PathBuf::from("/home/me/.aws/credentials.ssosync-firstrun.backup")
        );
        assert_eq!(
            slots.rolling,
            PathBuf::from("/home/me/.aws/credentials.ssosync.backup")
        );
    }

    #[test]
    fn test_first_run_backup_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("credentials");
        let slots = BackupSlots::for_file(&source);

        fs::write(&source, "[a]\nkey = first\n").unwrap();
        assert_eq!(
            slots.create_backup(&source).unwrap(),
            Some(BackupSlot::FirstRun)
        );

        fs::write(&source, "[a]\nkey = second\n").unwrap();
        assert_eq!(
            slots.create_backup(&source).unwrap(),
            Some(BackupSlot::Rolling)
        );

        fs::write(&source, "[a]\nkey = third\n").unwrap();
        assert_eq!(
            slots.create_backup(&source).unwrap(),
            Some(BackupSlot::Rolling)
        );

        assert_eq!(
            fs::read_to_string(&slots.first_run).unwrap(),
            "[a]\nkey = first\n"
        );
        assert_eq!(
            fs::read_to_string(&slots.rolling).unwrap(),
            "[a]\nkey = third\n"
        );
        assert!(!slots.staging_path().exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for path in [&slots.first_run, &slots.rolling] {
                let mode = fs::metadata(path).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o600, "{}", path.display());
            }
        }
    }

    #[test]
    fn test_failed_copy_leaves_first_run_unclaimed() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("credentials");
        let slots = BackupSlots::for_file(&source);
        fs::write(&source, "[a]\nkey = original\n").unwrap();

        // A directory in the staging spot makes the copy fail
        fs::create_dir(slots.staging_path()).unwrap();
        assert!(slots.create_backup(&source).is_err());
        assert!(!slots.first_run.exists());

        fs::remove_dir(slots.staging_path()).unwrap();
        assert_eq!(
            slots.create_backup(&source).unwrap(),
            Some(BackupSlot::FirstRun)
        );
        assert_eq!(
            fs::read_to_string(&slots.first_run).unwrap(),
            "[a]\nkey = original\n"
        );
    }

    #[test]
    fn test_missing_source_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("credentials");
        let slots = BackupSlots::for_file(&source);

        assert_eq!(slots.create_backup(&source).unwrap(), None);
        assert!(!slots.first_run.exists());
        assert!(!slots.rolling.exists());
    }
}
