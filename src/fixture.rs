// src/fixture.rs
// Staging and guaranteed restoration of served-content fixtures

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HarnessError;

const BACKUP_DIR: &str = "bak";

fn fixture_io(context: &str, path: &Path, err: std::io::Error) -> HarnessError {
    HarnessError::FixtureIo(format!("{} {}: {}", context, path.display(), err))
}

/// Files staged into a shared served-content directory, with the pre-existing
/// regular files moved aside and restored afterwards.
///
/// `restore` runs on every exit path: explicitly for error reporting, and
/// from `Drop` as a backstop when the owning test panics first.
#[derive(Debug)]
pub struct Fixture {
    dir: PathBuf,
    backup_dir: PathBuf,
    staged: Vec<PathBuf>,
    moved_aside: Vec<OsString>,
    restored: bool,
}

impl Fixture {
    /// Move every regular file directly under `dir` into a backup area, then
    /// write each `(name, content)` entry as a new file.
    ///
    /// Originals are never deleted. If writing a staged file fails midway the
    /// directory is unwound to its pre-stage state before the error returns.
    pub fn stage(dir: &Path, files: &[(&str, &str)]) -> Result<Fixture, HarnessError> {
        fs::create_dir_all(dir).map_err(|e| fixture_io("create", dir, e))?;

        let backup_dir = dir.join(BACKUP_DIR);
        if backup_dir.exists() {
            fs::remove_dir_all(&backup_dir).map_err(|e| fixture_io("clear", &backup_dir, e))?;
        }
        fs::create_dir_all(&backup_dir).map_err(|e| fixture_io("create", &backup_dir, e))?;

        let mut fixture = Fixture {
            dir: dir.to_path_buf(),
            backup_dir: backup_dir.clone(),
            staged: Vec::new(),
            moved_aside: Vec::new(),
            restored: false,
        };

        let entries = fs::read_dir(dir).map_err(|e| fixture_io("read", dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| fixture_io("read", dir, e))?;
            let file_type = entry.file_type().map_err(|e| fixture_io("stat", &entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name();
            if let Err(e) = fs::rename(entry.path(), backup_dir.join(&name)) {
                let err = fixture_io("back up", &entry.path(), e);
                fixture.unwind();
                return Err(err);
            }
            fixture.moved_aside.push(name);
        }

        for (name, content) in files {
            let path = dir.join(name);
            if let Err(e) = fs::write(&path, content) {
                let err = fixture_io("write", &path, e);
                fixture.unwind();
                return Err(err);
            }
            fixture.staged.push(path);
        }

        log::info!(
            "Staged {} file(s) into {} ({} moved aside)",
            fixture.staged.len(),
            dir.display(),
            fixture.moved_aside.len()
        );

        Ok(fixture)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete the staged files, move the backed-up originals home and remove
    /// the backup area. Safe to call more than once.
    pub fn restore(&mut self) -> Result<(), HarnessError> {
        if self.restored {
            return Ok(());
        }

        let mut first_error = None;

        for path in &self.staged {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    first_error.get_or_insert(fixture_io("remove", path, e));
                }
            }
        }

        for name in &self.moved_aside {
            let from = self.backup_dir.join(name);
            let to = self.dir.join(name);
            if let Err(e) = fs::rename(&from, &to) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    first_error.get_or_insert(fixture_io("move back", &from, e));
                }
            }
        }

        if self.backup_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.backup_dir) {
                first_error.get_or_insert(fixture_io("remove", &self.backup_dir, e));
            }
        }

        self.restored = true;
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // Partial-stage cleanup; errors surface through the staging error itself.
    fn unwind(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("Fixture unwind incomplete: {}", e);
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = self.restore() {
                log::warn!("Fixture teardown failed for {}: {}", self.dir.display(), e);
            }
        }
    }
}

/// A directory with every permission bit cleared, for access-denial
/// scenarios. Removed on drop even when the owning test fails.
#[derive(Debug)]
pub struct DeniedDir {
    path: PathBuf,
    removed: bool,
}

impl DeniedDir {
    pub fn create(path: &Path) -> Result<DeniedDir, HarnessError> {
        fs::create_dir_all(path).map_err(|e| fixture_io("create", path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o000))
                .map_err(|e| fixture_io("chmod", path, e))?;
        }

        Ok(DeniedDir {
            path: path.to_path_buf(),
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(&mut self) -> Result<(), HarnessError> {
        if self.removed {
            return Ok(());
        }

        // Reinstate owner permissions so the directory can be traversed and
        // unlinked even if staging left content behind.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o700))
                .map_err(|e| fixture_io("chmod", &self.path, e))?;
        }

        fs::remove_dir_all(&self.path).map_err(|e| fixture_io("remove", &self.path, e))?;
        self.removed = true;
        Ok(())
    }
}

impl Drop for DeniedDir {
    fn drop(&mut self) {
        if !self.removed {
            if let Err(e) = self.remove() {
                log::warn!("Denied directory left behind: {}", e);
            }
        }
    }
}
