//! Private per-run staging directory.
//!
//! Every file the navigator consumes is written beneath one directory named
//! after the run id and counter. When the execution environment is enabled
//! the directory is mounted into the container at [`CONTAINER_ROOT`] and every
//! staged path is handed out in both its host and in-container form.

use crate::model::{NavigatorSettings, RunId};
use crate::runner::error::{ErrorCode, RunError, RunResult};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::fs::{DirBuilder, OpenOptions};
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

/// Mount point of the run directory inside the execution environment.
pub const CONTAINER_ROOT: &str = "/tmp/navigator-run";

pub const PLAYBOOK_FILE: &str = "playbook.yaml";
pub const SETTINGS_FILE: &str = "ansible-navigator.yaml";
pub const ARTIFACT_FILE: &str = "playbook-artifact.json";
pub const LOG_FILE: &str = "ansible-navigator.log";
pub const INVENTORIES_DIR: &str = "inventories";
pub const PREVIOUS_INVENTORIES_DIR: &str = "previous-inventories";
pub const PRIVATE_KEYS_DIR: &str = "private-keys";
pub const KNOWN_HOSTS_DIR: &str = "known-hosts";
pub const KNOWN_HOSTS_FILE: &str = "known-hosts/known_hosts";
pub const EXTRA_VARS_DIR: &str = "extra-vars";
pub const EXTRA_VARS_FILE: &str = "extra-vars/extra-vars.json";

const FIXED_SUBDIRS: [&str; 4] = [
    INVENTORIES_DIR,
    PRIVATE_KEYS_DIR,
    KNOWN_HOSTS_DIR,
    EXTRA_VARS_DIR,
];

/// How staged paths are presented to the navigator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathMode {
    /// The navigator runs on the host; paths are used as-is.
    Direct,
    /// The navigator runs in a container; paths are rebased onto [`CONTAINER_ROOT`].
    Container,
}

/// A path inside the run directory, in host and navigator-visible form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedPath {
    pub host: PathBuf,
    pub resolved: PathBuf,
}

impl StagedPath {
    pub fn resolved_display(&self) -> String {
        self.resolved.display().to_string()
    }

    pub fn host_display(&self) -> String {
        self.host.display().to_string()
    }
}

#[derive(Debug)]
pub struct RunDirectory {
    root: PathBuf,
    mode: PathMode,
}

impl RunDirectory {
    /// Directory name for a run; distinct for every (id, counter) pair.
    pub fn name_for(id: RunId, run_counter: u64) -> String {
        format!("navigator-run-{id}-{run_counter}")
    }

    /// Create the run directory under `base` and fix its path mode.
    ///
    /// In container mode the directory itself is registered as a volume
    /// mount on `settings`.
    pub fn create(
        base: &Path,
        id: RunId,
        run_counter: u64,
        settings: &mut NavigatorSettings,
    ) -> RunResult<Self> {
        let meta = fs::metadata(base).map_err(|err| {
            RunError::new(
                ErrorCode::RunDirectory,
                "base run directory is not accessible",
                Some(serde_json::json!({"base": base, "source": err.to_string()})),
            )
        })?;
        if !meta.is_dir() {
            return Err(RunError::staging(
                "base run directory is not a directory",
                serde_json::json!({"base": base}),
            ));
        }

        let root = base.join(Self::name_for(id, run_counter));
        create_private_dir(&root).map_err(|err| {
            RunError::new(
                ErrorCode::RunDirectory,
                "failed to create run directory",
                Some(serde_json::json!({"path": root, "source": err.to_string()})),
            )
        })?;

        let mode = if settings.enabled {
            PathMode::Container
        } else {
            PathMode::Direct
        };
        let dir = Self { root, mode };

        for sub in FIXED_SUBDIRS {
            if let Err(err) = dir.create_subdir(sub) {
                let _ = fs::remove_dir_all(&dir.root);
                return Err(err);
            }
        }
        if mode == PathMode::Container {
            settings.add_volume_mount(dir.root.clone(), CONTAINER_ROOT);
        }

        debug!(path = %dir.root.display(), mode = ?mode, "created run directory");
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Host and resolved form of `relative`, without touching the filesystem.
    pub fn stage(&self, relative: impl AsRef<Path>) -> StagedPath {
        let relative = relative.as_ref();
        let host = self.root.join(relative);
        let resolved = match self.mode {
            PathMode::Direct => host.clone(),
            PathMode::Container => Path::new(CONTAINER_ROOT).join(relative),
        };
        StagedPath { host, resolved }
    }

    pub fn create_subdir(&self, relative: impl AsRef<Path>) -> RunResult<StagedPath> {
        let relative = relative.as_ref();
        ensure_relative(relative)?;
        let staged = self.stage(relative);
        create_private_dir(&staged.host).map_err(|err| {
            RunError::new(
                ErrorCode::RunDirectory,
                "failed to create run subdirectory",
                Some(serde_json::json!({"path": staged.host, "source": err.to_string()})),
            )
        })?;
        Ok(staged)
    }

    /// Write an owner-only file beneath the run directory.
    pub fn write_file(&self, relative: impl AsRef<Path>, data: &[u8]) -> RunResult<StagedPath> {
        let relative = relative.as_ref();
        ensure_relative(relative)?;
        let staged = self.stage(relative);
        write_private_file(&staged.host, data).map_err(|err| {
            RunError::new(
                ErrorCode::Io,
                "failed to write run file",
                Some(serde_json::json!({"path": staged.host, "source": err.to_string()})),
            )
        })?;
        Ok(staged)
    }

    /// Recursively delete the directory.
    pub fn remove(&self) -> RunResult<()> {
        fs::remove_dir_all(&self.root).map_err(|err| {
            RunError::new(
                ErrorCode::Cleanup,
                "failed to remove run directory",
                Some(serde_json::json!({"path": self.root, "source": err.to_string()})),
            )
        })?;
        debug!(path = %self.root.display(), "removed run directory");
        Ok(())
    }
}

/// Reject anything that could address a path outside the run directory.
fn ensure_relative(relative: &Path) -> RunResult<()> {
    let mut components = relative.components().peekable();
    if components.peek().is_none() {
        return Err(RunError::new(
            ErrorCode::InvalidName,
            "staged path is empty",
            None,
        ));
    }
    if components.all(|component| matches!(component, Component::Normal(_))) {
        Ok(())
    } else {
        Err(RunError::new(
            ErrorCode::InvalidName,
            "staged path must stay inside the run directory",
            Some(serde_json::json!({"path": relative})),
        ))
    }
}

fn create_private_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        DirBuilder::new().mode(0o700).create(path)
    }

    #[cfg(not(unix))]
    {
        fs::create_dir(path)
    }
}

fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;

    #[cfg(not(unix))]
    let mut file = fs::File::create(path)?;

    file.write_all(data)?;
    file.flush()
}
