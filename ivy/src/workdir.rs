//! Work directory layout and lifecycle (spec.md §6, §7 error kind 2).
//!
//! Grounded on the original tool's `setup_workdir`
//! (`examples/original_source/src/yosys_ivy/main.py`): `setup` creates the
//! directory fresh (or wipes and recreates it with `-f`), seeds
//! `.gitignore`, and opens `logfile.txt`; every other command requires the
//! directory to already exist and opens the next `logfile-<n>.txt` instead.

use std::path::{Path, PathBuf};

use crate::error::IvyError;

/// The resolved paths making up a work directory, per spec.md §6's layout
/// table.
#[derive(Debug, Clone)]
pub struct WorkDir {
    pub root: PathBuf,
}

impl WorkDir {
    pub fn model_dir(&self) -> PathBuf {
        self.root.join("model")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn status_db_path(&self) -> PathBuf {
        self.root.join("status.sqlite")
    }

    pub fn export_json_path(&self) -> PathBuf {
        self.root.join("ivy_export.json")
    }

    pub fn export_script_path(&self) -> PathBuf {
        self.root.join("ivy_export.ys")
    }

    pub fn export_log_path(&self) -> PathBuf {
        self.root.join("ivy_export.log")
    }

    fn is_initialized(&self) -> bool {
        self.status_db_path().is_file()
    }
}

/// Creates a fresh work directory at `root`. If it already exists, either
/// errors (no `-f`) or removes and recreates it (`-f`), matching spec.md §7
/// error kind 2 and the original tool's `shutil.rmtree` + re-`mkdir`.
pub fn setup(root: &Path, force: bool) -> Result<WorkDir, IvyError> {
    if root.exists() {
        if force {
            std::fs::remove_dir_all(root).map_err(|e| IvyError::Io(root.to_path_buf(), e))?;
        } else {
            return Err(IvyError::WorkDirExists(root.to_path_buf()));
        }
    }
    std::fs::create_dir_all(root).map_err(|e| IvyError::Io(root.to_path_buf(), e))?;
    std::fs::write(root.join(".gitignore"), "*\n")
        .map_err(|e| IvyError::Io(root.to_path_buf(), e))?;
    for sub in ["model", "tasks", "src"] {
        std::fs::create_dir_all(root.join(sub)).map_err(|e| IvyError::Io(root.to_path_buf(), e))?;
    }
    Ok(WorkDir { root: root.to_path_buf() })
}

/// Opens an existing work directory for `run`/`prove`/`status`, erroring if
/// it hasn't been `setup` yet (spec.md §7 error kind 2).
pub fn open_existing(root: &Path) -> Result<WorkDir, IvyError> {
    let work_dir = WorkDir { root: root.to_path_buf() };
    if !root.is_dir() || !work_dir.is_initialized() {
        return Err(IvyError::WorkDirNotInitialized(root.to_path_buf()));
    }
    Ok(work_dir)
}

/// Opens (creating on first use) the per-run logfile: `logfile.txt` the
/// first time, `logfile-<n>.txt` for every subsequent run in the same work
/// directory, matching the original tool's counting-`open("x")` loop.
pub fn next_logfile_path(root: &Path) -> PathBuf {
    let first = root.join("logfile.txt");
    if !first.exists() {
        return first;
    }
    let mut counter = 1u32;
    loop {
        let candidate = root.join(format!("logfile-{counter}.txt"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
