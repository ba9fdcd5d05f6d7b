//! Removes a finished job's scratch files from the working directory.
//!
//! External programs leave many intermediate files behind (integrals,
//! restart data, temporary matrices). Cleanup walks the working directory
//! and removes every file belonging to the job's namespace, subject to the
//! requested level:
//!
//! - [`CleanupLevel::Most`] keeps the essential extensions
//!   (`.xyz .log .in .engrad .trj`, plus any extensions configured in the
//!   settings file) and deletes the rest.
//! - [`CleanupLevel::All`] deletes everything in the namespace.
//!
//! When no level is requested nothing is removed. Before any deletion the
//! `.trj` trajectory is renamed to `{prefix}_trj.xyz` so molecular viewers
//! recognize it.

use crate::error::Result;
use crate::naming::JobFiles;
use crate::settings::Settings;
use log::{debug, info};
use std::fs;

/// How aggressively a job's files are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupLevel {
    /// Keep essential extensions, delete everything else in the namespace.
    Most,
    /// Delete every file in the namespace.
    All,
}

/// Extensions always preserved at level `Most`.
pub const MOST_KEEPERS: [&str; 5] = ["xyz", "log", "in", "engrad", "trj"];

/// Removes the job's files at the given level, honoring the keep-extensions
/// configured in the settings file.
pub fn run_with_settings(files: &JobFiles, level: CleanupLevel) -> Result<()> {
    let settings = Settings::load_or_default();
    run(files, level, &settings.cleanup.preserve_extensions)
}

/// Removes the job's files at the given level.
///
/// `extra_keep` extends the essential keep-list at level `Most`; it is
/// ignored at level `All`.
pub fn run(files: &JobFiles, level: CleanupLevel, extra_keep: &[String]) -> Result<()> {
    let trajectory = files.trajectory();
    if trajectory.exists() {
        let renamed = files.renamed_trajectory();
        info!(
            "renaming {} to {}",
            trajectory.display(),
            renamed.display()
        );
        fs::rename(&trajectory, &renamed)?;
    }

    let mut removed = 0usize;
    for entry in fs::read_dir(files.dir())? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let filename = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !files.owns(&filename) {
            continue;
        }
        if level == CleanupLevel::Most {
            let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
            if MOST_KEEPERS.contains(&ext) || extra_keep.iter().any(|k| k == ext) {
                continue;
            }
        }
        debug!("removing {}", path.display());
        fs::remove_file(&path)?;
        removed += 1;
    }
    info!("cleanup removed {} file(s) for {}", removed, files.prefix());
    Ok(())
}
