//! Artifact path naming for one job.
//!
//! Every file a job touches is named `{program}_{preamble}.{ext}` inside the
//! job's working directory. The preamble is threaded in explicitly at
//! construction and never inferred from ambient state, so two managers with
//! distinct preambles can share a directory safely.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use qmlink::job::QmProgram;
//! use qmlink::naming::JobFiles;
//!
//! let files = JobFiles::new(QmProgram::Orca, "so4");
//! assert_eq!(files.input(), Path::new("./orca_so4.in").to_path_buf());
//! assert_eq!(files.engrad(), Path::new("./orca_so4.engrad").to_path_buf());
//! ```

use crate::job::QmProgram;
use std::path::{Path, PathBuf};

/// Computes the on-disk paths of one job's artifacts.
#[derive(Debug, Clone)]
pub struct JobFiles {
    dir: PathBuf,
    prefix: String,
}

impl JobFiles {
    /// Creates a namespace rooted in the current working directory.
    pub fn new(program: QmProgram, preamble: &str) -> Self {
        Self::in_dir(Path::new("."), program, preamble)
    }

    /// Creates a namespace rooted in `dir`.
    pub fn in_dir(dir: &Path, program: QmProgram, preamble: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: format!("{}_{}", program.file_prefix(), preamble),
        }
    }

    /// Directory all artifacts live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filename prefix shared by every artifact of this job.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `filename` belongs to this job's namespace.
    pub fn owns(&self, filename: &str) -> bool {
        filename.starts_with(&self.prefix)
    }

    /// Job input file, written by the serializer.
    ///
    /// Format: `{dir}/{program}_{preamble}.in`
    pub fn input(&self) -> PathBuf {
        self.with_ext("in")
    }

    /// Captured standard output of the external run.
    ///
    /// Format: `{dir}/{program}_{preamble}.log`
    pub fn log(&self) -> PathBuf {
        self.with_ext("log")
    }

    /// Energy/gradient artifact produced by an EnGrad job.
    ///
    /// Format: `{dir}/{program}_{preamble}.engrad`
    pub fn engrad(&self) -> PathBuf {
        self.with_ext("engrad")
    }

    /// Optimized-coordinate artifact produced by an Opt job.
    ///
    /// Format: `{dir}/{program}_{preamble}.xyz`
    pub fn coordinates(&self) -> PathBuf {
        self.with_ext("xyz")
    }

    /// Optimization trajectory. Not parsed; renamed on cleanup so viewers
    /// recognize it.
    ///
    /// Format: `{dir}/{program}_{preamble}.trj`
    pub fn trajectory(&self) -> PathBuf {
        self.with_ext("trj")
    }

    /// Viewable name the trajectory is renamed to during cleanup.
    ///
    /// Format: `{dir}/{program}_{preamble}_trj.xyz`
    pub fn renamed_trajectory(&self) -> PathBuf {
        self.dir.join(format!("{}_trj.xyz", self.prefix))
    }

    fn with_ext(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.prefix, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        let files = JobFiles::new(QmProgram::Orca, "test");
        assert_eq!(files.input(), Path::new("./orca_test.in"));
        assert_eq!(files.log(), Path::new("./orca_test.log"));
        assert_eq!(files.engrad(), Path::new("./orca_test.engrad"));
        assert_eq!(files.coordinates(), Path::new("./orca_test.xyz"));
        assert_eq!(files.trajectory(), Path::new("./orca_test.trj"));
        assert_eq!(files.renamed_trajectory(), Path::new("./orca_test_trj.xyz"));
    }

    #[test]
    fn test_ownership_is_prefix_based() {
        let files = JobFiles::new(QmProgram::Orca, "so4");
        assert!(files.owns("orca_so4.engrad"));
        assert!(files.owns("orca_so4_trj.xyz"));
        assert!(!files.owns("orca_other.engrad"));
    }

    #[test]
    fn test_rooted_in_directory() {
        let files = JobFiles::in_dir(Path::new("/tmp/work"), QmProgram::Orca, "a1");
        assert_eq!(files.input(), Path::new("/tmp/work/orca_a1.in"));
    }
}
