//! Error taxonomy shared by every stage of a QM delegation.
//!
//! A delegated calculation can fail while the job is being described
//! (configuration, selection masks), while the external program runs, or
//! while its output artifacts are read back. Each failure mode has its own
//! variant so callers can distinguish "the program crashed" from "the
//! program ran but produced garbage". None of these are retried: a failure
//! aborts the host energy/gradient evaluation and leaves the captured log
//! file behind for offline diagnosis.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing, running, or harvesting a QM job.
#[derive(Error, Debug)]
pub enum QmError {
    /// Job specification is unset or invalid (e.g., unknown program name,
    /// missing executable environment variable, zero multiplicity).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A selection mask or coordinate set does not match the managed atom
    /// list in length.
    #[error("shape mismatch: expected {expected} entries, got {found}")]
    ShapeMismatch {
        /// Number of managed atoms.
        expected: usize,
        /// Length of the offending mask or coordinate sequence.
        found: usize,
    },

    /// An atom with the same label is already managed.
    #[error("duplicate atom in selection: {0}")]
    DuplicateAtom(String),

    /// The external program wrote to standard error or printed a known
    /// failure marker. The payload is the diagnostic line.
    #[error("external program failed: {0}")]
    ExternalToolFailure(String),

    /// An expected output artifact is missing from the working directory.
    #[error("QM output file not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// An output artifact exists but does not have the expected structure.
    #[error("malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact {
        /// Path of the unparseable file.
        path: PathBuf,
        /// What the parser expected and did not find.
        reason: String,
    },

    /// Underlying I/O failure while writing inputs or reading artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QmError>;
