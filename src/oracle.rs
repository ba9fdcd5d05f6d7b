//! Oracle capability: who actually produces the job's artifacts.
//!
//! The execution manager serializes the job, asks its oracle to run it, and
//! then parses whatever artifacts appeared on disk. In production the oracle
//! spawns the configured external program; for tests a deterministic stub
//! writes canned artifacts, and a random-perturbation placeholder stands in
//! for a real optimizer when no program is available. All three produce
//! on-disk artifacts, so every variant exercises the same parsing path.

use crate::error::{QmError, Result};
use crate::invoker;
use crate::job::{JobKind, QmProgram};
use crate::model::Atom;
use crate::naming::JobFiles;
use rand::Rng;
use std::cell::Cell;
use std::fmt::Write as _;
use std::fs;
use std::rc::Rc;

/// Produces the artifacts of one job.
pub trait Oracle {
    /// Short name used in logs and the manager's `Display` output.
    fn name(&self) -> &str;

    /// Runs a job of the given kind. On success the artifacts the kind
    /// implies (`.engrad` for EnGrad, `.xyz` for Opt) exist under `files`.
    fn run_job(&self, kind: JobKind, files: &JobFiles, atoms: &[Atom]) -> Result<()>;
}

/// Runs the real external program resolved from the environment.
#[derive(Debug, Clone)]
pub struct ExternalProgram {
    program: QmProgram,
}

impl ExternalProgram {
    /// Creates an oracle for the given program.
    pub fn new(program: QmProgram) -> Self {
        Self { program }
    }
}

impl Oracle for ExternalProgram {
    fn name(&self) -> &str {
        self.program.file_prefix()
    }

    fn run_job(&self, _kind: JobKind, files: &JobFiles, _atoms: &[Atom]) -> Result<()> {
        let executable = self.program.executable()?;
        let input = files.input();
        let input_arg = input.to_string_lossy();
        invoker::run(
            &executable,
            &[input_arg.as_ref()],
            &files.log(),
            self.program.failure_markers(),
        )
    }
}

/// Writes caller-supplied artifact texts instead of running anything.
///
/// Keeps a shared invocation counter so tests can assert how many times the
/// manager actually reached the oracle (e.g. zero on a cache hit).
#[derive(Debug, Default)]
pub struct DeterministicStub {
    engrad: Option<String>,
    coordinates: Option<String>,
    invocations: Rc<Cell<usize>>,
}

impl DeterministicStub {
    /// Creates a stub with no artifacts configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `.engrad` text written on EnGrad jobs.
    pub fn with_engrad(mut self, text: &str) -> Self {
        self.engrad = Some(text.to_string());
        self
    }

    /// Sets the `.xyz` text written on Opt jobs.
    pub fn with_coordinates(mut self, text: &str) -> Self {
        self.coordinates = Some(text.to_string());
        self
    }

    /// Handle on the invocation counter; clone it before handing the stub
    /// to a manager.
    pub fn counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.invocations)
    }
}

impl Oracle for DeterministicStub {
    fn name(&self) -> &str {
        "stub"
    }

    fn run_job(&self, kind: JobKind, files: &JobFiles, _atoms: &[Atom]) -> Result<()> {
        self.invocations.set(self.invocations.get() + 1);
        fs::write(files.log(), "deterministic stub oracle\n")?;
        let (text, target) = match kind {
            JobKind::EnGrad => (self.engrad.as_ref(), files.engrad()),
            JobKind::Opt => (self.coordinates.as_ref(), files.coordinates()),
        };
        let text = text.ok_or_else(|| {
            QmError::Configuration(format!(
                "stub oracle has no {} artifact configured",
                kind.keyword()
            ))
        })?;
        fs::write(target, text)?;
        Ok(())
    }
}

/// Placeholder optimizer that nudges every coordinate by uniform noise in
/// (-0.05, 0.05) Angstrom.
///
/// Supports Opt jobs only; it has no gradients to offer. Must be selected
/// explicitly; production paths use [`ExternalProgram`].
#[derive(Debug, Clone, Default)]
pub struct RandomPerturbation;

impl Oracle for RandomPerturbation {
    fn name(&self) -> &str {
        "perturb"
    }

    fn run_job(&self, kind: JobKind, files: &JobFiles, atoms: &[Atom]) -> Result<()> {
        if kind != JobKind::Opt {
            return Err(QmError::Configuration(
                "random-perturbation oracle cannot produce gradients".to_string(),
            ));
        }
        let mut rng = rand::thread_rng();
        let mut text = format!("{}\nperturbed coordinates\n", atoms.len());
        for atom in atoms {
            let mut shifted = [0.0f64; 3];
            for (slot, value) in shifted.iter_mut().zip(atom.position.iter()) {
                *slot = value + (rng.gen::<f64>() - 0.5) / 10.0;
            }
            writeln!(
                text,
                "{} {:.8} {:.8} {:.8}",
                atom.element, shifted[0], shifted[1], shifted[2]
            )
            .expect("writing to a String cannot fail");
        }
        fs::write(files.coordinates(), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vec3;
    use tempfile::TempDir;

    fn atoms() -> Vec<Atom> {
        vec![
            Atom::new("O", "O1", 0, Vec3::new(0.0, 0.0, 0.0)),
            Atom::new("H", "H1", 1, Vec3::new(1.0, 0.0, 0.0)),
        ]
    }

    #[test]
    fn test_stub_counts_invocations_and_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let files = JobFiles::in_dir(dir.path(), QmProgram::Orca, "t");
        let stub = DeterministicStub::new().with_coordinates("2\n\nO 0 0 0\nH 1 0 0\n");
        let counter = stub.counter();
        stub.run_job(JobKind::Opt, &files, &atoms()).unwrap();
        stub.run_job(JobKind::Opt, &files, &atoms()).unwrap();
        assert_eq!(counter.get(), 2);
        assert!(files.coordinates().exists());
        assert!(files.log().exists());
    }

    #[test]
    fn test_stub_without_engrad_artifact_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let files = JobFiles::in_dir(dir.path(), QmProgram::Orca, "t");
        let stub = DeterministicStub::new();
        assert!(matches!(
            stub.run_job(JobKind::EnGrad, &files, &atoms()),
            Err(QmError::Configuration(_))
        ));
    }

    #[test]
    fn test_perturbation_stays_within_bounds() {
        let dir = TempDir::new().unwrap();
        let files = JobFiles::in_dir(dir.path(), QmProgram::Orca, "t");
        RandomPerturbation
            .run_job(JobKind::Opt, &files, &atoms())
            .unwrap();
        let shifted = crate::artifacts::read_xyz(&files.coordinates()).unwrap();
        assert_eq!(shifted.len(), 2);
        for (atom, new) in atoms().iter().zip(&shifted) {
            for (a, b) in atom.position.iter().zip(new.iter()) {
                assert!((a - b).abs() <= 0.05);
            }
        }
    }

    #[test]
    fn test_perturbation_rejects_engrad() {
        let dir = TempDir::new().unwrap();
        let files = JobFiles::in_dir(dir.path(), QmProgram::Orca, "t");
        assert!(matches!(
            RandomPerturbation.run_job(JobKind::EnGrad, &files, &atoms()),
            Err(QmError::Configuration(_))
        ));
    }
}
