//! The QM execution manager: owns the atom list, drives jobs end to end,
//! and memoizes results.
//!
//! A manager instance exclusively owns its atoms, selection masks, result
//! cache, and timing log. The cache is keyed by the exact serialized job
//! text, so two calls with coordinates that agree to the serializer's five
//! decimal places hit the same entry and the external program runs at most
//! once per distinct geometry. The cache lives and dies with the manager;
//! nothing is persisted across processes.
//!
//! Jobs proceed IDLE -> SERIALIZED -> RUNNING -> PARSED, with a cache hit
//! short-circuiting straight to PARSED.

use crate::artifacts;
use crate::cleanup::{self, CleanupLevel};
use crate::error::{QmError, Result};
use crate::input;
use crate::job::{JobKind, JobSpec, QmProgram};
use crate::model::{filter_by_mask, Atom, Vec3};
use crate::naming::JobFiles;
use crate::oracle::{ExternalProgram, Oracle};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Drives delegated QM jobs for one atom set.
pub struct QmManager {
    program: QmProgram,
    spec: JobSpec,
    atoms: Vec<Atom>,
    interest: Option<Vec<bool>>,
    frozen: Option<Vec<bool>>,
    oracle: Box<dyn Oracle>,
    files: JobFiles,
    cache: HashMap<String, (f64, Vec<Vec3>)>,
    times: Vec<f64>,
}

impl QmManager {
    /// Creates a manager with an explicit oracle.
    pub fn new(
        program: QmProgram,
        spec: JobSpec,
        atoms: Vec<Atom>,
        oracle: Box<dyn Oracle>,
    ) -> Self {
        let files = JobFiles::new(program, &spec.preamble);
        Self {
            program,
            spec,
            atoms,
            interest: None,
            frozen: None,
            oracle,
            files,
            cache: HashMap::new(),
            times: Vec::new(),
        }
    }

    /// Creates a manager that runs the real external program.
    pub fn external(program: QmProgram, spec: JobSpec, atoms: Vec<Atom>) -> Self {
        let oracle = Box::new(ExternalProgram::new(program));
        Self::new(program, spec, atoms, oracle)
    }

    /// Moves the job's file namespace into `dir`. Artifacts of earlier runs
    /// in the old directory are not migrated.
    pub fn set_work_dir(&mut self, dir: &Path) {
        self.files = JobFiles::in_dir(dir, self.program, &self.spec.preamble);
    }

    /// The managed atoms, in order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// File namespace of this manager's jobs.
    pub fn files(&self) -> &JobFiles {
        &self.files
    }

    /// Net charge of the QM atom set.
    pub fn charge(&self) -> i32 {
        self.spec.charge
    }

    /// Overrides the net charge for subsequent jobs.
    pub fn set_charge(&mut self, charge: i32) {
        self.spec.charge = charge;
    }

    /// Replaces or extends the managed atom list.
    ///
    /// With `replace` the incoming list supersedes the current one. Without
    /// it the atoms are appended after verifying that no label in the union
    /// is duplicated ([`QmError::DuplicateAtom`]). Either form changes the
    /// list length, so any installed interest or frozen mask is dropped.
    pub fn add_atoms(&mut self, atoms: Vec<Atom>, replace: bool) -> Result<()> {
        if replace {
            self.atoms = atoms;
        } else {
            let mut labels: Vec<&str> = self.atoms.iter().map(|a| a.label.as_str()).collect();
            for atom in &atoms {
                if labels.contains(&atom.label.as_str()) {
                    return Err(QmError::DuplicateAtom(atom.label.clone()));
                }
                labels.push(atom.label.as_str());
            }
            self.atoms.extend(atoms);
        }
        self.interest = None;
        self.frozen = None;
        Ok(())
    }

    /// Installs the interest mask selecting which atoms' results are
    /// returned to the caller.
    pub fn set_interest(&mut self, mask: Vec<bool>) -> Result<()> {
        self.check_mask(&mask)?;
        self.interest = Some(mask);
        Ok(())
    }

    /// Installs the frozen mask marking atoms held fixed during geometry
    /// optimization.
    pub fn set_frozen(&mut self, mask: Vec<bool>) -> Result<()> {
        self.check_mask(&mask)?;
        self.frozen = Some(mask);
        Ok(())
    }

    /// Updates every managed atom's position from `sites`, which must have
    /// one entry per atom.
    pub fn set_sites(&mut self, sites: &[Vec3]) -> Result<()> {
        if sites.len() != self.atoms.len() {
            return Err(QmError::ShapeMismatch {
                expected: self.atoms.len(),
                found: sites.len(),
            });
        }
        for (atom, site) in self.atoms.iter_mut().zip(sites) {
            atom.position = *site;
        }
        Ok(())
    }

    /// Runs a single-point energy/gradient job for the current geometry.
    ///
    /// When the serialized job text matches a previous call the cached
    /// result is returned unchanged, a zero duration is appended to the
    /// timing log, and the external program is not invoked.
    pub fn get_engrad(&mut self) -> Result<(f64, Vec<Vec3>)> {
        let text = input::engrad_input(&self.spec, &self.atoms);
        if let Some(cached) = self.cache.get(&text) {
            debug!("geometry unchanged, returning cached energy/gradient");
            self.times.push(0.0);
            return Ok(cached.clone());
        }
        fs::write(self.files.input(), &text)?;
        let started = Instant::now();
        self.oracle
            .run_job(JobKind::EnGrad, &self.files, &self.atoms)?;
        self.times.push(started.elapsed().as_secs_f64());
        let (energy, gradients) = artifacts::read_engrad(&self.files.engrad())?;
        info!("{}", self.timings_report(Some(energy)));
        self.cache.insert(text, (energy, gradients.clone()));
        Ok((energy, gradients))
    }

    /// Runs a geometry-optimization job and returns the optimized
    /// coordinates, filtered by the interest mask when one is installed.
    ///
    /// # Arguments
    ///
    /// * `cleanup_level` - When set, the job's scratch files are removed
    ///   afterwards at the given [`CleanupLevel`]
    /// * `allow_file_reuse` - Parse a coordinate artifact already on disk
    ///   for this job identifier instead of running anything
    ///
    /// File reuse is a resume shortcut for interrupted runs: the artifact's
    /// geometry is NOT checked against the current input geometry. When a
    /// frozen mask is installed the job embeds the matching constraint
    /// block.
    pub fn get_opt(
        &mut self,
        cleanup_level: Option<CleanupLevel>,
        allow_file_reuse: bool,
    ) -> Result<Vec<Vec3>> {
        let mut coordinates = None;
        if allow_file_reuse {
            let path = self.files.coordinates();
            if path.exists() {
                info!("reading coordinates from {}", path.display());
                coordinates = Some(artifacts::read_xyz(&path)?);
            }
        }
        let coordinates = match coordinates {
            Some(found) => found,
            None => {
                let text = input::opt_input(&self.spec, &self.atoms, self.frozen.as_deref());
                fs::write(self.files.input(), &text)?;
                let started = Instant::now();
                self.oracle
                    .run_job(JobKind::Opt, &self.files, &self.atoms)?;
                self.times.push(started.elapsed().as_secs_f64());
                artifacts::read_xyz(&self.files.coordinates())?
            }
        };
        if let Some(level) = cleanup_level {
            cleanup::run_with_settings(&self.files, level)?;
        }
        Ok(match &self.interest {
            Some(mask) => filter_by_mask(&coordinates, mask),
            None => coordinates,
        })
    }

    /// Elapsed wall-clock seconds of every job so far, cache hits included
    /// as zeros.
    pub fn timings(&self) -> &[f64] {
        &self.times
    }

    /// One-line timing summary, `last (mean)` in seconds, optionally with
    /// the latest energy. Returns `-` before the first job.
    pub fn timings_report(&self, energy: Option<f64>) -> String {
        let last = match self.times.last() {
            Some(last) => last,
            None => return "-".to_string(),
        };
        let mean = self.times.iter().sum::<f64>() / self.times.len() as f64;
        let mut report = format!("  Timings : {:.2}s ({:.2}s)", last, mean);
        if let Some(energy) = energy {
            report.push_str(&format!(" Energy : {:.6}", energy));
        }
        report
    }

    fn check_mask(&self, mask: &[bool]) -> Result<()> {
        if mask.len() != self.atoms.len() {
            return Err(QmError::ShapeMismatch {
                expected: self.atoms.len(),
                found: mask.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for QmManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QM manager - {}", self.oracle.name())?;
        writeln!(
            f,
            " charge: {} multiplicity: {}",
            self.spec.charge, self.spec.multiplicity
        )?;
        writeln!(
            f,
            " method: {} basis: \"{}\" solvent: \"{}\"",
            self.spec.method, self.spec.basis_set, self.spec.solvent_model
        )?;
        for atom in &self.atoms {
            writeln!(f, "  {} {} #{}", atom.element, atom.label, atom.serial)?;
        }
        Ok(())
    }
}
