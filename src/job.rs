//! Job specification: which program to run, with what chemistry, under
//! which file namespace.
//!
//! Every delegated calculation is described by a [`JobSpec`]: method, basis
//! set, solvent model, net charge, spin multiplicity, and the *preamble*, a
//! unique identifier that namespaces every file the job touches. Two manager
//! instances with different preambles can share a working directory without
//! colliding; two instances sharing a preamble will corrupt each other, and
//! guaranteeing uniqueness is the caller's responsibility.

use crate::error::{QmError, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Environment variable holding the path of the ORCA binary.
pub const ORCA_ENV_VAR: &str = "QMLINK_ORCA";

/// Supported external quantum chemistry programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QmProgram {
    /// The ORCA package. Invoked with the job input filename as its sole
    /// argument; energies and gradients are harvested from its `.engrad`
    /// and `.xyz` output files.
    Orca,
}

impl QmProgram {
    /// Resolves a program from its configured name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "orca" => Ok(Self::Orca),
            _ => Err(QmError::Configuration(format!(
                "QM program not found or set \"{}\"",
                name
            ))),
        }
    }

    /// Prefix used for every on-disk artifact of this program.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Orca => "orca",
        }
    }

    /// Path of the program binary, taken from the environment.
    pub fn executable(self) -> Result<String> {
        let var = match self {
            Self::Orca => ORCA_ENV_VAR,
        };
        env::var(var).map_err(|_| {
            QmError::Configuration(format!("{} is not set to the program binary", var))
        })
    }

    /// Standard-output substrings that mark a failed run of this program.
    pub fn failure_markers(self) -> &'static [&'static str] {
        match self {
            Self::Orca => &[
                "ORCA finished by error termination in GSTEP",
                "-> impossible",
                "SCF NOT CONVERGED AFTER",
            ],
        }
    }
}

impl fmt::Display for QmProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

/// The two calculation types a job can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Single-point energy plus per-atom gradient.
    EnGrad,
    /// Geometry optimization producing optimized coordinates.
    Opt,
}

impl JobKind {
    /// Keyword placed on the job header line.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::EnGrad => "EnGrad",
            Self::Opt => "Opt",
        }
    }
}

/// Chemistry and namespace of one delegated job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// QM method name, e.g. "PM3" or "B3LYP".
    pub method: String,
    /// Basis set name; empty when the method implies one.
    pub basis_set: String,
    /// Solvent model name; empty for gas phase.
    pub solvent_model: String,
    /// Net charge of the QM atom set.
    pub charge: i32,
    /// Spin multiplicity (2S+1), at least 1. Consistency with the atom
    /// set's electron count is the caller's responsibility.
    pub multiplicity: u32,
    /// Unique job identifier namespacing all files of this job.
    pub preamble: String,
}

impl JobSpec {
    /// Creates a job specification.
    ///
    /// `basis_set` and `solvent_model` may be `None`, which normalizes to an
    /// empty string. When `preamble` is `None` a random identifier is
    /// generated. Fails with [`QmError::Configuration`] when the method is
    /// empty or the multiplicity is zero.
    pub fn new(
        method: &str,
        basis_set: Option<&str>,
        solvent_model: Option<&str>,
        charge: i32,
        multiplicity: u32,
        preamble: Option<&str>,
    ) -> Result<Self> {
        if method.trim().is_empty() {
            return Err(QmError::Configuration("QM method is not set".to_string()));
        }
        if multiplicity == 0 {
            return Err(QmError::Configuration(
                "spin multiplicity must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            method: method.to_string(),
            basis_set: basis_set.unwrap_or("").to_string(),
            solvent_model: solvent_model.unwrap_or("").to_string(),
            charge,
            multiplicity,
            preamble: preamble.map(str::to_string).unwrap_or_else(random_preamble),
        })
    }
}

/// Parameter object handed in by the host calculation.
///
/// The `selection` string is resolved into an interest mask by the caller's
/// own selection machinery; this crate only carries it along.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QmParams {
    /// QM method name.
    pub method: String,
    /// Basis set name, possibly empty.
    pub basis_set: String,
    /// Solvent model name, possibly empty.
    pub solvent_model: String,
    /// Net charge of the QM region.
    pub charge: i32,
    /// Spin multiplicity of the QM region.
    pub multiplicity: u32,
    /// Whether QM delegation is enabled at all.
    pub qm_enabled: bool,
    /// Atom selection string defining the QM region.
    pub selection: String,
}

impl QmParams {
    /// Converts the parameter object into a job specification under the
    /// given preamble.
    pub fn to_job_spec(&self, preamble: Option<&str>) -> Result<JobSpec> {
        JobSpec::new(
            &self.method,
            Some(self.basis_set.as_str()),
            Some(self.solvent_model.as_str()),
            self.charge,
            self.multiplicity,
            preamble,
        )
    }
}

fn random_preamble() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase()
}
