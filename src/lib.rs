#![deny(missing_docs)]

//! qmlink - Quantum-Mechanics Delegation for Classical Restraints
//!
//! qmlink coordinates the delegation of a subset of atoms in a larger
//! molecular-mechanics energy/gradient calculation to an external quantum
//! chemistry program, then splices the QM-computed gradients back into the
//! classical result.
//!
//! # Overview
//!
//! A [`manager::QmManager`] owns an ordered list of QM atoms together with
//! two selection masks (interest and frozen), serializes the current
//! geometry into the external program's input format, runs the program as a
//! subprocess while scanning its streamed output for failure markers, and
//! parses the energy, gradient, and optimized-coordinate artifacts back
//! into structured data. Results are memoized on the exact serialized input
//! text, so repeated calls with an unchanged geometry never invoke the
//! external program twice.
//!
//! Above the manager, a [`restraints::QmRegion`] knows which global atom
//! index each QM atom corresponds to; it pulls the QM coordinates out of
//! the caller's global array, delegates, and overwrites the classical
//! gradients of the QM atoms with the QM-derived ones.
//!
//! The external program is treated as an opaque oracle: given a geometry,
//! method, basis, charge, and multiplicity it produces an energy, a
//! gradient, and/or an optimized geometry, eventually, or fails. The
//! [`oracle::Oracle`] trait makes that boundary explicit and injectable, so
//! tests substitute a deterministic stub for the real binary.
//!
//! # Quick Start
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use qmlink::job::{JobSpec, QmProgram};
//! use qmlink::manager::QmManager;
//! use qmlink::model::Atom;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let atoms = vec![
//!         Atom::new("O", "O1", 0, Vector3::new(0.0, 0.0, 0.0)),
//!         Atom::new("H", "H1", 1, Vector3::new(0.757, 0.586, 0.0)),
//!         Atom::new("H", "H2", 2, Vector3::new(-0.757, 0.586, 0.0)),
//!     ];
//!     let spec = JobSpec::new("B3LYP", Some("def2-SVP"), None, 0, 1, Some("water"))?;
//!     let mut qmm = QmManager::external(QmProgram::Orca, spec, atoms);
//!     let (energy, gradients) = qmm.get_engrad()?;
//!     println!("E = {energy}, {} gradients", gradients.len());
//!     Ok(())
//! }
//! ```
//!
//! # Execution model
//!
//! Everything is single-threaded, synchronous, and blocking: an external
//! invocation occupies the calling thread for the program's full runtime,
//! and no timeout is enforced here. Each manager instance owns a private
//! cache, timing log, and file namespace. Managers with distinct job
//! identifiers can share a working directory; callers must guarantee that
//! identifiers are unique, since nothing here locks the filesystem.
//!
//! # Modules
//!
//! - [`model`] - atoms and selection-mask utilities
//! - [`job`] - job specification, program registry, parameter object
//! - [`naming`] - artifact path namespacing per job identifier
//! - [`input`] - geometry serialization into job input text
//! - [`invoker`] - subprocess execution with failure-marker scanning
//! - [`artifacts`] - parsing of `.engrad` and `.xyz` output artifacts
//! - [`oracle`] - the external-program boundary and its test stand-ins
//! - [`manager`] - the QM execution manager (state, cache, timings)
//! - [`restraints`] - gradient merge into the classical result
//! - [`cleanup`] - scratch-file removal with a configurable keep-list
//! - [`settings`] - INI settings layer for site-specific tuning
//! - [`error`] - the error taxonomy

pub mod artifacts;
/// Scratch-file removal for finished jobs.
pub mod cleanup;
pub mod error;
pub mod input;
pub mod invoker;
pub mod job;
pub mod manager;
pub mod model;
/// Artifact path naming per job identifier.
pub mod naming;
pub mod oracle;
pub mod restraints;
/// INI settings layer.
pub mod settings;

pub use error::{QmError, Result};
pub use manager::QmManager;
pub use model::Atom;
