//! Splices QM gradients into the classical restraints result.
//!
//! The adapter sits between the classical restraints engine (an external
//! collaborator reached through [`RestraintsEngine`]) and the execution
//! manager. It owns the mapping from QM-atom order to global atom indices,
//! extracts the QM coordinates from the caller's global array, delegates to
//! the manager, and writes the returned gradients back into the matching
//! global slots.
//!
//! The QM gradient OVERWRITES the classical gradient for atoms inside the
//! QM region; the two are never summed, and the classical energy is
//! returned unchanged.

use crate::error::{QmError, Result};
use crate::job::{QmParams, QmProgram};
use crate::manager::QmManager;
use crate::model::{Atom, Vec3};

/// Energy and per-atom gradients over the full structure, as produced by
/// the classical engine.
#[derive(Debug, Clone)]
pub struct SitesEnergy {
    /// Total classical energy.
    pub energy: f64,
    /// One gradient per global atom; empty when gradients were not
    /// requested.
    pub gradients: Vec<Vec3>,
}

/// The classical restraints engine this crate delegates the baseline
/// calculation to.
pub trait RestraintsEngine {
    /// Evaluates energy (and gradients, when requested) over all atoms.
    fn energies_sites(&self, sites: &[Vec3], compute_gradients: bool) -> SitesEnergy;
}

/// One QM region embedded in a larger classical structure.
pub struct QmRegion {
    manager: QmManager,
    serials: Vec<usize>,
}

impl QmRegion {
    /// Wraps a manager whose atoms carry their global serial numbers.
    pub fn new(manager: QmManager) -> Self {
        let serials = manager.atoms().iter().map(|a| a.serial).collect();
        Self { manager, serials }
    }

    /// Builds a region from the host's parameter object, running the real
    /// external program.
    ///
    /// Fails with [`QmError::Configuration`] when QM delegation is disabled
    /// or no selection string is present; the selection itself is resolved
    /// into `atoms` by the caller.
    pub fn from_params(
        program: QmProgram,
        params: &QmParams,
        atoms: Vec<Atom>,
        preamble: Option<&str>,
    ) -> Result<Self> {
        if !params.qm_enabled {
            return Err(QmError::Configuration(
                "QM delegation is not enabled".to_string(),
            ));
        }
        if params.selection.trim().is_empty() {
            return Err(QmError::Configuration(
                "QM atom selection is empty".to_string(),
            ));
        }
        let spec = params.to_job_spec(preamble)?;
        Ok(Self::new(QmManager::external(program, spec, atoms)))
    }

    /// The wrapped execution manager.
    pub fn manager(&self) -> &QmManager {
        &self.manager
    }

    /// Mutable access to the wrapped manager, e.g. for installing masks.
    pub fn manager_mut(&mut self) -> &mut QmManager {
        &mut self.manager
    }

    /// Global indices of the QM atoms, in QM-atom order.
    pub fn serials(&self) -> &[usize] {
        &self.serials
    }

    /// Evaluates the classical baseline and, when gradients are requested,
    /// replaces the gradient of every QM atom with the QM-derived one.
    pub fn compute<E: RestraintsEngine + ?Sized>(
        &mut self,
        engine: &E,
        sites: &[Vec3],
        compute_gradients: bool,
    ) -> Result<SitesEnergy> {
        let mut result = engine.energies_sites(sites, compute_gradients);
        if !compute_gradients {
            return Ok(result);
        }

        let mut qm_sites = Vec::with_capacity(self.serials.len());
        for &serial in &self.serials {
            let site = sites.get(serial).ok_or(QmError::ShapeMismatch {
                expected: serial + 1,
                found: sites.len(),
            })?;
            qm_sites.push(*site);
        }
        self.manager.set_sites(&qm_sites)?;
        let (_energy, gradients) = self.manager.get_engrad()?;
        for (&serial, gradient) in self.serials.iter().zip(&gradients) {
            let slot = result
                .gradients
                .get_mut(serial)
                .ok_or(QmError::ShapeMismatch {
                    expected: serial + 1,
                    found: 0,
                })?;
            *slot = *gradient;
        }
        Ok(result)
    }
}
