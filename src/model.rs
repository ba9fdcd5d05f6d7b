//! Atom model and selection-mask utilities.
//!
//! The execution manager owns an ordered list of [`Atom`]s together with two
//! independent boolean masks over that list: an *interest* mask selecting
//! which atoms' results are handed back to the caller, and a *frozen* mask
//! marking atoms held fixed during geometry optimization. Masks always have
//! exactly one entry per managed atom; that invariant is checked at the point
//! where a mask is installed, not here.

use nalgebra::Vector3;

/// Cartesian triple used for coordinates and gradients, in Angstrom-based
/// units.
pub type Vec3 = Vector3<f64>;

/// A single managed atom.
///
/// Identity (element, label, serial) is immutable once constructed; only the
/// position changes, exactly once per delegated calculation when the caller
/// supplies fresh coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Chemical element symbol, e.g. "S" or "O".
    pub element: String,
    /// Identifying label, unique within one managed list. Used for duplicate
    /// detection and for the traceability comments in serialized job inputs.
    pub label: String,
    /// Index of this atom in the *global* structure the caller manages.
    pub serial: usize,
    /// Current Cartesian position in Angstrom.
    pub position: Vec3,
}

impl Atom {
    /// Creates an atom from its element symbol, label, global serial, and
    /// position.
    pub fn new(element: &str, label: &str, serial: usize, position: Vec3) -> Self {
        Self {
            element: element.to_string(),
            label: label.to_string(),
            serial,
            position,
        }
    }
}

/// Keeps the entries of `items` whose mask entry is `true`, in the original
/// order.
///
/// Zips to the shorter of the two sequences; length agreement is the
/// caller's invariant and is enforced where masks are installed.
pub fn filter_by_mask<T: Clone>(items: &[T], mask: &[bool]) -> Vec<T> {
    mask.iter()
        .zip(items)
        .filter(|(sel, _)| **sel)
        .map(|(_, item)| item.clone())
        .collect()
}
