//! Serializes the managed geometry into the external program's input text.
//!
//! The serialized text is also the cache key for energy/gradient results, so
//! the format is deliberately deterministic: coordinates are written with
//! exactly five decimal places, which makes the key insensitive to
//! floating-point noise below that precision. Each atom line carries the
//! atom's label and sequence index as a trailing comment for traceability
//! when a job has to be diagnosed by hand.

use crate::job::{JobKind, JobSpec};
use crate::model::Atom;
use std::fmt::Write;

/// Builds the input text for a single-point energy/gradient job.
pub fn engrad_input(spec: &JobSpec, atoms: &[Atom]) -> String {
    let mut out = header(spec, JobKind::EnGrad);
    out.push_str(&coordinate_block(spec, atoms));
    out
}

/// Builds the input text for a geometry-optimization job.
///
/// When a frozen mask is supplied, a constraint block listing the 0-based
/// indices of frozen atoms is appended after the coordinates.
pub fn opt_input(spec: &JobSpec, atoms: &[Atom], frozen: Option<&[bool]>) -> String {
    let mut out = header(spec, JobKind::Opt);
    out.push_str(&coordinate_block(spec, atoms));
    if let Some(mask) = frozen {
        out.push_str(&freeze_block(mask, atoms));
    }
    out
}

/// Header line encoding method, basis, solvent, and calculation type.
fn header(spec: &JobSpec, kind: JobKind) -> String {
    format!(
        "! {} {} {} {}\n\n",
        spec.method,
        spec.basis_set,
        spec.solvent_model,
        kind.keyword()
    )
}

/// Charge/multiplicity line, one annotated line per atom, sentinel `*`.
fn coordinate_block(spec: &JobSpec, atoms: &[Atom]) -> String {
    let mut out = format!("* xyz {} {}\n", spec.charge, spec.multiplicity);
    for (i, atom) in atoms.iter().enumerate() {
        writeln!(
            out,
            " {} {:.5} {:.5} {:.5} # {} {}",
            atom.element, atom.position.x, atom.position.y, atom.position.z, atom.label, i
        )
        .expect("writing to a String cannot fail");
    }
    out.push_str("*\n");
    out
}

fn freeze_block(mask: &[bool], atoms: &[Atom]) -> String {
    let mut out = String::from("%geom\nConstraints\n");
    for (i, (sel, atom)) in mask.iter().zip(atoms).enumerate() {
        if *sel {
            writeln!(out, "{{C {} C}} # restraining {}", i, atom.label)
                .expect("writing to a String cannot fail");
        }
    }
    out.push_str("end\nend\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vec3;

    fn water() -> Vec<Atom> {
        vec![
            Atom::new("O", "O1", 0, Vec3::new(0.0, 0.0, 0.0)),
            Atom::new("H", "H1", 1, Vec3::new(0.757, 0.586, 0.0)),
            Atom::new("H", "H2", 2, Vec3::new(-0.757, 0.586, 0.0)),
        ]
    }

    fn spec() -> JobSpec {
        JobSpec::new("PM3", None, None, 0, 1, Some("t")).unwrap()
    }

    #[test]
    fn test_engrad_header_and_sentinel() {
        let text = engrad_input(&spec(), &water());
        assert!(text.starts_with("! PM3   EnGrad\n\n"));
        assert!(text.contains("* xyz 0 1\n"));
        assert!(text.ends_with("*\n"));
    }

    #[test]
    fn test_coordinates_are_fixed_precision() {
        let text = engrad_input(&spec(), &water());
        assert!(text.contains(" H 0.75700 0.58600 0.00000 # H1 1"));
        assert!(text.contains(" H -0.75700 0.58600 0.00000 # H2 2"));
    }

    #[test]
    fn test_sub_precision_noise_serializes_identically() {
        let mut shifted = water();
        shifted[0].position.x += 1.0e-7;
        assert_eq!(engrad_input(&spec(), &water()), engrad_input(&spec(), &shifted));
    }

    #[test]
    fn test_opt_without_mask_has_no_constraint_block() {
        let text = opt_input(&spec(), &water(), None);
        assert!(text.starts_with("! PM3   Opt\n\n"));
        assert!(!text.contains("%geom"));
    }

    #[test]
    fn test_opt_freeze_block_lists_frozen_indices() {
        let text = opt_input(&spec(), &water(), Some(&[true, false, true]));
        assert!(text.contains("%geom\nConstraints\n"));
        assert!(text.contains("{C 0 C} # restraining O1"));
        assert!(!text.contains("{C 1 C}"));
        assert!(text.contains("{C 2 C} # restraining H2"));
        assert!(text.ends_with("end\nend\n"));
    }

    #[test]
    fn test_basis_and_solvent_appear_in_header() {
        let spec = JobSpec::new("B3LYP", Some("def2-SVP"), Some("CPCM(water)"), -1, 2, Some("t"))
            .unwrap();
        let text = engrad_input(&spec, &water());
        assert!(text.starts_with("! B3LYP def2-SVP CPCM(water) EnGrad\n\n"));
        assert!(text.contains("* xyz -1 2\n"));
    }
}
