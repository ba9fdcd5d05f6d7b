//! Parses the external program's output artifacts back into structured data.
//!
//! Two artifacts are read: the sectioned `.engrad` file carrying atom count,
//! total energy, flattened gradient, and final Bohr coordinates, and the
//! line-oriented `.xyz` file carrying optimized coordinates. Gradient
//! components are unit-converted from Eh/bohr at parse time so everything
//! downstream works in kcal/mol gradient units.

use crate::error::{QmError, Result};
use crate::model::Vec3;
use std::fs;
use std::path::Path;

/// Hartree to kcal/mol.
pub const HARTREE_TO_KCAL: f64 = 627.50946900;
/// Bohr to Angstrom.
pub const BOHR_TO_ANGSTROM: f64 = 0.52918;

/// Factor applied to every raw gradient component read from an `.engrad`
/// artifact.
pub const GRADIENT_CONVERSION: f64 = HARTREE_TO_KCAL * BOHR_TO_ANGSTROM;

// `#` both starts the section marker lines and delimits the sections, so a
// split on `#` puts the payloads at fixed indices.
const SECTION_ATOM_COUNT: usize = 3;
const SECTION_ENERGY: usize = 6;
const SECTION_GRADIENT: usize = 9;
const SECTION_COORDINATES: usize = 12;

/// Reads a sectioned `.engrad` artifact.
///
/// Returns the total energy and one converted gradient vector per atom, in
/// file order. Fails with [`QmError::ArtifactNotFound`] when the file is
/// missing and [`QmError::MalformedArtifact`] when the section layout does
/// not match.
pub fn read_engrad(path: &Path) -> Result<(f64, Vec<Vec3>)> {
    let text = read_artifact(path)?;
    let sections: Vec<&str> = text.split('#').collect();
    if sections.len() <= SECTION_COORDINATES {
        return Err(malformed(path, "truncated section layout"));
    }

    let n_atoms: usize = first_value(sections[SECTION_ATOM_COUNT])
        .ok_or_else(|| malformed(path, "missing atom count"))?
        .parse()
        .map_err(|_| malformed(path, "unparseable atom count"))?;

    let energy: f64 = first_value(sections[SECTION_ENERGY])
        .ok_or_else(|| malformed(path, "missing energy"))?
        .parse()
        .map_err(|_| malformed(path, "unparseable energy"))?;

    let mut gradients = Vec::with_capacity(n_atoms);
    let mut triple = [0.0f64; 3];
    let mut filled = 0usize;
    for line in sections[SECTION_GRADIENT].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: f64 = line
            .parse()
            .map_err(|_| malformed(path, "unparseable gradient component"))?;
        triple[filled] = value * GRADIENT_CONVERSION;
        filled += 1;
        if filled == 3 {
            gradients.push(Vec3::new(triple[0], triple[1], triple[2]));
            filled = 0;
        }
    }
    if filled != 0 || gradients.len() != n_atoms {
        return Err(malformed(
            path,
            &format!("expected {} gradient triples, got {}", n_atoms, gradients.len()),
        ));
    }

    let coordinate_lines = sections[SECTION_COORDINATES]
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count();
    if coordinate_lines != n_atoms {
        return Err(malformed(
            path,
            &format!("expected {} coordinate lines, got {}", n_atoms, coordinate_lines),
        ));
    }

    Ok((energy, gradients))
}

/// Reads a minimal `.xyz` coordinate artifact.
///
/// Line 1 is the atom count and line 2 a comment; both are skipped. Every
/// remaining line is `element x y z`. A missing file maps to
/// [`QmError::ArtifactNotFound`], which `get_opt` uses to decide whether a
/// previous run's output can be reused.
pub fn read_xyz(path: &Path) -> Result<Vec<Vec3>> {
    let text = read_artifact(path)?;
    let mut coordinates = Vec::new();
    for line in text.lines().skip(2) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(malformed(path, "coordinate line with fewer than 4 fields"));
        }
        let mut xyz = [0.0f64; 3];
        for (slot, field) in xyz.iter_mut().zip(&fields[1..4]) {
            *slot = field
                .parse()
                .map_err(|_| malformed(path, "unparseable coordinate"))?;
        }
        coordinates.push(Vec3::new(xyz[0], xyz[1], xyz[2]));
    }
    Ok(coordinates)
}

fn read_artifact(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(QmError::ArtifactNotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

fn first_value(section: &str) -> Option<&str> {
    section.lines().map(str::trim).find(|l| !l.is_empty())
}

fn malformed(path: &Path, reason: &str) -> QmError {
    QmError::MalformedArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ENGRAD_FIXTURE: &str = "#
# Number of atoms
#
 2
#
# The current total energy in Eh
#
    -49.737578240166
#
# The current gradient in Eh/bohr
#
       0.010000000000
       0.000000000000
      -0.010000000000
       0.007643624367
      -0.020537435105
       0.000773577750
#
# The atomic numbers and current coordinates in Bohr
#
   8    59.0407136   72.7582356   32.5750991
  16    59.4829095   73.6048329   29.8973572
";

    fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_engrad_energy_and_grouping() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "orca_t.engrad", ENGRAD_FIXTURE);
        let (energy, gradients) = read_engrad(&path).unwrap();
        assert!((energy - -49.737578240166).abs() < 1e-12);
        assert_eq!(gradients.len(), 2);
        assert!((gradients[0].x - 0.01 * GRADIENT_CONVERSION).abs() < 1e-12);
        assert_eq!(gradients[0].y, 0.0);
        assert!((gradients[0].z - -0.01 * GRADIENT_CONVERSION).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_unit_conversion_reference() {
        // 0.01 Eh/bohr * 627.50946900 * 0.52918 = 3.3206546081 kcal/mol/A
        let converted = 0.01 * GRADIENT_CONVERSION;
        assert!((converted - 3.3206546081).abs() / 3.3206546081 < 1e-6);
    }

    #[test]
    fn test_engrad_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_engrad(&dir.path().join("orca_t.engrad")).unwrap_err();
        assert!(matches!(err, QmError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_engrad_truncated_layout() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "orca_t.engrad", "#\n# Number of atoms\n#\n 2\n");
        let err = read_engrad(&path).unwrap_err();
        assert!(matches!(err, QmError::MalformedArtifact { .. }));
    }

    #[test]
    fn test_engrad_wrong_triple_count() {
        let dir = TempDir::new().unwrap();
        // claims 3 atoms but carries 2 triples
        let doctored = ENGRAD_FIXTURE.replacen(" 2\n", " 3\n", 1);
        let path = write(&dir, "orca_t.engrad", &doctored);
        let err = read_engrad(&path).unwrap_err();
        match err {
            QmError::MalformedArtifact { reason, .. } => {
                assert!(reason.contains("gradient triples"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_xyz_skips_count_and_comment() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "orca_t.xyz",
            "2\ngenerated\nO 0.10000 0.20000 0.30000\nH -1.00000 0.00000 2.50000\n",
        );
        let coordinates = read_xyz(&path).unwrap();
        assert_eq!(coordinates.len(), 2);
        assert!((coordinates[0].x - 0.1).abs() < 1e-12);
        assert!((coordinates[1].z - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_xyz_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_xyz(&dir.path().join("orca_t.xyz")).unwrap_err();
        assert!(matches!(err, QmError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_xyz_short_line() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "orca_t.xyz", "1\n\nO 0.1 0.2\n");
        assert!(matches!(
            read_xyz(&path).unwrap_err(),
            QmError::MalformedArtifact { .. }
        ));
    }
}
