//! End-to-end runs through the real subprocess path, with a shell script
//! standing in for the ORCA binary.

use nalgebra::Vector3;
use qmlink::job::{JobSpec, QmProgram, ORCA_ENV_VAR};
use qmlink::manager::QmManager;
use qmlink::model::Atom;
use qmlink::QmError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

// the tests mutate the shared process environment
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn manager(dir: &TempDir) -> QmManager {
    let atoms = vec![
        Atom::new("O", "O1", 0, Vector3::new(0.0, 0.0, 0.0)),
        Atom::new("S", "S1", 1, Vector3::new(1.5, 0.0, 0.0)),
    ];
    let spec = JobSpec::new("PM3", None, None, 0, 1, Some("ext")).unwrap();
    let mut qmm = QmManager::external(QmProgram::Orca, spec, atoms);
    qmm.set_work_dir(dir.path());
    qmm
}

#[test]
fn test_failure_marker_raises_after_log_is_written() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "fake_orca.sh",
        "#!/bin/sh\n\
         echo 'ORCA SCF ITERATIONS'\n\
         echo 'SCF NOT CONVERGED AFTER 125 CYCLES'\n\
         echo 'trailing output'\n",
    );
    std::env::set_var(ORCA_ENV_VAR, &script);

    let mut qmm = manager(&dir);
    let err = qmm.get_engrad().unwrap_err();
    match err {
        QmError::ExternalToolFailure(line) => {
            assert_eq!(line, "SCF NOT CONVERGED AFTER 125 CYCLES")
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // the full stdout reached the log before the error propagated
    let log = fs::read_to_string(qmm.files().log()).unwrap();
    assert!(log.contains("ORCA SCF ITERATIONS"));
    assert!(log.contains("SCF NOT CONVERGED AFTER 125 CYCLES"));
    assert!(log.contains("trailing output"));
}

#[test]
fn test_scripted_run_produces_parsed_result() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let script = write_script(
        dir.path(),
        "fake_orca.sh",
        "#!/bin/sh\n\
         base=\"${1%.in}\"\n\
         cat > \"$base.engrad\" <<'EOF'\n\
#\n\
# Number of atoms\n\
#\n\
 2\n\
#\n\
# The current total energy in Eh\n\
#\n\
 -1.125\n\
#\n\
# The current gradient in Eh/bohr\n\
#\n\
 0.001\n\
 0.002\n\
 0.003\n\
 -0.001\n\
 -0.002\n\
 -0.003\n\
#\n\
# The atomic numbers and current coordinates in Bohr\n\
#\n\
 8 0.0 0.0 0.0\n\
 16 2.8 0.0 0.0\n\
EOF\n\
         echo 'ORCA TERMINATED NORMALLY'\n",
    );
    std::env::set_var(ORCA_ENV_VAR, &script);

    let mut qmm = manager(&dir);
    let (energy, gradients) = qmm.get_engrad().unwrap();
    assert!((energy - -1.125).abs() < 1e-12);
    assert_eq!(gradients.len(), 2);
    assert_eq!(qmm.timings().len(), 1);
    assert!(fs::read_to_string(qmm.files().log())
        .unwrap()
        .contains("ORCA TERMINATED NORMALLY"));
}

#[test]
fn test_unset_program_variable_is_configuration_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    std::env::remove_var(ORCA_ENV_VAR);

    let mut qmm = manager(&dir);
    assert!(matches!(
        qmm.get_engrad().unwrap_err(),
        QmError::Configuration(_)
    ));
}
