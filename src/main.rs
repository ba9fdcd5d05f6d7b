//! qmlink command-line driver.
//!
//! Runs a delegated QM job over a whole structure read from an XYZ file:
//!
//! ```bash
//! # single-point energy and gradient
//! QMLINK_ORCA=/opt/orca/orca qmlink so4.xyz --method PM3 --charge -2
//!
//! # geometry optimization, tidying scratch files afterwards
//! QMLINK_ORCA=/opt/orca/orca qmlink opt so4.xyz --method PM3 --cleanup most
//! ```
//!
//! Flags: `--method` (required), `--basis`, `--solvent`, `--charge`,
//! `--mult`, `--preamble`, `--cleanup {most|all}`, `--reuse` (opt only).

use log::error;
use nalgebra::Vector3;
use qmlink::cleanup::CleanupLevel;
use qmlink::job::{JobSpec, QmProgram};
use qmlink::manager::QmManager;
use qmlink::model::Atom;
use qmlink::{QmError, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

struct Cli {
    optimize: bool,
    structure: String,
    method: String,
    basis: Option<String>,
    solvent: Option<String>,
    charge: i32,
    multiplicity: u32,
    preamble: Option<String>,
    cleanup: Option<CleanupLevel>,
    reuse: bool,
}

fn usage() -> ! {
    eprintln!("usage: qmlink [opt] <structure.xyz> --method <name> [--basis <name>]");
    eprintln!("              [--solvent <name>] [--charge <n>] [--mult <n>]");
    eprintln!("              [--preamble <id>] [--cleanup most|all] [--reuse]");
    process::exit(2);
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut cli = Cli {
        optimize: false,
        structure: String::new(),
        method: String::new(),
        basis: None,
        solvent: None,
        charge: 0,
        multiplicity: 1,
        preamble: None,
        cleanup: None,
        reuse: false,
    };
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| -> Result<String> {
            iter.next().cloned().ok_or_else(|| {
                QmError::Configuration(format!("{} requires a value", flag))
            })
        };
        match arg.as_str() {
            "--method" => cli.method = value("--method")?,
            "--basis" => cli.basis = Some(value("--basis")?),
            "--solvent" => cli.solvent = Some(value("--solvent")?),
            "--charge" => {
                cli.charge = value("--charge")?.parse().map_err(|_| {
                    QmError::Configuration("--charge expects an integer".to_string())
                })?
            }
            "--mult" => {
                cli.multiplicity = value("--mult")?.parse().map_err(|_| {
                    QmError::Configuration("--mult expects a positive integer".to_string())
                })?
            }
            "--preamble" => cli.preamble = Some(value("--preamble")?),
            "--cleanup" => {
                cli.cleanup = Some(match value("--cleanup")?.as_str() {
                    "most" => CleanupLevel::Most,
                    "all" => CleanupLevel::All,
                    other => {
                        return Err(QmError::Configuration(format!(
                            "unknown cleanup level \"{}\"",
                            other
                        )))
                    }
                })
            }
            "--reuse" => cli.reuse = true,
            "--help" | "-h" => usage(),
            other => positional.push(other.to_string()),
        }
    }
    match positional.as_slice() {
        [structure] => cli.structure = structure.clone(),
        [mode, structure] if mode == "opt" => {
            cli.optimize = true;
            cli.structure = structure.clone();
        }
        _ => usage(),
    }
    if cli.method.is_empty() {
        return Err(QmError::Configuration("--method is required".to_string()));
    }
    Ok(cli)
}

/// Reads a whole-structure XYZ file into managed atoms, labeling each atom
/// `{element}{line}` and numbering serials in file order.
fn read_structure(path: &Path) -> Result<Vec<Atom>> {
    let text = fs::read_to_string(path)
        .map_err(|_| QmError::ArtifactNotFound(path.to_path_buf()))?;
    let mut atoms = Vec::new();
    for (i, line) in text.lines().skip(2).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(QmError::MalformedArtifact {
                path: path.to_path_buf(),
                reason: format!("structure line {} has fewer than 4 fields", i + 3),
            });
        }
        let mut xyz = [0.0f64; 3];
        for (slot, field) in xyz.iter_mut().zip(&fields[1..4]) {
            *slot = field.parse().map_err(|_| QmError::MalformedArtifact {
                path: path.to_path_buf(),
                reason: format!("unparseable coordinate on line {}", i + 3),
            })?;
        }
        atoms.push(Atom::new(
            fields[0],
            &format!("{}{}", fields[0], i + 1),
            i,
            Vector3::new(xyz[0], xyz[1], xyz[2]),
        ));
    }
    if atoms.is_empty() {
        return Err(QmError::MalformedArtifact {
            path: path.to_path_buf(),
            reason: "no atoms".to_string(),
        });
    }
    Ok(atoms)
}

fn run(cli: &Cli) -> Result<()> {
    let atoms = read_structure(Path::new(&cli.structure))?;
    let spec = JobSpec::new(
        &cli.method,
        cli.basis.as_deref(),
        cli.solvent.as_deref(),
        cli.charge,
        cli.multiplicity,
        cli.preamble.as_deref(),
    )?;
    let mut qmm = QmManager::external(QmProgram::Orca, spec, atoms);
    println!("{}", qmm);

    if cli.optimize {
        let coordinates = qmm.get_opt(cli.cleanup, cli.reuse)?;
        for (atom, site) in qmm.atoms().iter().zip(&coordinates) {
            println!("{:>3} {:12.5} {:12.5} {:12.5}", atom.element, site.x, site.y, site.z);
        }
    } else {
        let (energy, gradients) = qmm.get_engrad()?;
        println!("energy: {:.9}", energy);
        for (atom, g) in qmm.atoms().iter().zip(&gradients) {
            println!("{:>3} {:14.6} {:14.6} {:14.6}", atom.label, g.x, g.y, g.z);
        }
        println!("{}", qmm.timings_report(Some(energy)));
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stdout)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };
    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(1);
    }
}
