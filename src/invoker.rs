//! Runs the external program and decides success or failure from its
//! streamed output.
//!
//! Standard output is consumed line by line as the program runs. Each line
//! is appended to a running buffer which is tested against the configured
//! failure markers; the first match records the triggering line and ends the
//! scan while the process is drained to completion. The full captured
//! standard output is written to the job's log file in every outcome, so a
//! failed job always leaves its log behind for offline diagnosis.
//!
//! Success requires both an empty standard error and no matched marker.
//! Anything on standard error is fatal on its own, independent of the
//! marker scan.

use crate::error::{QmError, Result};
use lazy_static::lazy_static;
use log::{error, info};
use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

lazy_static! {
    // Progress lines printed by ORCA during geometry optimization, e.g.
    // "*                GEOMETRY OPTIMIZATION CYCLE   4            *"
    static ref OPT_CYCLE_RE: Regex =
        Regex::new(r"GEOMETRY OPTIMIZATION CYCLE\s+\d+").expect("static regex");
}

/// Launches `program` with `args`, captures its output, and classifies the
/// run.
///
/// # Arguments
///
/// * `program` - Executable to launch
/// * `args` - Arguments, typically just the job input filename
/// * `log_path` - Where the captured standard output is written
/// * `failure_markers` - Substrings of standard output that mark a failure
///
/// # Returns
///
/// Returns `Ok(())` only when standard error stayed empty and no entry of
/// `failure_markers` became a substring of the accumulated standard output.
/// The captured standard output is written to `log_path` before any error
/// is returned, so a failed job always leaves its log behind.
pub fn run(program: &str, args: &[&str], log_path: &Path, failure_markers: &[&str]) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| QmError::ExternalToolFailure(format!("failed to launch {}: {}", program, e)))?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let mut captured = String::new();
    let mut matched: Option<String> = None;

    for line in BufReader::new(stdout).lines() {
        let line = line?;
        if OPT_CYCLE_RE.is_match(&line) {
            info!("{}", line.trim());
        }
        captured.push_str(&line);
        captured.push('\n');
        if matched.is_none()
            && failure_markers.iter().any(|marker| captured.contains(marker))
        {
            matched = Some(line);
        }
    }

    let output = child.wait_with_output()?;
    fs::write(log_path, &captured)?;

    let stderr_text = String::from_utf8_lossy(&output.stderr);
    if !stderr_text.trim().is_empty() {
        error!("{} wrote to standard error", program);
        for line in stderr_text.lines() {
            error!("stderr: {}", line);
        }
        for line in captured.lines() {
            error!("stdout: {}", line);
        }
        let first = stderr_text.lines().next().unwrap_or("").to_string();
        return Err(QmError::ExternalToolFailure(format!(
            "{} wrote to standard error: {}",
            program, first
        )));
    }

    if let Some(line) = matched {
        return Err(QmError::ExternalToolFailure(line));
    }

    Ok(())
}
