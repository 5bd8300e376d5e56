// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! External solver invocation.
//!
//! The script is written to a temporary file and handed to the solver
//! binary. The solver runs in its own process group under a watchdog
//! thread, so a diverging query is killed as a whole at the timeout.

use std::io::Write;
use std::process::Output;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::formulas::Formula;
use crate::error::{ProverError, Result};
use crate::session::Session;
use crate::smt::generate_smt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Solver binary, resolved through `PATH`.
    pub solver_path: String,
    pub timeout: Duration,
    /// Ask for a model on a failed obligation.
    pub dump_model: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            solver_path: "z3".to_string(),
            timeout: Duration::from_secs(60),
            dump_model: false,
        }
    }
}

/// Solver answer to one `check-sat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Unsat,
    Sat,
    Unknown,
}

/// Checks the obligation `ante ⊨ succ`. `Ok(true)` means proved: the
/// negated obligation is unsatisfiable. An `unknown` verdict is reported
/// as not proved.
pub fn evaluate(
    session: &mut Session,
    ante: &Formula,
    succ: &Formula,
    options: &SolverOptions,
) -> Result<bool> {
    let script = generate_smt(session, ante, succ, options.dump_model)?;
    match check_script(&script, options)? {
        Verdict::Unsat => Ok(true),
        Verdict::Sat => Ok(false),
        Verdict::Unknown => {
            log::warn!("solver returned unknown, treating the obligation as not proved");
            Ok(false)
        }
    }
}

/// Runs the solver on a complete script and parses its first verdict line.
pub fn check_script(script: &str, options: &SolverOptions) -> Result<Verdict> {
    let mut file = tempfile::Builder::new()
        .prefix("obligation")
        .suffix(".smt2")
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    let path = file.path().to_string_lossy().into_owned();

    log::debug!("invoking {} on {path}", options.solver_path);
    let output = run_with_timeout(&[options.solver_path.clone(), path], options.timeout)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                ProverError::SolverTimeout(options.timeout)
            } else {
                ProverError::SolverLaunch(e)
            }
        })?;
    parse_verdict(&output)
}

fn parse_verdict(output: &Output) -> Result<Verdict> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        match line.trim() {
            "unsat" => return Ok(Verdict::Unsat),
            "sat" => return Ok(Verdict::Sat),
            "unknown" => return Ok(Verdict::Unknown),
            _ => continue,
        }
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ProverError::SolverVerdict(format!(
        "no verdict in solver output; stdout: {stdout}; stderr: {stderr}"
    )))
}

#[cfg(unix)]
fn run_with_timeout(args: &[String], timeout: Duration) -> std::io::Result<Output> {
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};
    use std::sync::mpsc;
    use std::thread;

    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let child = Command::new(&args[0])
        .args(&args[1..])
        .process_group(0)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let pid = child.id() as i32;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = child.wait_with_output();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => {
            // Timeout reached - kill entire process group
            let _ = signal::killpg(Pid::from_raw(pid), Signal::SIGKILL);
            Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Process timed out",
            ))
        }
    }
}

#[cfg(not(unix))]
fn run_with_timeout(args: &[String], timeout: Duration) -> std::io::Result<Output> {
    use std::process::{Command, Stdio};
    use std::sync::mpsc;
    use std::thread;

    let child = Command::new(&args[0])
        .args(&args[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = child.wait_with_output();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "Process timed out",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str) -> Output {
        use std::process::Command;
        // Exit status values cannot be constructed directly; run a no-op.
        let mut base = Command::new("true").output().unwrap_or_else(|_| {
            Command::new("cmd").args(["/C", "exit 0"]).output().unwrap()
        });
        base.stdout = stdout.as_bytes().to_vec();
        base.stderr = Vec::new();
        base
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!(parse_verdict(&output("unsat\n")).unwrap(), Verdict::Unsat);
        assert_eq!(parse_verdict(&output("sat\n(model)\n")).unwrap(), Verdict::Sat);
        assert_eq!(parse_verdict(&output("unknown\n")).unwrap(), Verdict::Unknown);
        assert!(matches!(
            parse_verdict(&output("error: foo\n")),
            Err(ProverError::SolverVerdict(_))
        ));
    }
}
