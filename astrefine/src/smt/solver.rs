//! External SMT solver bridge
//!
//! Scripts are piped to a `z3` process (`z3 -in -smt2`). Every query gets
//! both a soft timeout (`-t`, the solver answers `unknown`) and a hard one
//! (`-T`, the process gives up), so a query never blocks longer than its
//! allotted time plus process start-up.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Solver answer for one script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverResult {
    Sat,
    Unsat,
    Unknown,
    Timeout,
}

/// Failure to obtain an answer at all
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to start solver `{path}`: {message}")]
    Spawn { path: String, message: String },
    #[error("solver io error: {0}")]
    Io(String),
    #[error("unexpected solver output: {0}")]
    UnexpectedOutput(String),
}

/// Decision procedure for SMT-LIB2 scripts
pub trait Prover {
    /// Name for diagnostics
    fn name(&self) -> &str;

    /// Check satisfiability of `script`, giving up after `timeout`
    fn check(&mut self, script: &str, timeout: Duration) -> Result<SolverResult, SolverError>;
}

/// Z3 invoked as a child process
#[derive(Debug, Clone)]
pub struct SmtSolver {
    path: String,
}

impl SmtSolver {
    pub fn new() -> Self {
        Self {
            path: "z3".to_string(),
        }
    }

    /// Set custom solver path
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check if the solver binary can be run
    pub fn is_available(&self) -> bool {
        Command::new(&self.path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for SmtSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Prover for SmtSolver {
    fn name(&self) -> &str {
        &self.path
    }

    fn check(&mut self, script: &str, timeout: Duration) -> Result<SolverResult, SolverError> {
        if timeout.is_zero() {
            return Ok(SolverResult::Timeout);
        }

        let soft_ms = timeout.as_millis().max(1);
        let hard_secs = timeout.as_secs() + 1;

        let start = Instant::now();
        let mut child = Command::new(&self.path)
            .arg("-in")
            .arg("-smt2")
            .arg(format!("-t:{}", soft_ms))
            .arg(format!("-T:{}", hard_secs))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SolverError::Spawn {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| SolverError::Io(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SolverError::Io(e.to_string()))?;
        let elapsed = start.elapsed();

        let timed_out = elapsed >= timeout;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(answer) = parse_answer(&stdout, timed_out) {
            return Ok(answer);
        }
        if timed_out {
            // Killed by the hard limit before printing anything
            return Ok(SolverResult::Timeout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SolverError::UnexpectedOutput(
            format!("{} {}", stdout.trim(), stderr.trim()).trim().to_string(),
        ))
    }
}

/// First answer line of a solver transcript
fn parse_answer(stdout: &str, timed_out: bool) -> Option<SolverResult> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    match line {
        "sat" => Some(SolverResult::Sat),
        "unsat" => Some(SolverResult::Unsat),
        "unknown" if timed_out => Some(SolverResult::Timeout),
        "unknown" => Some(SolverResult::Unknown),
        "timeout" => Some(SolverResult::Timeout),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Prover that replays canned answers and records the scripts it saw
    #[derive(Debug, Default, Clone)]
    pub struct ScriptedProver {
        answers: Rc<RefCell<VecDeque<SolverResult>>>,
        pub seen: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedProver {
        pub fn answering(answers: &[SolverResult]) -> Self {
            Self {
                answers: Rc::new(RefCell::new(answers.iter().copied().collect())),
                seen: Rc::default(),
            }
        }

        pub fn queries(&self) -> usize {
            self.seen.borrow().len()
        }
    }

    impl Prover for ScriptedProver {
        fn name(&self) -> &str {
            "scripted"
        }

        fn check(&mut self, script: &str, _timeout: Duration) -> Result<SolverResult, SolverError> {
            self.seen.borrow_mut().push(script.to_string());
            Ok(self.answers.borrow_mut().pop_front().unwrap_or(SolverResult::Unknown))
        }
    }
}
