// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Out-of-process layout verification.
//!
//! A short-lived runtime instance is started with the sizing under test and
//! asked to print its compressed-oops layout. Its stdout is read on a helper
//! thread so the caller can bound the wait; on expiry the child is killed.

use super::contract::{LayoutContract, RuntimeSizing};
use super::report::{ProbeReport, REPORT_LINES};
use crate::error::{Error, Result};
use crossbeam::channel::{self, RecvTimeoutError};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default bound on one probe run.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const REAP_POLL: Duration = Duration::from_millis(10);

/// Launches a verification runtime and checks its layout report.
#[derive(Debug, Clone)]
pub struct RuntimeLayoutProbe {
    java: PathBuf,
    timeout: Duration,
}

impl Default for RuntimeLayoutProbe {
    fn default() -> Self {
        Self::new("java")
    }
}

impl RuntimeLayoutProbe {
    pub fn new(java: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn java(&self) -> &Path {
        &self.java
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments passed to the runtime for `sizing`.
    pub fn command_args(sizing: &RuntimeSizing) -> Vec<String> {
        vec![
            "-XX:+UnlockDiagnosticVMOptions".into(),
            "-XX:+PrintCompressedOopsMode".into(),
            format!("-XX:MaxMetaspaceSize={}", sizing.max_metaspace_size),
            format!("-XX:MetaspaceSize={}", sizing.metaspace_size),
            format!(
                "-XX:CompressedClassSpaceSize={}",
                sizing.compressed_class_space_size
            ),
            format!("-Xms{}", sizing.heap_min_size),
            format!("-Xmx{}", sizing.heap_max_size),
            format!("-XX:HeapBaseMinAddress={}", sizing.heap_base),
            "-version".into(),
        ]
    }

    /// Run the runtime once and parse its report, without checking it.
    pub fn report(&self, sizing: &RuntimeSizing) -> Result<ProbeReport> {
        let args = Self::command_args(sizing);
        let lines = run_capture(&self.java, &args, self.timeout, read_report_lines)?;
        ProbeReport::from_lines(&lines)
    }

    /// Verify that the runtime lays objects out exactly as `expected` says.
    ///
    /// Returns the contract unchanged on a full match. A disagreeing field
    /// is [`Error::LayoutMismatch`] and must be treated as fatal.
    pub fn validate(&self, expected: &LayoutContract) -> Result<LayoutContract> {
        let report = self.report(&expected.sizing())?;
        report.check(expected).map_err(|e| {
            log::warn!("[probe] {}", e);
            e
        })?;
        log::info!(
            "[probe] layout verified: {}, shift {}",
            expected.compressed_oops_mode,
            expected.oop_shift
        );
        Ok(*expected)
    }

    /// Probe with `sizing` and build the contract the runtime reports,
    /// checking only the caller-controlled fields.
    pub fn derive(&self, sizing: &RuntimeSizing) -> Result<LayoutContract> {
        sizing.validate()?;
        let report = self.report(sizing)?;
        report.check_sizing(sizing)?;
        let contract = report.to_contract(sizing);
        log::debug!(
            "[probe] derived contract: {}, oop shift {}, klass base {:#x}",
            contract.compressed_oops_mode,
            contract.oop_shift,
            contract.narrow_klass_base
        );
        Ok(contract)
    }
}

/// First three non-blank stdout lines.
fn read_report_lines(stdout: ChildStdout) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(REPORT_LINES);
    for line in BufReader::new(stdout).lines() {
        let line = line.map_err(|e| Error::ProbeFailed(format!("reading report: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }
        lines.push(line);
        if lines.len() == REPORT_LINES {
            return Ok(lines);
        }
    }
    Err(Error::ProbeFailed(format!(
        "runtime exited after {} of {} report lines",
        lines.len(),
        REPORT_LINES
    )))
}

/// Spawn `java args`, hand its stdout to `read` on a helper thread and wait
/// at most `timeout` for the result. The child is always reaped.
pub(crate) fn run_capture<T, F>(
    java: &Path,
    args: &[String],
    timeout: Duration,
    read: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(ChildStdout) -> Result<T> + Send + 'static,
{
    let deadline = Instant::now() + timeout;
    log::debug!("[probe] spawning {} {}", java.display(), args.join(" "));

    let mut child = Command::new(java)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::ProbeFailed(format!("cannot launch `{}`: {}", java.display(), e)))?;

    let Some(stdout) = child.stdout.take() else {
        kill_and_reap(&mut child);
        return Err(Error::ProbeFailed("child stdout was not captured".into()));
    };

    let (tx, rx) = channel::bounded(1);
    let spawned = thread::Builder::new()
        .name("dpx-probe-reader".into())
        .spawn(move || {
            let _ = tx.send(read(stdout));
        });
    if let Err(e) = spawned {
        kill_and_reap(&mut child);
        return Err(probe_io("cannot start report reader", &e));
    }

    let outcome = match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            kill_and_reap(&mut child);
            return Err(Error::ProbeFailed(format!(
                "runtime did not report within {:?}",
                timeout
            )));
        }
        Err(RecvTimeoutError::Disconnected) => {
            kill_and_reap(&mut child);
            return Err(Error::ProbeFailed("report reader stopped unexpectedly".into()));
        }
    };

    // Output is in hand; the child still has to exit before the deadline.
    let status = loop {
        let polled = match child.try_wait() {
            Ok(polled) => polled,
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(probe_io("waiting for runtime", &e));
            }
        };
        match polled {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                kill_and_reap(&mut child);
                return Err(Error::ProbeFailed(format!(
                    "runtime did not exit within {:?}",
                    timeout
                )));
            }
            None => thread::sleep(REAP_POLL),
        }
    };

    let value = outcome?;
    if !status.success() {
        return Err(Error::ProbeFailed(format!("runtime exited with {}", status)));
    }
    Ok(value)
}

/// Local I/O failures while driving the runtime are probe failures.
fn probe_io(context: &str, e: &io::Error) -> Error {
    Error::ProbeFailed(format!("{}: {}", context, e))
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("[probe] kill failed: {}", e);
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::contract::fixtures;

    #[test]
    fn test_command_args_order() {
        let args = RuntimeLayoutProbe::command_args(&fixtures::sizing());
        assert_eq!(
            args,
            [
                "-XX:+UnlockDiagnosticVMOptions",
                "-XX:+PrintCompressedOopsMode",
                "-XX:MaxMetaspaceSize=268435456",
                "-XX:MetaspaceSize=67108864",
                "-XX:CompressedClassSpaceSize=1073741824",
                "-Xms4294967296",
                "-Xmx4294967296",
                "-XX:HeapBaseMinAddress=28991029248",
                "-version",
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_probe_failure() {
        let probe = RuntimeLayoutProbe::new("/nonexistent/dpx/java");
        let err = probe.validate(&fixtures::contract()).unwrap_err();
        assert!(matches!(err, Error::ProbeFailed(msg) if msg.contains("cannot launch")));
    }

    #[test]
    fn test_local_io_failures_are_probe_failures() {
        let e = io::Error::new(io::ErrorKind::WouldBlock, "no threads left");
        let err = probe_io("cannot start report reader", &e);
        assert!(matches!(
            &err,
            Error::ProbeFailed(msg)
                if msg.starts_with("cannot start report reader:") && msg.contains("no threads left")
        ));
        assert!(!err.is_layout_drift());
    }

    #[test]
    fn test_defaults() {
        let probe = RuntimeLayoutProbe::default();
        assert_eq!(probe.java(), Path::new("java"));
        assert_eq!(probe.timeout(), DEFAULT_PROBE_TIMEOUT);
    }
}
