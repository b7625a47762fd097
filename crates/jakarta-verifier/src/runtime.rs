//! Runtime verification: launch the JAR under a sibling JVM and observe
//! its startup.
//!
//! The supervision contract is strict: both pipes are drained
//! concurrently the whole time the child runs (an undrained pipe deadlocks
//! a chatty JVM), the deadline is enforced by the parent, and every exit
//! path terminates and reaps the child, with `kill_on_drop` backstopping
//! even cancellation. Launch failures are verification results, not server
//! errors.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::analysis::{MigrationContext, analyze_errors};
use crate::bytecode::{self, BytecodeScanResult};
use crate::parse::parse_output;
use crate::types::{
    ErrorType, VerificationError, VerificationMetrics, VerificationOptions, VerificationResult,
    VerificationStatus, VerificationStrategy,
};

/// Process-level tuning, fixed per verifier instance
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// JVM launcher binary
    pub java_binary: PathBuf,
    /// How long a graceful terminate may take before the force-kill
    pub grace_period: Duration,
    /// Per-stream capture bound; overflow is dropped with a sentinel
    /// warning
    pub max_captured_lines: usize,
    /// Class-entry ceiling for the bytecode pre-scan
    pub max_scanned_classes: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            java_binary: PathBuf::from("java"),
            grace_period: Duration::from_secs(2),
            max_captured_lines: 10_000,
            max_scanned_classes: bytecode::DEFAULT_MAX_CLASSES,
        }
    }
}

/// Verifies migrated JARs by bytecode scanning, process execution, or
/// both.
#[derive(Debug, Clone, Default)]
pub struct RuntimeVerifier {
    config: VerifierConfig,
}

impl RuntimeVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// Verify with an empty migration context.
    pub async fn verify(
        &self,
        jar_path: &Path,
        options: &VerificationOptions,
    ) -> VerificationResult {
        self.verify_with_context(jar_path, options, &MigrationContext::default())
            .await
    }

    /// Run the selected strategy and attach error analysis.
    pub async fn verify_with_context(
        &self,
        jar_path: &Path,
        options: &VerificationOptions,
        context: &MigrationContext,
    ) -> VerificationResult {
        if options.timeout.is_zero() {
            return VerificationResult::failed(VerificationError::new(
                ErrorType::Other,
                "verification timeout must be positive",
                1.0,
            ));
        }
        if !jar_path.is_file() {
            return VerificationResult::failed(VerificationError::new(
                ErrorType::Other,
                format!("JAR not found: {}", jar_path.display()),
                1.0,
            ));
        }

        let mut result = match options.strategy {
            VerificationStrategy::BytecodeOnly => match self.scan(jar_path) {
                Ok(scan) => scan_only_result(scan),
                Err(error) => VerificationResult::failed(error),
            },
            VerificationStrategy::ProcessOnly => self.run_process(jar_path, options).await,
            VerificationStrategy::BytecodeThenProcess => match self.scan(jar_path) {
                Ok(scan) if scan.has_issues() => {
                    let scan_status = scan_status(&scan);
                    let mut result = self.run_process(jar_path, options).await;
                    merge_scan(&mut result, scan);
                    result.status = result.status.worse_of(scan_status);
                    result
                }
                Ok(scan) => scan_only_result(scan),
                Err(error) => VerificationResult::failed(error),
            },
            VerificationStrategy::BothParallel => {
                let scan_path = jar_path.to_path_buf();
                let max_classes = self.config.max_scanned_classes;
                let scan_task = tokio::task::spawn_blocking(move || {
                    bytecode::scan_jar(&scan_path, max_classes)
                });
                let mut result = self.run_process(jar_path, options).await;
                match scan_task.await {
                    Ok(Ok(scan)) => {
                        let scan_status = scan_status(&scan);
                        merge_scan(&mut result, scan);
                        result.status = result.status.worse_of(scan_status);
                    }
                    Ok(Err(err)) => {
                        result.warnings.push(format!("bytecode scan failed: {err}"));
                    }
                    Err(err) => {
                        result.warnings.push(format!("bytecode scan aborted: {err}"));
                    }
                }
                result
            }
        };

        if !result.errors.is_empty() {
            let (analysis, steps) = analyze_errors(&result.errors, context);
            result.error_analysis = Some(analysis);
            result.remediation_steps = steps;
        }
        result
    }

    fn scan(&self, jar_path: &Path) -> Result<BytecodeScanResult, VerificationError> {
        bytecode::scan_jar(jar_path, self.config.max_scanned_classes).map_err(|err| {
            VerificationError::new(
                ErrorType::Other,
                format!("failed to read JAR {}: {err}", jar_path.display()),
                1.0,
            )
        })
    }

    /// Assemble the child command: caller flags first, then the computed
    /// heap bound, then the JAR.
    fn build_command(&self, jar_path: &Path, options: &VerificationOptions) -> Command {
        let mut command = Command::new(&self.config.java_binary);
        command
            .args(&options.jvm_args)
            .arg(format!("-Xmx{}", options.max_memory_bytes))
            .arg("-jar")
            .arg(jar_path)
            .stdin(Stdio::null())
            .stdout(if options.capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(if options.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        command
    }

    async fn run_process(
        &self,
        jar_path: &Path,
        options: &VerificationOptions,
    ) -> VerificationResult {
        let mut command = self.build_command(jar_path, options);
        debug!(jar = %jar_path.display(), timeout_ms = options.timeout.as_millis() as u64,
            "launching verification JVM");

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return VerificationResult::failed(VerificationError::new(
                    ErrorType::Other,
                    format!(
                        "failed to launch JVM '{}': {err}",
                        self.config.java_binary.display()
                    ),
                    1.0,
                ));
            }
        };

        // Both pipes drain concurrently for the child's whole lifetime.
        let stdout_task = child
            .stdout
            .take()
            .map(|pipe| self.spawn_drain(pipe, "stdout"));
        let stderr_task = child
            .stderr
            .take()
            .map(|pipe| self.spawn_drain(pipe, "stderr"));

        let mut wait_failed = None;
        let (timed_out, exit_code) =
            match tokio::time::timeout(options.timeout, child.wait()).await {
                Ok(Ok(status)) => (false, status.code().unwrap_or(-1)),
                Ok(Err(err)) => {
                    // The wait itself failed; make sure nothing lingers
                    // before surfacing the failure.
                    let _ = child.kill().await;
                    wait_failed = Some(err);
                    (false, -1)
                }
                Err(_) => {
                    warn!(jar = %jar_path.display(), "verification deadline reached, terminating child");
                    let code = self.terminate(&mut child).await;
                    (true, code)
                }
            };

        let mut lines = Vec::new();
        let mut warnings = Vec::new();
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            match task.await {
                Ok((captured, truncation)) => {
                    lines.extend(captured);
                    warnings.extend(truncation);
                }
                Err(err) => warnings.push(format!("stream capture failed: {err}")),
            }
        }

        let metrics = VerificationMetrics {
            execution_time_ms: started.elapsed().as_millis() as u64,
            memory_used_bytes: 0,
            exit_code,
            timed_out,
        };

        if let Some(err) = wait_failed {
            let mut result = VerificationResult::failed(VerificationError::new(
                ErrorType::Other,
                format!("failed waiting for the JVM: {err}"),
                1.0,
            ));
            result.metrics = metrics;
            result.warnings = warnings;
            return result;
        }

        let parsed = parse_output(&lines);
        warnings.extend(parsed.warnings);
        let status = derive_status(timed_out, exit_code, parsed.errors.len());
        VerificationResult {
            status,
            errors: parsed.errors,
            warnings,
            metrics,
            error_analysis: None,
            remediation_steps: Vec::new(),
        }
    }

    fn spawn_drain<R>(
        &self,
        pipe: R,
        label: &'static str,
    ) -> JoinHandle<(Vec<String>, Option<String>)>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let max_lines = self.config.max_captured_lines;
        tokio::spawn(async move {
            let mut reader = BufReader::new(pipe).lines();
            let mut captured = Vec::new();
            let mut dropped = 0usize;
            // Keep reading past the cap so the child never blocks on a
            // full pipe.
            while let Ok(Some(line)) = reader.next_line().await {
                if captured.len() < max_lines {
                    captured.push(line);
                } else {
                    dropped += 1;
                }
            }
            let truncation = (dropped > 0)
                .then(|| format!("{label} capture truncated, {dropped} lines dropped"));
            (captured, truncation)
        })
    }

    /// Graceful terminate, bounded grace period, then force-kill. Always
    /// reaps; returns the exit code (-1 when the child died to a signal).
    async fn terminate(&self, child: &mut Child) -> i32 {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            if let Ok(Ok(status)) =
                tokio::time::timeout(self.config.grace_period, child.wait()).await
            {
                return status.code().unwrap_or(-1);
            }
        }
        if let Err(err) = child.kill().await {
            warn!(error = %err, "force-kill failed");
        }
        match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(_) => -1,
        }
    }
}

/// The status table from the supervision contract.
fn derive_status(timed_out: bool, exit_code: i32, error_count: usize) -> VerificationStatus {
    if timed_out {
        VerificationStatus::Timeout
    } else if exit_code != 0 {
        if error_count > 0 {
            VerificationStatus::Failed
        } else {
            // The JVM died for a reason we couldn't classify.
            VerificationStatus::Partial
        }
    } else if error_count > 0 {
        // Errors on stderr, but the JVM recovered.
        VerificationStatus::Partial
    } else {
        VerificationStatus::Success
    }
}

fn scan_status(scan: &BytecodeScanResult) -> VerificationStatus {
    if scan.potential_errors.is_empty() {
        VerificationStatus::Success
    } else {
        VerificationStatus::Partial
    }
}

/// Result shape for scan-only strategies: javax references become
/// warnings, mixed-namespace findings stay errors.
fn scan_only_result(scan: BytecodeScanResult) -> VerificationResult {
    let status = scan_status(&scan);
    let mut result = VerificationResult {
        status,
        errors: Vec::new(),
        warnings: Vec::new(),
        metrics: VerificationMetrics {
            execution_time_ms: scan.analysis_time_ms,
            ..VerificationMetrics::default()
        },
        error_analysis: None,
        remediation_steps: Vec::new(),
    };
    merge_scan(&mut result, scan);
    result
}

fn merge_scan(result: &mut VerificationResult, scan: BytecodeScanResult) {
    for class in &scan.javax_classes {
        result
            .warnings
            .push(format!("residual javax reference: {class}"));
    }
    result.warnings.extend(scan.warnings);
    result.errors.extend(scan.potential_errors);
}
