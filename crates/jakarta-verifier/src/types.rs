//! Verification inputs and results.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the verifier should exercise the JAR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStrategy {
    /// Bytecode scan only; never launches a process
    BytecodeOnly,
    /// Child JVM launch only
    ProcessOnly,
    /// Scan first; launch the child only when the scan surfaces issues
    #[default]
    BytecodeThenProcess,
    /// Run both and merge; the worse status wins
    BothParallel,
}

/// Caller-supplied knobs for one verification run
#[derive(Debug, Clone)]
pub struct VerificationOptions {
    /// Wall-clock budget for the child JVM; must be positive
    pub timeout: Duration,
    /// Upper heap bound, enforced via the child's `-Xmx` flag
    pub max_memory_bytes: u64,
    pub capture_stdout: bool,
    pub capture_stderr: bool,
    /// Extra JVM flags, passed through verbatim ahead of `-Xmx`
    pub jvm_args: Vec<String>,
    pub strategy: VerificationStrategy,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_memory_bytes: 512 * 1024 * 1024,
            capture_stdout: true,
            capture_stderr: true,
            jvm_args: Vec::new(),
            strategy: VerificationStrategy::default(),
        }
    }
}

/// Outcome of a verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Success,
    Failed,
    Partial,
    Timeout,
}

impl VerificationStatus {
    /// Merge two statuses, keeping the worse one. FAILED dominates,
    /// SUCCESS never overrides anything.
    pub fn worse_of(self, other: Self) -> Self {
        fn rank(status: VerificationStatus) -> u8 {
            match status {
                VerificationStatus::Success => 0,
                VerificationStatus::Partial => 1,
                VerificationStatus::Timeout => 2,
                VerificationStatus::Failed => 3,
            }
        }
        if rank(other) > rank(self) { other } else { self }
    }
}

/// Classification of one observed failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    MissingJakartaClass,
    ClassNotFound,
    LinkageError,
    Other,
}

/// One frame of a parsed Java stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// A parsed exception header plus its frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    pub exception_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub frames: Vec<StackFrame>,
}

/// One classified verification error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationError {
    pub error_type: ErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<StackTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originating_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originating_method: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Classification confidence in [0, 1]
    pub confidence: f64,
}

impl VerificationError {
    pub fn new(error_type: ErrorType, message: impl Into<String>, confidence: f64) -> Self {
        Self {
            error_type,
            message: message.into(),
            stack_trace: None,
            originating_class: None,
            originating_method: None,
            timestamp: Utc::now(),
            confidence,
        }
    }

    pub fn with_stack_trace(mut self, trace: StackTrace) -> Self {
        if let Some(frame) = trace.frames.first() {
            self.originating_class = Some(frame.class_name.clone());
            self.originating_method = Some(frame.method_name.clone());
        }
        self.stack_trace = Some(trace);
        self
    }
}

/// Numbers describing the child's run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMetrics {
    pub execution_time_ms: u64,
    /// 0 when unmeasured
    pub memory_used_bytes: u64,
    /// -1 when the child produced no exit code
    pub exit_code: i32,
    pub timed_out: bool,
}

impl Default for VerificationMetrics {
    fn default() -> Self {
        Self {
            execution_time_ms: 0,
            memory_used_bytes: 0,
            exit_code: -1,
            timed_out: false,
        }
    }
}

/// The complete result of one verification run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub errors: Vec<VerificationError>,
    pub warnings: Vec<String>,
    pub metrics: VerificationMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_analysis: Option<crate::analysis::ErrorAnalysis>,
    pub remediation_steps: Vec<String>,
}

impl VerificationResult {
    /// A run that never launched anything: one classified error, default
    /// metrics.
    pub fn failed(error: VerificationError) -> Self {
        Self {
            status: VerificationStatus::Failed,
            errors: vec![error],
            warnings: Vec::new(),
            metrics: VerificationMetrics::default(),
            error_analysis: None,
            remediation_steps: Vec::new(),
        }
    }
}
