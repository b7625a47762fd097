//! # Jakarta Runtime Verifier
//!
//! Determines whether a migrated JAR actually starts, and classifies
//! whatever goes wrong in terms of the `javax.*` → `jakarta.*`
//! transition. Two independent probes feed one result:
//!
//! - **bytecode pre-scan** ([`bytecode`]): walk the JAR's class constant
//!   pools for residual `javax.*` references without executing anything;
//! - **process verification** ([`runtime`]): launch the JAR under a
//!   sibling JVM with heap and wall-clock caps, drain both pipes, and
//!   parse the captured output for failure signatures ([`parse`]).
//!
//! [`analysis`] condenses parsed failures into a category, root cause,
//! and remediation steps. The supervision invariant holds on every exit
//! path: no orphaned child ever outlives a verification call.

pub mod analysis;
pub mod bytecode;
pub mod parse;
pub mod runtime;
pub mod types;

pub use analysis::{ErrorAnalysis, ErrorCategory, MigrationContext};
pub use bytecode::{BytecodeScanResult, scan_jar};
pub use runtime::{RuntimeVerifier, VerifierConfig};
pub use types::{
    ErrorType, VerificationError, VerificationMetrics, VerificationOptions, VerificationResult,
    VerificationStatus, VerificationStrategy,
};
