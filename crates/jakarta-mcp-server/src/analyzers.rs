//! Analyser collaborator seams.
//!
//! The migration "business logic" (build-file parsing, coordinate
//! mapping, source scanning, plan synthesis) lives behind these traits.
//! Tool handlers depend on the traits only; concrete analysers are
//! injected by the binary and never leak into the dispatcher or registry.
//! Rendering results to JSON strings is the handlers' job, so every type
//! here serializes with camelCase keys.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use jakarta_mcp_protocol::McpResult;

/// One Maven/Gradle coordinate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    Maven,
    Gradle,
    Unknown,
}

/// Output of the dependency analyser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub project_path: String,
    pub build_system: BuildSystem,
    pub artifacts: Vec<Artifact>,
    /// The subset of artifacts still on `javax.*` coordinates
    pub javax_artifacts: Vec<Artifact>,
}

/// A dependency that prevents the migration from proceeding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub artifact: Artifact,
    pub reason: String,
}

/// A suggested coordinate upgrade
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub artifact: Artifact,
    pub recommended: Artifact,
    pub rationale: String,
}

/// An ordered migration phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPhase {
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
}

/// Output of the migration planner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub project_path: String,
    pub phases: Vec<PlanPhase>,
}

/// Per-file `javax.*` usage found by the source scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileUsage {
    pub path: String,
    pub javax_imports: Vec<String>,
}

/// Output of the source scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAnalysisResult {
    pub files: Vec<SourceFileUsage>,
    pub total_files_scanned: usize,
}

impl SourceAnalysisResult {
    pub fn total_imports(&self) -> usize {
        self.files.iter().map(|f| f.javax_imports.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Combined effort estimate for the whole migration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub complexity: Complexity,
    pub total_files: usize,
    pub total_imports: usize,
    pub estimated_effort: String,
    pub risk_factors: Vec<String>,
}

/// Dependency-graph analysis of a Maven/Gradle project
#[async_trait]
pub trait DependencyAnalyzer: Send + Sync {
    async fn analyze_project(&self, path: &Path) -> McpResult<AnalysisReport>;

    async fn detect_blockers(&self, report: &AnalysisReport) -> McpResult<Vec<Blocker>>;

    async fn recommend_versions(&self, artifacts: &[Artifact]) -> McpResult<Vec<Recommendation>>;
}

/// Migration-plan synthesis
#[async_trait]
pub trait MigrationPlanner: Send + Sync {
    async fn create_plan(&self, path: &Path, report: &AnalysisReport) -> McpResult<MigrationPlan>;
}

/// Source-tree scanning for `javax.*` imports
#[async_trait]
pub trait SourceScanner: Send + Sync {
    async fn scan_project(&self, path: &Path) -> McpResult<SourceAnalysisResult>;
}

/// Combines dependency and source findings into an impact estimate
pub trait ImpactAggregator: Send + Sync {
    fn summarize(
        &self,
        report: &AnalysisReport,
        sources: &SourceAnalysisResult,
    ) -> McpResult<ImpactSummary>;
}

/// Opaque recipe catalogue, passed through to clients untouched
pub trait RecipeLibrary: Send + Sync {
    fn recipes(&self) -> Value;
}
