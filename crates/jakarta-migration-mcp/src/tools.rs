//! The tool catalogue exposed over MCP.
//!
//! Two providers: the analysis tools over the injected collaborators, and
//! the verification tools over the runtime verifier. Handlers render
//! their collaborator output as JSON strings; that string travels
//! verbatim as the `tools/call` content text.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use jakarta_mcp_protocol::{McpError, McpResult};
use jakarta_mcp_server::analyzers::{
    DependencyAnalyzer, ImpactAggregator, MigrationPlanner, RecipeLibrary, SourceScanner,
};
use jakarta_mcp_server::config::VerificationConfig;
use jakarta_mcp_server::licensing::Tier;
use jakarta_mcp_server::registry::{
    ParameterDescriptor, ToolArguments, ToolDescriptor, ToolHandler, ToolProvider,
    ToolRegistration,
};
use jakarta_verifier::{
    RuntimeVerifier, VerificationOptions, VerificationResult, VerificationStrategy, scan_jar,
};

/// Analysis tools: dependency graph, blockers, recommendations, plan,
/// source usage, impact, recipes.
pub struct AnalysisToolProvider {
    pub analyzer: Arc<dyn DependencyAnalyzer>,
    pub planner: Arc<dyn MigrationPlanner>,
    pub scanner: Arc<dyn SourceScanner>,
    pub aggregator: Arc<dyn ImpactAggregator>,
    pub recipes: Arc<dyn RecipeLibrary>,
}

fn project_path_param() -> ParameterDescriptor {
    ParameterDescriptor::required_string("projectPath", "Path to the project root directory")
}

impl ToolProvider for AnalysisToolProvider {
    fn tools(&self) -> Vec<ToolRegistration> {
        vec![
            ToolRegistration::new(
                ToolDescriptor::new(
                    "analyzeProject",
                    "Analyze a Maven or Gradle project's dependency graph for javax.* usage",
                )
                .with_parameters(vec![project_path_param()]),
                AnalyzeProjectTool {
                    analyzer: self.analyzer.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "detectBlockers",
                    "Detect dependencies that block the Jakarta migration",
                )
                .with_parameters(vec![project_path_param()]),
                DetectBlockersTool {
                    analyzer: self.analyzer.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "recommendVersions",
                    "Recommend Jakarta replacement coordinates for javax.* dependencies",
                )
                .with_parameters(vec![project_path_param()]),
                RecommendVersionsTool {
                    analyzer: self.analyzer.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "scanSourceUsage",
                    "Scan the source tree for javax.* import statements",
                )
                .with_parameters(vec![project_path_param()]),
                ScanSourceUsageTool {
                    scanner: self.scanner.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "createMigrationPlan",
                    "Synthesize an ordered migration plan for the project",
                )
                .with_parameters(vec![project_path_param()])
                .with_required_tier(Tier::Premium)
                .with_billing_event("jakarta.plan.create"),
                CreateMigrationPlanTool {
                    analyzer: self.analyzer.clone(),
                    planner: self.planner.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "estimateMigrationImpact",
                    "Estimate migration complexity, effort, and risk factors",
                )
                .with_parameters(vec![project_path_param()])
                .with_required_tier(Tier::Premium)
                .with_billing_event("jakarta.impact.estimate"),
                EstimateImpactTool {
                    analyzer: self.analyzer.clone(),
                    scanner: self.scanner.clone(),
                    aggregator: self.aggregator.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "listMigrationRecipes",
                    "List the available source migration recipes",
                ),
                ListRecipesTool {
                    recipes: self.recipes.clone(),
                },
            ),
        ]
    }
}

struct AnalyzeProjectTool {
    analyzer: Arc<dyn DependencyAnalyzer>,
}

#[async_trait]
impl ToolHandler for AnalyzeProjectTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let path = PathBuf::from(args.require_str("projectPath")?);
        let report = self.analyzer.analyze_project(&path).await?;
        Ok(serde_json::to_string(&report)?)
    }
}

struct DetectBlockersTool {
    analyzer: Arc<dyn DependencyAnalyzer>,
}

#[async_trait]
impl ToolHandler for DetectBlockersTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let path = PathBuf::from(args.require_str("projectPath")?);
        let report = self.analyzer.analyze_project(&path).await?;
        let blockers = self.analyzer.detect_blockers(&report).await?;
        Ok(serde_json::to_string(&json!({
            "projectPath": report.project_path,
            "blockers": blockers,
        }))?)
    }
}

struct RecommendVersionsTool {
    analyzer: Arc<dyn DependencyAnalyzer>,
}

#[async_trait]
impl ToolHandler for RecommendVersionsTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let path = PathBuf::from(args.require_str("projectPath")?);
        let report = self.analyzer.analyze_project(&path).await?;
        let recommendations = self
            .analyzer
            .recommend_versions(&report.javax_artifacts)
            .await?;
        Ok(serde_json::to_string(&json!({
            "projectPath": report.project_path,
            "recommendations": recommendations,
        }))?)
    }
}

struct ScanSourceUsageTool {
    scanner: Arc<dyn SourceScanner>,
}

#[async_trait]
impl ToolHandler for ScanSourceUsageTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let path = PathBuf::from(args.require_str("projectPath")?);
        let result = self.scanner.scan_project(&path).await?;
        Ok(serde_json::to_string(&result)?)
    }
}

struct CreateMigrationPlanTool {
    analyzer: Arc<dyn DependencyAnalyzer>,
    planner: Arc<dyn MigrationPlanner>,
}

#[async_trait]
impl ToolHandler for CreateMigrationPlanTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let path = PathBuf::from(args.require_str("projectPath")?);
        let report = self.analyzer.analyze_project(&path).await?;
        let plan = self.planner.create_plan(&path, &report).await?;
        Ok(serde_json::to_string(&plan)?)
    }
}

struct EstimateImpactTool {
    analyzer: Arc<dyn DependencyAnalyzer>,
    scanner: Arc<dyn SourceScanner>,
    aggregator: Arc<dyn ImpactAggregator>,
}

#[async_trait]
impl ToolHandler for EstimateImpactTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let path = PathBuf::from(args.require_str("projectPath")?);
        let report = self.analyzer.analyze_project(&path).await?;
        let sources = self.scanner.scan_project(&path).await?;
        let summary = self.aggregator.summarize(&report, &sources)?;
        Ok(serde_json::to_string(&summary)?)
    }
}

struct ListRecipesTool {
    recipes: Arc<dyn RecipeLibrary>,
}

#[async_trait]
impl ToolHandler for ListRecipesTool {
    async fn call(&self, _args: ToolArguments) -> McpResult<String> {
        Ok(serde_json::to_string(&self.recipes.recipes())?)
    }
}

/// Verification tools over the runtime verifier.
pub struct VerificationToolProvider {
    pub verifier: Arc<RuntimeVerifier>,
    pub defaults: VerificationConfig,
}

impl ToolProvider for VerificationToolProvider {
    fn tools(&self) -> Vec<ToolRegistration> {
        vec![
            ToolRegistration::new(
                ToolDescriptor::new(
                    "verifyJarRuntime",
                    "Launch a migrated JAR under an isolated JVM and classify startup failures",
                )
                .with_parameters(vec![
                    ParameterDescriptor::required_string("jarPath", "Path to the JAR to verify"),
                    ParameterDescriptor::optional_integer(
                        "timeoutMs",
                        "Wall-clock limit for the child JVM in milliseconds",
                    ),
                    ParameterDescriptor::optional_integer(
                        "maxMemoryBytes",
                        "Heap bound passed to the child JVM via -Xmx",
                    ),
                    ParameterDescriptor::optional_boolean(
                        "captureStdout",
                        "Capture the child's standard output",
                    ),
                    ParameterDescriptor::optional_boolean(
                        "captureStderr",
                        "Capture the child's standard error",
                    ),
                    ParameterDescriptor::optional_string(
                        "jvmArgs",
                        "Extra JVM flags, space separated, passed through verbatim",
                    ),
                    ParameterDescriptor::optional_string(
                        "strategy",
                        "bytecode-only, process-only, bytecode-then-process, or both-parallel",
                    ),
                ])
                .with_required_tier(Tier::Premium)
                .with_billing_event("jakarta.verify.runtime"),
                VerifyJarRuntimeTool {
                    verifier: self.verifier.clone(),
                    defaults: self.defaults.clone(),
                },
            ),
            ToolRegistration::new(
                ToolDescriptor::new(
                    "scanJarBytecode",
                    "Scan a JAR's class files for residual javax.* references without executing it",
                )
                .with_parameters(vec![ParameterDescriptor::required_string(
                    "jarPath",
                    "Path to the JAR to scan",
                )]),
                ScanJarBytecodeTool,
            ),
        ]
    }
}

struct VerifyJarRuntimeTool {
    verifier: Arc<RuntimeVerifier>,
    defaults: VerificationConfig,
}

impl VerifyJarRuntimeTool {
    fn options_from(&self, args: &ToolArguments) -> McpResult<VerificationOptions> {
        let strategy = match args.get_str("strategy") {
            None => VerificationStrategy::default(),
            Some("bytecode-only") => VerificationStrategy::BytecodeOnly,
            Some("process-only") => VerificationStrategy::ProcessOnly,
            Some("bytecode-then-process") => VerificationStrategy::BytecodeThenProcess,
            Some("both-parallel") => VerificationStrategy::BothParallel,
            Some(other) => {
                return Err(McpError::InvalidParameters(format!(
                    "unknown verification strategy: {other}"
                )));
            }
        };
        Ok(VerificationOptions {
            timeout: args
                .get_i64("timeoutMs")
                .map(|ms| Duration::from_millis(ms.max(0) as u64))
                .unwrap_or_else(|| self.defaults.default_timeout()),
            max_memory_bytes: args
                .get_i64("maxMemoryBytes")
                .map(|bytes| bytes.max(0) as u64)
                .unwrap_or(self.defaults.default_max_memory_bytes),
            capture_stdout: args.get_bool("captureStdout").unwrap_or(true),
            capture_stderr: args.get_bool("captureStderr").unwrap_or(true),
            jvm_args: args
                .get_str("jvmArgs")
                .map(|raw| raw.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
            strategy,
        })
    }
}

#[async_trait]
impl ToolHandler for VerifyJarRuntimeTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let jar_path = PathBuf::from(args.require_str("jarPath")?);
        let options = self.options_from(&args)?;
        let result = self.verifier.verify(&jar_path, &options).await;
        Ok(serde_json::to_string(&result)?)
    }
}

struct ScanJarBytecodeTool;

#[async_trait]
impl ToolHandler for ScanJarBytecodeTool {
    async fn call(&self, args: ToolArguments) -> McpResult<String> {
        let jar_path = PathBuf::from(args.require_str("jarPath")?);
        let rendered = match scan_result(&jar_path) {
            Ok(scan) => serde_json::to_string(&json!({
                "hasIssues": scan.has_issues(),
                "scan": scan,
            }))?,
            // A broken artifact is data, not a server error.
            Err(result) => serde_json::to_string(&result)?,
        };
        Ok(rendered)
    }
}

fn scan_result(
    jar_path: &Path,
) -> Result<jakarta_verifier::BytecodeScanResult, VerificationResult> {
    if !jar_path.is_file() {
        return Err(VerificationResult::failed(
            jakarta_verifier::VerificationError::new(
                jakarta_verifier::ErrorType::Other,
                format!("JAR not found: {}", jar_path.display()),
                1.0,
            ),
        ));
    }
    scan_jar(jar_path, jakarta_verifier::bytecode::DEFAULT_MAX_CLASSES).map_err(|err| {
        VerificationResult::failed(jakarta_verifier::VerificationError::new(
            jakarta_verifier::ErrorType::Other,
            format!("failed to read JAR {}: {err}", jar_path.display()),
            1.0,
        ))
    })
}
