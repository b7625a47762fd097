//! Built-in analyser implementations.
//!
//! These are the reference collaborators wired in by default: a
//! line-oriented Maven/Gradle coordinate reader, a recursive source
//! scanner, a phase-based planner, and a threshold-based impact
//! aggregator. Deployments with richer build-graph tooling replace them
//! behind the seams in `jakarta_mcp_server::analyzers`.

use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use jakarta_mcp_protocol::{McpError, McpResult};
use jakarta_mcp_server::analyzers::{
    AnalysisReport, Artifact, Blocker, BuildSystem, Complexity, DependencyAnalyzer,
    ImpactAggregator, ImpactSummary, MigrationPlan, MigrationPlanner, PlanPhase, Recommendation,
    RecipeLibrary, SourceAnalysisResult, SourceFileUsage, SourceScanner,
};

/// Known coordinate swaps from the javax namespace to Jakarta EE 10.
const COORDINATE_SWAPS: &[(&str, &str, &str, &str, &str)] = &[
    ("javax.servlet", "javax.servlet-api", "jakarta.servlet", "jakarta.servlet-api", "6.0.0"),
    ("javax.persistence", "javax.persistence-api", "jakarta.persistence", "jakarta.persistence-api", "3.1.0"),
    ("javax.validation", "validation-api", "jakarta.validation", "jakarta.validation-api", "3.0.2"),
    ("javax.annotation", "javax.annotation-api", "jakarta.annotation", "jakarta.annotation-api", "2.1.1"),
    ("javax.inject", "javax.inject", "jakarta.inject", "jakarta.inject-api", "2.0.1"),
    ("javax.ws.rs", "javax.ws.rs-api", "jakarta.ws.rs", "jakarta.ws.rs-api", "3.1.0"),
    ("javax.jms", "javax.jms-api", "jakarta.jms", "jakarta.jms-api", "3.1.0"),
    ("com.sun.mail", "javax.mail", "jakarta.mail", "jakarta.mail-api", "2.1.2"),
];

static MAVEN_DEPENDENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<dependency>.*?<groupId>([^<]+)</groupId>.*?<artifactId>([^<]+)</artifactId>(?:.*?<version>([^<]+)</version>)?.*?</dependency>",
    )
    .expect("maven dependency regex compiles")
});

static GRADLE_DEPENDENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]([\w.-]+):([\w.-]+):([\w.-]+)['"]"#).expect("gradle dependency regex compiles")
});

static JAVA_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+(?:static\s+)?(javax\.[\w.]+)\s*;").expect("import regex compiles")
});

/// Reads dependency coordinates straight out of `pom.xml` /
/// `build.gradle` files.
#[derive(Default)]
pub struct BuildFileAnalyzer;

impl BuildFileAnalyzer {
    fn parse_maven(text: &str) -> Vec<Artifact> {
        MAVEN_DEPENDENCY_RE
            .captures_iter(text)
            .map(|captures| {
                Artifact::new(
                    captures[1].trim(),
                    captures[2].trim(),
                    captures.get(3).map(|v| v.as_str().trim()).unwrap_or("managed"),
                )
            })
            .collect()
    }

    fn parse_gradle(text: &str) -> Vec<Artifact> {
        GRADLE_DEPENDENCY_RE
            .captures_iter(text)
            .map(|captures| Artifact::new(&captures[1], &captures[2], &captures[3]))
            .collect()
    }

    fn swap_for(artifact: &Artifact) -> Option<Artifact> {
        COORDINATE_SWAPS
            .iter()
            .find(|(group, id, ..)| artifact.group_id == *group && artifact.artifact_id == *id)
            .map(|(_, _, jakarta_group, jakarta_id, version)| {
                Artifact::new(*jakarta_group, *jakarta_id, *version)
            })
    }

    fn is_javax(artifact: &Artifact) -> bool {
        artifact.group_id.starts_with("javax")
            || (artifact.group_id == "com.sun.mail" && artifact.artifact_id == "javax.mail")
    }
}

#[async_trait]
impl DependencyAnalyzer for BuildFileAnalyzer {
    async fn analyze_project(&self, path: &Path) -> McpResult<AnalysisReport> {
        let pom = path.join("pom.xml");
        let gradle = path.join("build.gradle");
        let gradle_kts = path.join("build.gradle.kts");

        let (build_system, artifacts) = if pom.is_file() {
            let text = std::fs::read_to_string(&pom)
                .map_err(|err| McpError::tool_execution(format!("cannot read pom.xml: {err}")))?;
            (BuildSystem::Maven, Self::parse_maven(&text))
        } else if gradle.is_file() || gradle_kts.is_file() {
            let file = if gradle.is_file() { gradle } else { gradle_kts };
            let text = std::fs::read_to_string(&file).map_err(|err| {
                McpError::tool_execution(format!("cannot read gradle build file: {err}"))
            })?;
            (BuildSystem::Gradle, Self::parse_gradle(&text))
        } else {
            return Err(McpError::tool_execution(format!(
                "no pom.xml or build.gradle found under {}",
                path.display()
            )));
        };

        let javax_artifacts = artifacts
            .iter()
            .filter(|a| Self::is_javax(a))
            .cloned()
            .collect();
        debug!(path = %path.display(), artifacts = artifacts.len(), "analyzed build file");
        Ok(AnalysisReport {
            project_path: path.display().to_string(),
            build_system,
            artifacts,
            javax_artifacts,
        })
    }

    async fn detect_blockers(&self, report: &AnalysisReport) -> McpResult<Vec<Blocker>> {
        Ok(report
            .javax_artifacts
            .iter()
            .filter(|artifact| Self::swap_for(artifact).is_none())
            .map(|artifact| Blocker {
                artifact: artifact.clone(),
                reason: "no known Jakarta replacement coordinate".to_string(),
            })
            .collect())
    }

    async fn recommend_versions(&self, artifacts: &[Artifact]) -> McpResult<Vec<Recommendation>> {
        Ok(artifacts
            .iter()
            .filter_map(|artifact| {
                Self::swap_for(artifact).map(|recommended| Recommendation {
                    artifact: artifact.clone(),
                    rationale: format!(
                        "{} moved to the {} namespace",
                        artifact.group_id, recommended.group_id
                    ),
                    recommended,
                })
            })
            .collect())
    }
}

/// Walks the source tree collecting `import javax.*` statements.
#[derive(Default)]
pub struct ImportScanner;

impl ImportScanner {
    fn scan_dir(dir: &Path, files: &mut Vec<SourceFileUsage>, scanned: &mut usize) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                Self::scan_dir(&path, files, scanned);
            } else if path.extension().is_some_and(|ext| ext == "java") {
                *scanned += 1;
                let Ok(text) = std::fs::read_to_string(&path) else {
                    continue;
                };
                let imports: Vec<String> = text
                    .lines()
                    .filter_map(|line| JAVA_IMPORT_RE.captures(line))
                    .map(|captures| captures[1].to_string())
                    .collect();
                if !imports.is_empty() {
                    files.push(SourceFileUsage {
                        path: path.display().to_string(),
                        javax_imports: imports,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl SourceScanner for ImportScanner {
    async fn scan_project(&self, path: &Path) -> McpResult<SourceAnalysisResult> {
        if !path.is_dir() {
            return Err(McpError::tool_execution(format!(
                "project path is not a directory: {}",
                path.display()
            )));
        }
        let mut files = Vec::new();
        let mut scanned = 0;
        Self::scan_dir(path, &mut files, &mut scanned);
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(SourceAnalysisResult {
            files,
            total_files_scanned: scanned,
        })
    }
}

/// Derives an ordered plan from the dependency report.
#[derive(Default)]
pub struct PhasedPlanner;

#[async_trait]
impl MigrationPlanner for PhasedPlanner {
    async fn create_plan(&self, path: &Path, report: &AnalysisReport) -> McpResult<MigrationPlan> {
        let dependency_steps: Vec<String> = report
            .javax_artifacts
            .iter()
            .map(|artifact| match BuildFileAnalyzer::swap_for(artifact) {
                Some(replacement) => format!("Replace {artifact} with {replacement}"),
                None => format!("Find a Jakarta-compatible replacement for {artifact}"),
            })
            .collect();

        let mut phases = Vec::new();
        if !dependency_steps.is_empty() {
            phases.push(PlanPhase {
                name: "dependencies".to_string(),
                description: "Swap javax coordinates for their Jakarta equivalents".to_string(),
                steps: dependency_steps,
            });
        }
        phases.push(PlanPhase {
            name: "sources".to_string(),
            description: "Rewrite javax.* imports and string references to jakarta.*".to_string(),
            steps: vec![
                "Apply the namespace migration recipes to the source tree".to_string(),
                "Rebuild the project against the Jakarta APIs".to_string(),
            ],
        });
        phases.push(PlanPhase {
            name: "verification".to_string(),
            description: "Prove the rebuilt artifact starts under the new namespace".to_string(),
            steps: vec![
                "Run the bytecode scan over the rebuilt JAR".to_string(),
                "Run runtime verification with the production JVM flags".to_string(),
            ],
        });
        Ok(MigrationPlan {
            project_path: path.display().to_string(),
            phases,
        })
    }
}

/// Buckets the migration into LOW/MEDIUM/HIGH effort.
#[derive(Default)]
pub struct ThresholdAggregator;

impl ImpactAggregator for ThresholdAggregator {
    fn summarize(
        &self,
        report: &AnalysisReport,
        sources: &SourceAnalysisResult,
    ) -> McpResult<ImpactSummary> {
        let total_imports = sources.total_imports();
        let touched = report.javax_artifacts.len() + total_imports;
        let (complexity, estimated_effort) = match touched {
            0..=10 => (Complexity::Low, "1-2 days"),
            11..=60 => (Complexity::Medium, "1-2 weeks"),
            _ => (Complexity::High, "3+ weeks"),
        };

        let mut risk_factors = Vec::new();
        if report
            .javax_artifacts
            .iter()
            .any(|a| BuildFileAnalyzer::swap_for(a).is_none())
        {
            risk_factors.push("dependencies without a known Jakarta replacement".to_string());
        }
        if total_imports > 50 {
            risk_factors.push("widespread javax usage across the source tree".to_string());
        }

        Ok(ImpactSummary {
            complexity,
            total_files: sources.total_files_scanned,
            total_imports,
            estimated_effort: estimated_effort.to_string(),
            risk_factors,
        })
    }
}

/// The bundled recipe catalogue, passed through verbatim.
#[derive(Default)]
pub struct BundledRecipes;

impl RecipeLibrary for BundledRecipes {
    fn recipes(&self) -> Value {
        json!({
            "recipes": [
                {"id": "jakarta-namespace-imports", "description": "Rewrite javax.* imports to jakarta.*"},
                {"id": "jakarta-maven-coordinates", "description": "Swap javax Maven coordinates for Jakarta equivalents"},
                {"id": "jakarta-xml-descriptors", "description": "Update deployment descriptors to Jakarta schemas"},
                {"id": "jakarta-persistence-xml", "description": "Migrate persistence.xml to the 3.x schema"}
            ]
        })
    }
}
