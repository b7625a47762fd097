//! Error analysis: condense parsed failures into one category, a root
//! cause, related-error groups, pattern hints, and concrete remediation
//! steps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ErrorType, VerificationError};

/// Coordinate swaps for the packages that moved namespaces. Used to turn
/// an observed package into a concrete dependency replacement step.
const ARTIFACT_SWAPS: &[(&str, &str, &str)] = &[
    (
        "javax.servlet",
        "javax.servlet:javax.servlet-api",
        "jakarta.servlet:jakarta.servlet-api",
    ),
    (
        "javax.persistence",
        "javax.persistence:javax.persistence-api",
        "jakarta.persistence:jakarta.persistence-api",
    ),
    (
        "javax.validation",
        "javax.validation:validation-api",
        "jakarta.validation:jakarta.validation-api",
    ),
    (
        "javax.annotation",
        "javax.annotation:javax.annotation-api",
        "jakarta.annotation:jakarta.annotation-api",
    ),
    (
        "javax.inject",
        "javax.inject:javax.inject",
        "jakarta.inject:jakarta.inject-api",
    ),
    (
        "javax.ws.rs",
        "javax.ws.rs:javax.ws.rs-api",
        "jakarta.ws.rs:jakarta.ws.rs-api",
    ),
    ("javax.jms", "javax.jms:javax.jms-api", "jakarta.jms:jakarta.jms-api"),
    (
        "javax.mail",
        "com.sun.mail:javax.mail",
        "jakarta.mail:jakarta.mail-api",
    ),
];

/// High-level cause of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// A `jakarta.*` artifact the application needs is absent
    MissingDependency,
    /// Residual `javax.*` references in a supposedly migrated artifact
    IncompleteMigration,
    /// Artifacts on both namespaces linked into one runtime
    ClassloaderConflict,
    Unknown,
}

/// What the caller already knows about the migration attempt
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    /// Free-form label, e.g. "servlet", "full-platform"
    pub migration_type: String,
    /// Whether transitive dependencies participate in the migration
    pub transitive_dependencies: bool,
    /// Coordinates of dependencies known to the caller's build graph
    pub dependency_artifacts: Vec<String>,
}

/// Errors of one type collapsed into a group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedErrorGroup {
    pub error_type: ErrorType,
    pub count: usize,
    pub sample: String,
}

/// The condensed analysis attached to a verification result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub category: ErrorCategory,
    pub root_cause: String,
    pub related_errors: Vec<RelatedErrorGroup>,
    pub related_patterns: Vec<String>,
}

/// Analyze parsed errors against the migration context. Returns the
/// analysis plus remediation steps for the result payload.
pub fn analyze_errors(
    errors: &[VerificationError],
    context: &MigrationContext,
) -> (ErrorAnalysis, Vec<String>) {
    let mut groups: BTreeMap<&'static str, RelatedErrorGroup> = BTreeMap::new();
    for error in errors {
        let key = type_key(error.error_type);
        groups
            .entry(key)
            .and_modify(|group| group.count += 1)
            .or_insert_with(|| RelatedErrorGroup {
                error_type: error.error_type,
                count: 1,
                sample: error.message.clone(),
            });
    }
    let related_errors: Vec<RelatedErrorGroup> = groups.into_values().collect();

    let mentions_javax = errors.iter().any(|e| mentions(e, "javax"));
    let mentions_jakarta = errors.iter().any(|e| mentions(e, "jakarta"));
    let dominant = related_errors
        .iter()
        .max_by_key(|group| group.count)
        .map(|group| group.error_type);

    let category = match dominant {
        Some(ErrorType::MissingJakartaClass) if mentions_javax => {
            ErrorCategory::IncompleteMigration
        }
        Some(ErrorType::MissingJakartaClass) | Some(ErrorType::ClassNotFound) => {
            ErrorCategory::MissingDependency
        }
        Some(ErrorType::LinkageError) => ErrorCategory::ClassloaderConflict,
        _ => ErrorCategory::Unknown,
    };

    let root_cause = match category {
        ErrorCategory::IncompleteMigration => {
            "the artifact still loads javax.* classes that no longer exist on the runtime classpath"
                .to_string()
        }
        ErrorCategory::MissingDependency => {
            "a jakarta.* API the application links against is not on the runtime classpath"
                .to_string()
        }
        ErrorCategory::ClassloaderConflict => {
            "javax.* and jakarta.* variants of the same API are linked into one runtime"
                .to_string()
        }
        ErrorCategory::Unknown => "the failure does not match a known Jakarta migration signature"
            .to_string(),
    };

    let mut related_patterns = Vec::new();
    for (package, javax_artifact, jakarta_artifact) in ARTIFACT_SWAPS {
        if errors.iter().any(|e| mentions(e, package)) {
            related_patterns.push(format!("{javax_artifact} -> {jakarta_artifact}"));
        }
    }

    let steps = remediation_steps(category, &related_patterns, context, mentions_jakarta);
    (
        ErrorAnalysis {
            category,
            root_cause,
            related_errors,
            related_patterns,
        },
        steps,
    )
}

fn remediation_steps(
    category: ErrorCategory,
    patterns: &[String],
    context: &MigrationContext,
    mentions_jakarta: bool,
) -> Vec<String> {
    let mut steps = Vec::new();
    for pattern in patterns {
        if let Some((from, to)) = pattern.split_once(" -> ") {
            steps.push(format!("Replace dependency {} with {}", from, to));
        }
    }
    match category {
        ErrorCategory::IncompleteMigration => {
            steps.push(
                "Re-run the source migration recipes and rebuild the artifact".to_string(),
            );
        }
        ErrorCategory::MissingDependency if mentions_jakarta => {
            steps.push(
                "Add the missing jakarta.* API dependency to the runtime classpath".to_string(),
            );
        }
        ErrorCategory::ClassloaderConflict => {
            steps.push(
                "Exclude the leftover javax.* artifact so only the jakarta.* variant is linked"
                    .to_string(),
            );
        }
        _ => {}
    }
    if context.transitive_dependencies {
        steps.push(
            "Inspect the dependency tree for transitive javax.* artifacts and pin their Jakarta equivalents"
                .to_string(),
        );
    }
    if steps.is_empty() {
        steps.push("Inspect the captured output and re-run verification after fixing the startup failure".to_string());
    }
    steps
}

fn mentions(error: &VerificationError, needle: &str) -> bool {
    let slashed = needle.replace('.', "/");
    error.message.contains(needle)
        || error.message.contains(&slashed)
        || error
            .stack_trace
            .as_ref()
            .and_then(|t| t.message.as_ref())
            .is_some_and(|m| m.contains(needle) || m.contains(&slashed))
}

fn type_key(error_type: ErrorType) -> &'static str {
    match error_type {
        ErrorType::MissingJakartaClass => "missing-jakarta-class",
        ErrorType::ClassNotFound => "class-not-found",
        ErrorType::LinkageError => "linkage-error",
        ErrorType::Other => "other",
    }
}
