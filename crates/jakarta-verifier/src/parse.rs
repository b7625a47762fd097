//! Stack-trace signature parsing for captured child output.
//!
//! Scans stderr/stdout line-by-line for Java exception headers, attaches
//! the frames that follow, and classifies each failure by its relevance to
//! the `javax.*` → `jakarta.*` transition. Warning lines are collected
//! separately and never influence the run status.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ErrorType, StackFrame, StackTrace, VerificationError};

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:Exception in thread "[^"]*"\s+)?(?:Caused by:\s+)?([A-Za-z_$][\w.$]*(?:Exception|Error)|Exception|Error)(?::\s*(.+))?\s*$"#,
    )
    .expect("header regex compiles")
});

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+at\s+([\w.$]+)\.([\w$<>]+)\(([^:()]+?)(?::(\d+))?\)")
        .expect("frame regex compiles")
});

/// Package pairs whose signatures moved between namespaces. A
/// `NoSuchMethodError` naming either side is a linkage break between
/// half-migrated artifacts, not an application bug.
const MIGRATION_PAIRS: &[(&str, &str)] = &[
    ("javax.servlet", "jakarta.servlet"),
    ("javax.persistence", "jakarta.persistence"),
    ("javax.ws.rs", "jakarta.ws.rs"),
    ("javax.validation", "jakarta.validation"),
    ("javax.annotation", "jakarta.annotation"),
    ("javax.inject", "jakarta.inject"),
    ("javax.faces", "jakarta.faces"),
    ("javax.jms", "jakarta.jms"),
    ("javax.mail", "jakarta.mail"),
    ("javax.transaction", "jakarta.transaction"),
];

/// Classified findings from one captured stream pair
#[derive(Debug, Default)]
pub struct ParsedOutput {
    pub errors: Vec<VerificationError>,
    pub warnings: Vec<String>,
}

/// Scan captured output lines for failure signatures.
pub fn parse_output(lines: &[String]) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let mut index = 0;

    while index < lines.len() {
        let line = &lines[index];
        let lowered = line.to_lowercase();
        if lowered.contains("warning") || lowered.contains("deprecated") {
            parsed.warnings.push(line.trim().to_string());
            index += 1;
            continue;
        }

        let Some(captures) = HEADER_RE.captures(line.trim_end()) else {
            index += 1;
            continue;
        };
        let exception_class = captures[1].to_string();
        let message = captures.get(2).map(|m| m.as_str().to_string());

        // Attach the frames that follow the header.
        let mut frames = Vec::new();
        let mut cursor = index + 1;
        while cursor < lines.len() {
            let Some(frame) = FRAME_RE.captures(&lines[cursor]) else {
                break;
            };
            frames.push(StackFrame {
                class_name: frame[1].to_string(),
                method_name: frame[2].to_string(),
                file_name: Some(frame[3].to_string()),
                line: frame.get(4).and_then(|l| l.as_str().parse().ok()),
            });
            cursor += 1;
        }

        let (error_type, confidence) = classify(&exception_class, message.as_deref());
        let error = VerificationError::new(error_type, line.trim(), confidence)
            .with_stack_trace(StackTrace {
                exception_class,
                message,
                frames,
            });
        parsed.errors.push(error);
        index = cursor;
    }
    parsed
}

/// Map an exception class (plus its message) onto a Jakarta-relevant
/// error type with a confidence score.
fn classify(exception_class: &str, message: Option<&str>) -> (ErrorType, f64) {
    let message = message.unwrap_or_default();
    if exception_class.ends_with("NoClassDefFoundError") {
        if message.contains("javax/") || message.contains("javax.") {
            return (ErrorType::MissingJakartaClass, 0.95);
        }
        if message.contains("jakarta/") || message.contains("jakarta.") {
            // Migration incomplete: some dependency still resolves javax
            // names against jakarta artifacts.
            return (ErrorType::MissingJakartaClass, 0.9);
        }
    }
    if exception_class.ends_with("ClassNotFoundException") {
        return (ErrorType::ClassNotFound, 0.85);
    }
    if exception_class.ends_with("NoSuchMethodError") && mentions_migration_pair(message) {
        return (ErrorType::LinkageError, 0.9);
    }
    if exception_class.ends_with("LinkageError")
        || exception_class.ends_with("IncompatibleClassChangeError")
    {
        return (ErrorType::LinkageError, 0.85);
    }
    (ErrorType::Other, 0.3)
}

fn mentions_migration_pair(text: &str) -> bool {
    let slashed = text.replace('/', ".");
    MIGRATION_PAIRS
        .iter()
        .any(|(javax, jakarta)| slashed.contains(javax) || slashed.contains(jakarta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn classifies_javax_no_class_def() {
        let parsed = parse_output(&lines(
            "Exception in thread \"main\" java.lang.NoClassDefFoundError: javax/servlet/http/HttpServlet\n\tat com.example.App.main(App.java:10)",
        ));
        assert_eq!(parsed.errors.len(), 1);
        let error = &parsed.errors[0];
        assert_eq!(error.error_type, ErrorType::MissingJakartaClass);
        assert_eq!(error.confidence, 0.95);
        assert_eq!(error.originating_class.as_deref(), Some("com.example.App"));
        assert_eq!(error.originating_method.as_deref(), Some("main"));
        let trace = error.stack_trace.as_ref().unwrap();
        assert_eq!(trace.exception_class, "java.lang.NoClassDefFoundError");
        assert_eq!(trace.frames[0].line, Some(10));
    }

    #[test]
    fn jakarta_no_class_def_is_incomplete_migration() {
        let parsed = parse_output(&lines(
            "java.lang.NoClassDefFoundError: jakarta/persistence/Entity",
        ));
        assert_eq!(parsed.errors[0].error_type, ErrorType::MissingJakartaClass);
        assert_eq!(parsed.errors[0].confidence, 0.9);
    }

    #[test]
    fn classifies_class_not_found() {
        let parsed = parse_output(&lines(
            "java.lang.ClassNotFoundException: jakarta.servlet.Servlet",
        ));
        assert_eq!(parsed.errors[0].error_type, ErrorType::ClassNotFound);
        assert_eq!(parsed.errors[0].confidence, 0.85);
    }

    #[test]
    fn classifies_linkage_errors() {
        let parsed = parse_output(&lines(
            "java.lang.IncompatibleClassChangeError: Implementing class",
        ));
        assert_eq!(parsed.errors[0].error_type, ErrorType::LinkageError);
        assert_eq!(parsed.errors[0].confidence, 0.85);
    }

    #[test]
    fn no_such_method_on_migration_pair_is_linkage() {
        let parsed = parse_output(&lines(
            "java.lang.NoSuchMethodError: 'void jakarta.servlet.ServletContext.addListener(java.lang.String)'",
        ));
        assert_eq!(parsed.errors[0].error_type, ErrorType::LinkageError);
        assert_eq!(parsed.errors[0].confidence, 0.9);
    }

    #[test]
    fn no_such_method_elsewhere_is_other() {
        let parsed = parse_output(&lines(
            "java.lang.NoSuchMethodError: 'int com.example.Util.size()'",
        ));
        assert_eq!(parsed.errors[0].error_type, ErrorType::Other);
        assert_eq!(parsed.errors[0].confidence, 0.3);
    }

    #[test]
    fn unknown_exception_is_low_confidence_other() {
        let parsed = parse_output(&lines("com.example.BootException: startup failed"));
        assert_eq!(parsed.errors[0].error_type, ErrorType::Other);
        assert_eq!(parsed.errors[0].confidence, 0.3);
    }

    #[test]
    fn warnings_are_collected_separately() {
        let parsed = parse_output(&lines(
            "WARNING: An illegal reflective access operation has occurred\nNote: App.java uses deprecated APIs.\njava.lang.ClassNotFoundException: x.Y",
        ));
        assert_eq!(parsed.warnings.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
    }

    #[test]
    fn bare_error_header_is_other() {
        let parsed = parse_output(&lines("Error: Unable to access jarfile app.jar"));
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].error_type, ErrorType::Other);
    }

    #[test]
    fn plain_output_produces_nothing() {
        let parsed = parse_output(&lines("Started application in 2.3 seconds\nListening on :8080"));
        assert!(parsed.errors.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn caused_by_headers_are_parsed() {
        let parsed = parse_output(&lines(
            "java.lang.RuntimeException: boot failed\n\tat com.example.App.main(App.java:5)\nCaused by: java.lang.NoClassDefFoundError: javax/jms/Queue\n\tat com.example.Mq.init(Mq.java:22)",
        ));
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].error_type, ErrorType::Other);
        assert_eq!(parsed.errors[1].error_type, ErrorType::MissingJakartaClass);
        assert_eq!(
            parsed.errors[1].originating_class.as_deref(),
            Some("com.example.Mq")
        );
    }
}
