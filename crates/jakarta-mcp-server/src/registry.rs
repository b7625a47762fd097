//! Tool registry: descriptors, schema generation, argument coercion, and
//! lookup.
//!
//! Tools register through a declarative DSL at startup; the registry
//! validates every descriptor before the server accepts traffic and is
//! read-only afterwards. Handlers receive coerced, name-keyed arguments
//! and return their output as the exact string rendered into the
//! `tools/call` content block.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use jakarta_mcp_protocol::{
    JsonType, McpError, McpResult, PropertySchema, Tool, ToolSchema,
};

use crate::licensing::Tier;

/// One declared tool parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub json_type: JsonType,
    pub description: String,
    pub required: bool,
}

impl ParameterDescriptor {
    pub fn new(
        name: impl Into<String>,
        json_type: JsonType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            json_type,
            description: description.into(),
            required,
        }
    }

    pub fn required_string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, JsonType::String, description, true)
    }

    pub fn optional_string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, JsonType::String, description, false)
    }

    pub fn optional_integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, JsonType::Integer, description, false)
    }

    pub fn optional_boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, JsonType::Boolean, description, false)
    }
}

/// Immutable record describing one registered tool
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub required_tier: Tier,
    pub billing_event: Option<String>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            required_tier: Tier::Community,
            billing_event: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterDescriptor>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_required_tier(mut self, tier: Tier) -> Self {
        self.required_tier = tier;
        self
    }

    pub fn with_billing_event(mut self, event: impl Into<String>) -> Self {
        self.billing_event = Some(event.into());
        self
    }

    /// Render the wire descriptor, generating the input schema from the
    /// parameter list in declaration order.
    pub fn to_tool(&self) -> Tool {
        let properties = self
            .parameters
            .iter()
            .map(|p| PropertySchema {
                name: p.name.clone(),
                json_type: p.json_type,
                description: p.description.clone(),
            })
            .collect();
        let required = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.clone())
            .collect();
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: ToolSchema::new(properties, required),
        }
    }
}

/// A coerced argument value, typed per the parameter's declared JSON type.
/// `Absent` stands in for optional parameters the caller omitted.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Absent,
}

/// Name-keyed coerced arguments handed to a tool handler
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    values: HashMap<String, ArgumentValue>,
}

impl ToolArguments {
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgumentValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgumentValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgumentValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgumentValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Required-string accessor for handlers whose descriptor marks the
    /// parameter required; absence here means the coercion layer is out of
    /// sync with the descriptor.
    pub fn require_str(&self, name: &str) -> McpResult<&str> {
        self.get_str(name)
            .ok_or_else(|| McpError::missing_param(name))
    }
}

/// Coerce a raw argument map against a descriptor's parameter list.
///
/// Rules: strings accept any scalar; integers accept JSON numbers or
/// numeric strings; booleans are strict; numbers accept any JSON number.
/// Missing required parameters fail; missing optional parameters coerce to
/// [`ArgumentValue::Absent`]; unknown extra keys are ignored.
pub fn coerce_arguments(
    descriptor: &ToolDescriptor,
    arguments: &Map<String, Value>,
) -> McpResult<ToolArguments> {
    let mut values = HashMap::with_capacity(descriptor.parameters.len());
    for parameter in &descriptor.parameters {
        let coerced = match arguments.get(&parameter.name) {
            None | Some(Value::Null) => {
                if parameter.required {
                    return Err(McpError::missing_param(&parameter.name));
                }
                ArgumentValue::Absent
            }
            Some(value) => coerce_value(parameter, value)?,
        };
        values.insert(parameter.name.clone(), coerced);
    }
    Ok(ToolArguments { values })
}

fn coerce_value(parameter: &ParameterDescriptor, value: &Value) -> McpResult<ArgumentValue> {
    let mismatch = || McpError::invalid_param_type(&parameter.name, parameter.json_type.as_str());
    match parameter.json_type {
        JsonType::String => match value {
            Value::String(s) => Ok(ArgumentValue::String(s.clone())),
            Value::Number(n) => Ok(ArgumentValue::String(n.to_string())),
            Value::Bool(b) => Ok(ArgumentValue::String(b.to_string())),
            _ => Err(mismatch()),
        },
        JsonType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .map(ArgumentValue::Integer)
                .ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ArgumentValue::Integer)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        JsonType::Boolean => match value {
            Value::Bool(b) => Ok(ArgumentValue::Boolean(*b)),
            _ => Err(mismatch()),
        },
        JsonType::Number => match value {
            Value::Number(n) => n
                .as_f64()
                .map(ArgumentValue::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
    }
}

/// Async handler behind a registered tool. The returned string is rendered
/// verbatim as the `content[0].text` of the `tools/call` result.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArguments) -> McpResult<String>;
}

/// One descriptor + handler pair produced by a provider
pub struct ToolRegistration {
    pub descriptor: ToolDescriptor,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolRegistration {
    pub fn new<H: ToolHandler + 'static>(descriptor: ToolDescriptor, handler: H) -> Self {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }
}

/// A group of related tools registered together at startup
pub trait ToolProvider {
    fn tools(&self) -> Vec<ToolRegistration>;
}

/// Startup-time registry validation failures. Any of these refuses to
/// serve.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("tool name must be non-empty ASCII: {0:?}")]
    InvalidToolName(String),

    #[error("tool '{0}' has an empty description")]
    EmptyDescription(String),

    #[error("tool '{tool}' declares duplicate parameter '{parameter}'")]
    DuplicateParameter { tool: String, parameter: String },
}

/// The process-wide tool catalogue. Built once, never mutated afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolRegistration>>,
    // Registration order, for stable tools/list output.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every tool a provider offers
    pub fn register_provider(&mut self, provider: &dyn ToolProvider) -> Result<(), RegistryError> {
        for registration in provider.tools() {
            self.register(registration)?;
        }
        Ok(())
    }

    pub fn register(&mut self, registration: ToolRegistration) -> Result<(), RegistryError> {
        let descriptor = &registration.descriptor;
        validate_descriptor(descriptor)?;
        let name = descriptor.name.clone();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, Arc::new(registration));
        Ok(())
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&Arc<ToolRegistration>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Wire descriptors in registration order
    pub fn list_tools(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|registration| registration.descriptor.to_tool())
            .collect()
    }
}

fn validate_descriptor(descriptor: &ToolDescriptor) -> Result<(), RegistryError> {
    if descriptor.name.is_empty() || !descriptor.name.is_ascii() {
        return Err(RegistryError::InvalidToolName(descriptor.name.clone()));
    }
    if descriptor.description.is_empty() {
        return Err(RegistryError::EmptyDescription(descriptor.name.clone()));
    }
    let mut seen = HashSet::new();
    for parameter in &descriptor.parameters {
        if !seen.insert(parameter.name.as_str()) {
            return Err(RegistryError::DuplicateParameter {
                tool: descriptor.name.clone(),
                parameter: parameter.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoopHandler;

    #[async_trait]
    impl ToolHandler for NoopHandler {
        async fn call(&self, _args: ToolArguments) -> McpResult<String> {
            Ok("{}".to_string())
        }
    }

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new("analyzeProject", "Analyze a Maven or Gradle project")
            .with_parameters(vec![
                ParameterDescriptor::required_string("projectPath", "Path to the project root"),
                ParameterDescriptor::optional_integer("maxDepth", "Dependency depth limit"),
                ParameterDescriptor::optional_boolean("includeTransitive", "Follow transitive deps"),
            ])
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn schema_required_matches_declared() {
        let tool = descriptor().to_tool();
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["inputSchema"]["required"], json!(["projectPath"]));
        assert_eq!(value["inputSchema"]["type"], "object");
    }

    #[test]
    fn coerces_declared_types() {
        let coerced = coerce_arguments(
            &descriptor(),
            &args(json!({
                "projectPath": "/srv/app",
                "maxDepth": "4",
                "includeTransitive": true
            })),
        )
        .unwrap();

        assert_eq!(coerced.get_str("projectPath"), Some("/srv/app"));
        assert_eq!(coerced.get_i64("maxDepth"), Some(4));
        assert_eq!(coerced.get_bool("includeTransitive"), Some(true));
    }

    #[test]
    fn string_accepts_any_scalar() {
        let coerced =
            coerce_arguments(&descriptor(), &args(json!({"projectPath": 42}))).unwrap();
        assert_eq!(coerced.get_str("projectPath"), Some("42"));
    }

    #[test]
    fn missing_required_parameter_fails() {
        let err = coerce_arguments(&descriptor(), &args(json!({}))).unwrap_err();
        assert!(matches!(err, McpError::MissingParameter(ref p) if p == "projectPath"));
    }

    #[test]
    fn missing_optional_parameter_is_absent() {
        let coerced =
            coerce_arguments(&descriptor(), &args(json!({"projectPath": "/srv/app"}))).unwrap();
        assert_eq!(coerced.get_i64("maxDepth"), None);
        assert_eq!(coerced.get_bool("includeTransitive"), None);
    }

    #[test]
    fn boolean_is_strict() {
        let err = coerce_arguments(
            &descriptor(),
            &args(json!({"projectPath": "/srv/app", "includeTransitive": "yes"})),
        )
        .unwrap_err();
        assert!(matches!(err, McpError::InvalidParameterType { ref param, .. }
            if param == "includeTransitive"));
    }

    #[test]
    fn non_numeric_integer_string_fails() {
        let err = coerce_arguments(
            &descriptor(),
            &args(json!({"projectPath": "/srv/app", "maxDepth": "deep"})),
        )
        .unwrap_err();
        assert!(matches!(err, McpError::InvalidParameterType { ref param, .. }
            if param == "maxDepth"));
    }

    #[test]
    fn unknown_extra_keys_are_ignored() {
        let coerced = coerce_arguments(
            &descriptor(),
            &args(json!({"projectPath": "/srv/app", "whatever": [1, 2, 3]})),
        )
        .unwrap();
        assert_eq!(coerced.get_str("projectPath"), Some("/srv/app"));
    }

    #[test]
    fn duplicate_tool_is_startup_error() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolRegistration::new(descriptor(), NoopHandler))
            .unwrap();
        let err = registry
            .register(ToolRegistration::new(descriptor(), NoopHandler))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(ref n) if n == "analyzeProject"));
    }

    #[test]
    fn rejects_malformed_descriptors() {
        let mut registry = ToolRegistry::new();
        let unnamed = ToolDescriptor::new("", "desc");
        assert!(matches!(
            registry.register(ToolRegistration::new(unnamed, NoopHandler)),
            Err(RegistryError::InvalidToolName(_))
        ));

        let undescribed = ToolDescriptor::new("tool", "");
        assert!(matches!(
            registry.register(ToolRegistration::new(undescribed, NoopHandler)),
            Err(RegistryError::EmptyDescription(_))
        ));

        let duplicated = ToolDescriptor::new("tool", "desc").with_parameters(vec![
            ParameterDescriptor::required_string("path", "a"),
            ParameterDescriptor::optional_string("path", "b"),
        ]);
        assert!(matches!(
            registry.register(ToolRegistration::new(duplicated, NoopHandler)),
            Err(RegistryError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn list_tools_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(ToolRegistration::new(
                    ToolDescriptor::new(name, "a tool"),
                    NoopHandler,
                ))
                .unwrap();
        }
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolRegistration::new(descriptor(), NoopHandler))
            .unwrap();
        assert!(registry.get("analyzeProject").is_some());
        assert!(registry.get("analyzeproject").is_none());
    }
}
