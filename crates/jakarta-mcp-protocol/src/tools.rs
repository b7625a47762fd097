//! Tool catalogue wire types: descriptors, generated input schemas, and
//! `tools/call` payloads.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// The JSON types a tool parameter may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
        }
    }
}

/// One property of a generated tool schema
#[derive(Debug, Clone)]
pub struct PropertySchema {
    pub name: String,
    pub json_type: JsonType,
    pub description: String,
}

/// The generated `inputSchema` of a tool.
///
/// Properties keep their declaration order on the wire, so schema output is
/// stable across runs and suitable for snapshot assertions. `required` is
/// omitted entirely when empty.
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    pub properties: Vec<PropertySchema>,
    pub required: Vec<String>,
}

impl ToolSchema {
    pub fn new(properties: Vec<PropertySchema>, required: Vec<String>) -> Self {
        Self {
            properties,
            required,
        }
    }
}

impl Serialize for ToolSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Properties<'a>(&'a [PropertySchema]);

        impl Serialize for Properties<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                struct Property<'a>(&'a PropertySchema);

                impl Serialize for Property<'_> {
                    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                        let mut map = serializer.serialize_map(Some(2))?;
                        map.serialize_entry("type", self.0.json_type.as_str())?;
                        map.serialize_entry("description", &self.0.description)?;
                        map.end()
                    }
                }

                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for property in self.0 {
                    map.serialize_entry(&property.name, &Property(property))?;
                }
                map.end()
            }
        }

        let entries = if self.required.is_empty() { 2 } else { 3 };
        let mut map = serializer.serialize_map(Some(entries))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &Properties(&self.properties))?;
        if !self.required.is_empty() {
            map.serialize_entry("required", &self.required)?;
        }
        map.end()
    }
}

/// A tool descriptor as rendered in `tools/list`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: ToolSchema,
}

/// Result payload for `tools/list`
#[derive(Debug, Clone, Serialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Parameters of a `tools/call` request
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// One entry in a tool result's `content` array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result payload for `tools/call`. Always carries at least one content
/// block on the success path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
        }
    }
}
