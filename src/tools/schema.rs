//! Tool metadata as published by the backend.

use serde::{Deserialize, Serialize};

/// UI type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Url,
    Number,
    Range,
    Checkbox,
    Select,
}

/// A select option, either a bare value or a value with a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectOption {
    Plain(String),
    Labeled { value: String, label: String },
}

impl SelectOption {
    pub fn value(&self) -> &str {
        match self {
            SelectOption::Plain(v) => v,
            SelectOption::Labeled { value, .. } => value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SelectOption::Plain(v) => v,
            SelectOption::Labeled { label, .. } => label,
        }
    }
}

/// One input of a tool form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
}

impl FieldDescriptor {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value() == value)
    }
}

/// A backend-defined tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered input fields.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Generators (passwords, UUIDs, ...) keep a history of results
    /// instead of replacing the last one.
    #[serde(default)]
    pub repeatable: bool,
}

impl ToolSchema {
    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Backend endpoint running this tool.
    pub fn run_path(&self) -> String {
        format!("/tools/{}/run", self.slug)
    }
}
