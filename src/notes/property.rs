use serde_json::Value;

use super::select::{parse_date_millis, parse_number};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Number,
    Date,
    DateTime,
    Text,
    Checkbox,
    List,
    Unknown,
}

impl PropertyKind {
    /// Parses the type names used in `.obsidian/types.json`.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "number" => Self::Number,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "text" => Self::Text,
            "checkbox" => Self::Checkbox,
            "multitext" | "tags" | "aliases" => Self::List,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::List => "list",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }

    /// Best guess for a frontmatter value when no declared type exists.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Checkbox,
            Value::Array(_) => Self::List,
            Value::String(text) => {
                if parse_number(value).is_some() {
                    Self::Number
                } else if parse_date_millis(text).is_some() {
                    if text.contains(':') {
                        Self::DateTime
                    } else {
                        Self::Date
                    }
                } else {
                    Self::Text
                }
            }
            Value::Null | Value::Object(_) => Self::Unknown,
        }
    }
}

pub const CREATED: &str = "created";
pub const MODIFIED: &str = "modified";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NoteProperty {
    pub name: String,
    pub kind: PropertyKind,
}

impl NoteProperty {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn created() -> Self {
        Self::new(CREATED, PropertyKind::DateTime)
    }

    pub fn modified() -> Self {
        Self::new(MODIFIED, PropertyKind::DateTime)
    }

    pub fn is_builtin(&self) -> bool {
        self.name == CREATED || self.name == MODIFIED
    }
}
