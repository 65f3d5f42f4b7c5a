use std::fmt;

use serde_json::{Map, Value};

/// Vault-relative path of a note, always using `/` separators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub name: String,
    /// Epoch milliseconds.
    pub created: i64,
    /// Epoch milliseconds.
    pub modified: i64,
    pub properties: Map<String, Value>,
}

impl Note {
    pub fn path(&self) -> &str {
        self.id.as_str()
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Input for creating a note through a mutable repository.
#[derive(Clone, Debug, Default)]
pub struct NoteDraft {
    pub folder: String,
    pub name: Option<String>,
    pub properties: Map<String, Value>,
}

/// Frontmatter edits; `None` removes the key.
#[derive(Clone, Debug, Default)]
pub struct PropertyChanges {
    pub set: Vec<(String, Option<Value>)>,
}

impl PropertyChanges {
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set.push((name.into(), Some(value)));
        self
    }

    pub fn apply_to(&self, properties: &mut Map<String, Value>) {
        for (name, value) in &self.set {
            match value {
                Some(value) => {
                    properties.insert(name.clone(), value.clone());
                }
                None => {
                    properties.remove(name);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_note(path: &str, properties: Value) -> Note {
    let name = path
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".md")
        .to_owned();
    Note {
        id: NoteId::new(path),
        name,
        created: 1_000,
        modified: 2_000,
        properties: properties.as_object().cloned().unwrap_or_default(),
    }
}
