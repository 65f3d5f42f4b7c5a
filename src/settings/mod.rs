mod store;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::groups::palette::next_default_color;
use crate::notes::CREATED;

pub use store::SettingsStore;

pub const DEFAULT_POINT_SIZE: f64 = 12.0;

/// One persisted colour group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSetting {
    pub query: String,
    pub color: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Edit,
    View,
}

impl ViewMode {
    fn parse(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("view") => Self::View,
            _ => Self::Edit,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Edit => Self::View,
            Self::View => Self::Edit,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplaySettings {
    pub point_size: f64,
    /// Property whose value marks the end of a ranged item.
    pub end_property: Option<String>,
    pub show_ruler: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            point_size: DEFAULT_POINT_SIZE,
            end_property: None,
            show_ruler: true,
        }
    }
}

/// Typed view of the persisted document. Every field defaults independently.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub focal_value: f64,
    pub v_scroll: f64,
    pub mode: ViewMode,
    pub scale: f64,
    pub property: String,
    pub whole_numbers: BTreeMap<String, bool>,
    pub query: String,
    pub groups: Vec<GroupSetting>,
    pub display: DisplaySettings,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            focal_value: 0.0,
            v_scroll: 0.0,
            mode: ViewMode::Edit,
            scale: 1.0,
            property: CREATED.to_owned(),
            whole_numbers: BTreeMap::new(),
            query: String::new(),
            groups: Vec::new(),
            display: DisplaySettings::default(),
        }
    }
}

impl ViewState {
    pub fn read(store: &SettingsStore) -> Self {
        let settings = store.namespace("settings");
        let property = settings.namespace("property");
        let filter = settings.namespace("filter");
        let groups = settings.namespace("groups");
        let display = settings.namespace("display");
        let defaults = DisplaySettings::default();

        Self {
            focal_value: finite(store.get("focalValue")).unwrap_or(0.0),
            v_scroll: finite(store.get("vScroll"))
                .filter(|value| *value >= 0.0)
                .unwrap_or(0.0),
            mode: ViewMode::parse(store.get("mode").as_ref()),
            scale: finite(store.get("scale"))
                .filter(|value| *value > 0.0)
                .unwrap_or(1.0),
            property: string(property.get("property"))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| CREATED.to_owned()),
            whole_numbers: flags(property.get("propertiesUseWholeNumbers")),
            query: string(filter.get("query")).unwrap_or_default(),
            groups: group_list(groups.get("groups")),
            display: DisplaySettings {
                point_size: finite(display.get("pointSize"))
                    .filter(|size| *size > 0.0)
                    .unwrap_or(defaults.point_size),
                end_property: string(display.get("endProperty")).filter(|name| !name.is_empty()),
                show_ruler: display
                    .get_as::<bool>("showRuler")
                    .unwrap_or(defaults.show_ruler),
            },
        }
    }

    /// Writes every known field; unknown fields in the document are left alone.
    pub fn write(&self, store: &SettingsStore) {
        store.set("focalValue", self.focal_value);
        store.set("vScroll", self.v_scroll);
        store.set("mode", self.mode);
        store.set("scale", self.scale);

        let settings = store.namespace("settings");
        let property = settings.namespace("property");
        property.set("property", &self.property);
        property.set("propertiesUseWholeNumbers", &self.whole_numbers);
        settings.namespace("filter").set("query", &self.query);
        settings.namespace("groups").set("groups", &self.groups);

        let display = settings.namespace("display");
        display.set("pointSize", self.display.point_size);
        match &self.display.end_property {
            Some(name) => display.set("endProperty", name),
            None => display.remove("endProperty"),
        };
        display.set("showRuler", self.display.show_ruler);
    }

    pub fn uses_whole_numbers(&self, property: &str) -> bool {
        self.whole_numbers.get(property).copied().unwrap_or(false)
    }
}

/// Returns the document with every known field present and valid.
pub fn sanitize(document: Value) -> Value {
    let store = SettingsStore::new(document);
    ViewState::read(&store).write(&store);
    store.snapshot()
}

/// Reads the view document. Missing or malformed files yield the defaults.
pub fn load_document(path: &Path) -> Value {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return sanitize(Value::Object(Map::new()));
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "failed to read view state; using defaults");
            return sanitize(Value::Object(Map::new()));
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(document) => sanitize(document),
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "malformed view state; using defaults");
            sanitize(Value::Object(Map::new()))
        }
    }
}

pub fn save_document(path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(document).context("failed to encode view state")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn finite(value: Option<Value>) -> Option<f64> {
    value
        .and_then(|value| value.as_f64())
        .filter(|number| number.is_finite())
}

fn string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

fn flags(value: Option<Value>) -> BTreeMap<String, bool> {
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };
    entries
        .into_iter()
        .filter_map(|(name, flag)| flag.as_bool().map(|flag| (name, flag)))
        .collect()
}

fn group_list(value: Option<Value>) -> Vec<GroupSetting> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    let mut groups: Vec<GroupSetting> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Object(mut fields) = entry else {
            continue;
        };
        let query = string(fields.remove("query")).unwrap_or_default();
        let color = string(fields.remove("color")).unwrap_or_else(|| {
            next_default_color(groups.iter().map(|group| group.color.as_str())).to_owned()
        });
        groups.push(GroupSetting { query, color });
    }
    groups
}
