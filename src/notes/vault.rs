use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::errors::{TimelineError, TimelineResult};

use super::frontmatter;
use super::note::{Note, NoteDraft, NoteId, PropertyChanges};
use super::property::{NoteProperty, PropertyKind};
use super::repository::{MutableNoteRepository, NotePropertyRepository, NoteRepository};

const DEFAULT_NOTE_NAME: &str = "Untitled";

#[derive(Debug, Default, Deserialize)]
struct TypesFile {
    #[serde(default)]
    types: HashMap<String, String>,
}

/// Result of reading a vault from disk; safe to build on a worker thread.
#[derive(Clone, Debug, Default)]
pub struct VaultSnapshot {
    notes: BTreeMap<NoteId, Note>,
    declared_types: HashMap<String, PropertyKind>,
}

impl VaultSnapshot {
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(anyhow!("vault path {} is not a directory", root.display()));
        }

        let mut paths = Vec::new();
        collect_markdown_files(root, &mut paths)
            .with_context(|| format!("failed to list notes under {}", root.display()))?;

        let mut notes = BTreeMap::new();
        for path in paths {
            match read_note(root, &path) {
                Ok(note) => {
                    notes.insert(note.id.clone(), note);
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "skipping unreadable note");
                }
            }
        }

        let declared_types = read_declared_types(root);
        tracing::info!(
            vault = %root.display(),
            notes = notes.len(),
            declared_types = declared_types.len(),
            "scanned vault"
        );

        Ok(Self {
            notes,
            declared_types,
        })
    }
}

/// Ids of notes that changed between two scans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultChanges {
    pub created: Vec<NoteId>,
    pub modified: Vec<NoteId>,
    pub deleted: Vec<NoteId>,
}

impl VaultChanges {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Folder of markdown notes with YAML frontmatter.
pub struct Vault {
    root: PathBuf,
    notes: BTreeMap<NoteId, Arc<Note>>,
    declared_types: HashMap<String, PropertyKind>,
}

impl Vault {
    pub fn from_snapshot(root: PathBuf, snapshot: VaultSnapshot) -> Self {
        Self {
            root,
            notes: snapshot
                .notes
                .into_iter()
                .map(|(id, note)| (id, Arc::new(note)))
                .collect(),
            declared_types: snapshot.declared_types,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Replaces the note set, keeping the existing `Arc` for notes that did not change.
    pub fn apply_snapshot(&mut self, snapshot: VaultSnapshot) -> VaultChanges {
        let mut changes = VaultChanges::default();
        let mut next = BTreeMap::new();

        for (id, note) in snapshot.notes {
            match self.notes.remove(&id) {
                Some(existing) if *existing == note => {
                    next.insert(id, existing);
                }
                Some(_) => {
                    changes.modified.push(id.clone());
                    next.insert(id, Arc::new(note));
                }
                None => {
                    changes.created.push(id.clone());
                    next.insert(id, Arc::new(note));
                }
            }
        }

        changes.deleted = self.notes.keys().cloned().collect();
        self.notes = next;
        self.declared_types = snapshot.declared_types;
        changes
    }

    pub fn rescan(&mut self) -> Result<VaultChanges> {
        let snapshot = VaultSnapshot::scan(&self.root)?;
        Ok(self.apply_snapshot(snapshot))
    }

    fn property_kind(&self, name: &str) -> Option<PropertyKind> {
        if let Some(kind) = self.declared_types.get(name) {
            return Some(*kind);
        }

        self.notes
            .values()
            .filter_map(|note| note.property(name))
            .find(|value| !value.is_null())
            .map(PropertyKind::infer)
    }

    fn reload(&mut self, id: &NoteId) -> TimelineResult<Arc<Note>> {
        let path = self.root.join(id.as_str());
        let note = read_note(&self.root, &path)
            .map_err(|error| TimelineError::Io(format!("{error:#}")))?;
        let note = Arc::new(note);
        self.notes.insert(id.clone(), Arc::clone(&note));
        Ok(note)
    }
}

impl NoteRepository for Vault {
    fn list_all(&self) -> Vec<Arc<Note>> {
        self.notes.values().cloned().collect()
    }

    fn note(&self, id: &NoteId) -> Option<Arc<Note>> {
        self.notes.get(id).cloned()
    }
}

impl MutableNoteRepository for Vault {
    fn create_note(&mut self, draft: NoteDraft) -> TimelineResult<Arc<Note>> {
        let folder = validate_folder(&draft.folder)?;
        let base_name = draft
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NOTE_NAME);
        validate_name(base_name)?;

        let directory = self.root.join(&folder);
        fs::create_dir_all(&directory)?;

        let mut suffix = 0usize;
        let path = loop {
            let file_name = if suffix == 0 {
                format!("{base_name}.md")
            } else {
                format!("{base_name} {suffix}.md")
            };
            let candidate = directory.join(file_name);
            if !candidate.exists() {
                break candidate;
            }
            suffix += 1;
        };

        let document = frontmatter::render(&draft.properties, "")
            .map_err(|error| TimelineError::Frontmatter(error.to_string()))?;
        fs::write(&path, document)?;

        let id = note_id_for(&self.root, &path)
            .ok_or_else(|| TimelineError::InvalidNoteName(path.display().to_string()))?;
        tracing::info!(note = %id, "created note");
        self.reload(&id)
    }

    fn modify_note(&mut self, id: &NoteId, changes: &PropertyChanges) -> TimelineResult<Arc<Note>> {
        if !self.notes.contains_key(id) {
            return Err(TimelineError::NoteNotFound(id.to_string()));
        }

        let path = self.root.join(id.as_str());
        let content = fs::read_to_string(&path)?;
        let (yaml, body) = frontmatter::split(&content);
        let mut properties = match yaml {
            Some(yaml) => frontmatter::parse(yaml)
                .map_err(|error| TimelineError::Frontmatter(format!("{error:#}")))?,
            None => serde_json::Map::new(),
        };
        changes.apply_to(&mut properties);

        let document = frontmatter::render(&properties, body)
            .map_err(|error| TimelineError::Frontmatter(error.to_string()))?;
        fs::write(&path, document)?;
        tracing::debug!(note = %id, "updated note frontmatter");
        self.reload(id)
    }
}

impl NotePropertyRepository for Vault {
    fn list_properties_of_types(&self, kinds: &[PropertyKind]) -> Vec<NoteProperty> {
        let mut properties = Vec::new();
        if kinds.contains(&PropertyKind::DateTime) {
            properties.push(NoteProperty::created());
            properties.push(NoteProperty::modified());
        }

        let mut names = self
            .notes
            .values()
            .flat_map(|note| note.properties.keys())
            .chain(self.declared_types.keys())
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names.dedup();

        for name in names {
            let property = NoteProperty::new(name, PropertyKind::Unknown);
            if property.is_builtin() {
                continue;
            }
            if let Some(kind) = self.property_kind(&property.name)
                && kinds.contains(&kind)
            {
                properties.push(NoteProperty { kind, ..property });
            }
        }

        properties
    }

    fn property_by_name(&self, name: &str) -> Option<NoteProperty> {
        match name {
            super::property::CREATED => return Some(NoteProperty::created()),
            super::property::MODIFIED => return Some(NoteProperty::modified()),
            _ => {}
        }

        self.property_kind(name)
            .map(|kind| NoteProperty::new(name, kind))
    }
}

fn collect_markdown_files(root: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_markdown_files(&path, out)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) == Some("md") {
            out.push(path);
        }
    }
    Ok(())
}

pub(crate) fn note_id_for(root: &Path, path: &Path) -> Option<NoteId> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(NoteId::new(parts.join("/")))
}

fn millis_since_epoch(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

fn read_note(root: &Path, path: &Path) -> Result<Note> {
    let id = note_id_for(root, path)
        .ok_or_else(|| anyhow!("{} is not inside the vault", path.display()))?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;

    let modified = metadata.modified().map(millis_since_epoch).unwrap_or(0);
    let created = metadata
        .created()
        .map(millis_since_epoch)
        .unwrap_or(modified);
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Note {
        properties: frontmatter::read(&content, id.as_str()),
        id,
        name,
        created,
        modified,
    })
}

fn read_declared_types(root: &Path) -> HashMap<String, PropertyKind> {
    let path = root.join(".obsidian").join("types.json");
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return HashMap::new(),
    };

    match serde_json::from_str::<TypesFile>(&raw) {
        Ok(file) => file
            .types
            .into_iter()
            .map(|(name, kind)| (name, PropertyKind::from_type_name(&kind)))
            .collect(),
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "ignoring malformed property types file");
            HashMap::new()
        }
    }
}

fn validate_folder(folder: &str) -> TimelineResult<PathBuf> {
    let path = Path::new(folder.trim_matches('/'));
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) if !part.to_string_lossy().starts_with('.') => {
                clean.push(part);
            }
            Component::CurDir => {}
            _ => return Err(TimelineError::InvalidNoteName(folder.to_owned())),
        }
    }
    Ok(clean)
}

fn validate_name(name: &str) -> TimelineResult<()> {
    if name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(TimelineError::InvalidNoteName(name.to_owned()));
    }
    Ok(())
}
