use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

type Listener = Box<dyn FnMut(&str)>;

struct StoreRoot {
    document: Value,
    dirty: bool,
    listeners: Vec<Listener>,
}

/// Key-path view over a JSON settings document.
///
/// `namespace` returns a child scoped to a nested object. Writes through any
/// child mark the shared root dirty and notify listeners with the dotted
/// path of the namespace that changed.
#[derive(Clone)]
pub struct SettingsStore {
    root: Rc<RefCell<StoreRoot>>,
    path: Vec<String>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("dirty", &self.root.borrow().dirty)
            .finish()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl SettingsStore {
    pub fn new(document: Value) -> Self {
        let document = match document {
            Value::Object(_) => document,
            _ => Value::Object(Map::new()),
        };
        Self {
            root: Rc::new(RefCell::new(StoreRoot {
                document,
                dirty: false,
                listeners: Vec::new(),
            })),
            path: Vec::new(),
        }
    }

    pub fn namespace(&self, key: &str) -> Self {
        let mut path = self.path.clone();
        path.push(key.to_owned());
        Self {
            root: Rc::clone(&self.root),
            path,
        }
    }

    pub fn path(&self) -> String {
        self.path.join(".")
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let root = self.root.borrow();
        let mut node = &root.document;
        for part in &self.path {
            node = node.get(part)?;
        }
        node.get(key).cloned()
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Writes a leaf, creating intermediate objects. Returns false when nothing changed.
    pub fn set(&self, key: &str, value: impl Serialize) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(path = %self.path(), key, error = %error, "ignoring unserialisable setting");
                return false;
            }
        };

        let changed = {
            let mut root = self.root.borrow_mut();
            let changed = write_leaf(&mut root.document, &self.path, key, value).unwrap_or(false);
            if changed {
                root.dirty = true;
            }
            changed
        };

        if changed {
            self.notify();
        }
        changed
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = {
            let mut root = self.root.borrow_mut();
            let mut node = &mut root.document;
            for part in &self.path {
                match node.get_mut(part) {
                    Some(child) => node = child,
                    None => return false,
                }
            }
            let removed = node
                .as_object_mut()
                .and_then(|object| object.remove(key))
                .is_some();
            if removed {
                root.dirty = true;
            }
            removed
        };

        if removed {
            self.notify();
        }
        removed
    }

    pub fn on_change(&self, listener: impl FnMut(&str) + 'static) {
        self.root.borrow_mut().listeners.push(Box::new(listener));
    }

    pub fn is_dirty(&self) -> bool {
        self.root.borrow().dirty
    }

    /// Returns whether the document changed since the last call.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.root.borrow_mut().dirty)
    }

    pub fn snapshot(&self) -> Value {
        self.root.borrow().document.clone()
    }

    fn notify(&self) {
        let path = self.path();
        let mut listeners = std::mem::take(&mut self.root.borrow_mut().listeners);
        for listener in &mut listeners {
            listener(&path);
        }
        let mut root = self.root.borrow_mut();
        listeners.append(&mut root.listeners);
        root.listeners = listeners;
    }
}

fn write_leaf(document: &mut Value, path: &[String], key: &str, value: Value) -> Option<bool> {
    let mut node = document;
    for part in path {
        node = object_mut(node)?
            .entry(part.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let object = object_mut(node)?;
    if object.get(key) == Some(&value) {
        return Some(false);
    }
    object.insert(key.to_owned(), value);
    Some(true)
}

/// Replaces non-object nodes with an empty object.
fn object_mut(node: &mut Value) -> Option<&mut Map<String, Value>> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::SettingsStore;

    #[test]
    fn namespaces_read_and_write_nested_keys() {
        let store = SettingsStore::new(json!({ "settings": { "filter": { "query": "work" } } }));
        let filter = store.namespace("settings").namespace("filter");
        assert_eq!(filter.get_as::<String>("query"), Some("work".into()));
        assert_eq!(filter.path(), "settings.filter");

        assert!(filter.set("query", "meeting"));
        assert!(!filter.set("query", "meeting"));
        assert!(store.namespace("settings").namespace("display").set("showRuler", false));
        assert_eq!(
            store.snapshot(),
            json!({
                "settings": {
                    "filter": { "query": "meeting" },
                    "display": { "showRuler": false }
                }
            })
        );
    }

    #[test]
    fn changes_bubble_to_the_root() {
        let store = SettingsStore::new(json!(null));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.on_change(move |path| sink.borrow_mut().push(path.to_owned()));

        assert!(!store.is_dirty());
        store.namespace("settings").namespace("groups").set("groups", json!([]));
        store.set("scale", 2.0);
        assert!(store.take_dirty());
        assert!(!store.take_dirty());
        assert_eq!(*seen.borrow(), vec!["settings.groups".to_owned(), String::new()]);

        assert!(store.remove("scale"));
        assert!(!store.remove("scale"));
        assert!(store.take_dirty());
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn writes_replace_non_object_parents() {
        let store = SettingsStore::new(json!({ "settings": 5 }));
        store.namespace("settings").set("mode", "view");
        assert_eq!(store.snapshot(), json!({ "settings": { "mode": "view" } }));
    }
}
