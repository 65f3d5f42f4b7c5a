mod frontmatter;
mod note;
mod property;
mod repository;
mod select;
mod vault;
mod watch;

pub use note::{Note, NoteDraft, NoteId, PropertyChanges};
pub use property::{CREATED, NoteProperty, PropertyKind};
pub use repository::{MutableNoteRepository, NotePropertyRepository, NoteRepository};
pub use select::{ValueSelector, sort_by_selected_value};
pub use vault::{Vault, VaultChanges, VaultSnapshot};
pub use watch::VaultWatcher;

#[cfg(test)]
pub(crate) use note::test_note;
