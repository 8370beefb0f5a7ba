//! An in-memory ownership database.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    ownership::{FileEntry, Owner, OwnershipDatabase},
    Result,
};

/// Serialized filesystem image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipSnapshot {
    /// All entries.
    pub entries: Vec<FileEntry>,
    /// All owners with their granting permissions.
    pub owners: Vec<Owner>,
}

/// An indexed [`OwnershipSnapshot`].
///
/// Ownership of an entry is taken from the owners' file lists. An entry that
/// no owner lists falls back to the owners named by its user and group.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOwnership {
    entries: Vec<FileEntry>,
    owners: Vec<Owner>,
    by_path: FxHashMap<String, Vec<usize>>,
    by_name: FxHashMap<(String, bool), usize>,
}

impl SnapshotOwnership {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: OwnershipSnapshot) -> Self {
        let mut db = SnapshotOwnership::new();
        for entry in snapshot.entries {
            db.add_entry(entry);
        }
        for owner in snapshot.owners {
            db.add_owner(owner);
        }
        db
    }

    /// Reads a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the document is invalid.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot: OwnershipSnapshot = serde_json::from_reader(reader)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Reads a JSON snapshot from a file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::Serialization`] if it is not a valid snapshot.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Adds a filesystem entry.
    pub fn add_entry(&mut self, entry: FileEntry) {
        self.entries.push(entry);
    }

    /// Adds an owner and indexes its files.
    pub fn add_owner(&mut self, owner: Owner) {
        let index = self.owners.len();
        for path in &owner.files {
            self.by_path.entry(path.clone()).or_default().push(index);
        }
        self.by_name
            .entry((owner.name.clone(), owner.is_group))
            .or_insert(index);
        self.owners.push(owner);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the database has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OwnershipDatabase for SnapshotOwnership {
    fn all_file_entries(&self) -> Vec<FileEntry> {
        self.entries.clone()
    }

    fn owners_of(&self, entry: &FileEntry) -> Vec<&Owner> {
        if let Some(indices) = self.by_path.get(&entry.path) {
            return indices.iter().map(|i| &self.owners[*i]).collect();
        }
        [(entry.user.clone(), false), (entry.group.clone(), true)]
            .iter()
            .filter_map(|key| self.by_name.get(key))
            .map(|i| &self.owners[*i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owners_from_file_lists() {
        let mut db = SnapshotOwnership::new();
        db.add_entry(FileEntry::new("/data/system/x", "system", "g"));
        db.add_owner(
            Owner::new("g", true)
                .with_permission("A")
                .with_file("/data/system/x"),
        );
        db.add_owner(Owner::new("system", false).with_permission("S"));

        let entry = &db.all_file_entries()[0];
        let owners = db.owners_of(entry);
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].name, "g");
    }

    #[test]
    fn test_owners_fallback_by_name() {
        let mut db = SnapshotOwnership::new();
        db.add_entry(FileEntry::new("/data/misc/y", "media", "audio"));
        db.add_owner(Owner::new("media", false).with_permission("M"));
        db.add_owner(Owner::new("audio", true).with_permission("R"));
        db.add_owner(Owner::new("audio", false).with_permission("X"));

        let entry = &db.all_file_entries()[0];
        let names: Vec<_> = db
            .owners_of(entry)
            .iter()
            .map(|o| (o.name.as_str(), o.is_group))
            .collect();
        assert_eq!(names, vec![("media", false), ("audio", true)]);
    }

    #[test]
    fn test_from_reader() {
        let json = r#"{
            "entries": [{"path": "/data/system/x", "user": "u", "group": "g", "mode": "0600"}],
            "owners": [{"name": "u", "permissions": ["P"], "files": ["/data/system/x"]}]
        }"#;
        let db = SnapshotOwnership::from_reader(json.as_bytes()).unwrap();
        assert_eq!(db.len(), 1);
        let entry = &db.all_file_entries()[0];
        assert!(db.owners_of(entry)[0].permissions.contains("P"));
    }
}
