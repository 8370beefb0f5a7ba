//! The filesystem ownership database.
//!
//! The matcher tests synthesized patterns against every [`FileEntry`] of the
//! device image and collects the permissions of the [`Owner`]s of each match.
//! Ingesting a filesystem tree is outside of this crate; it only consumes an
//! [`OwnershipDatabase`]. [`SnapshotOwnership`] is an in-memory database
//! loaded from JSON.

mod snapshot;

use std::{collections::BTreeSet, fmt};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use snapshot::{OwnershipSnapshot, SnapshotOwnership};

/// The type of a filesystem entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A regular file.
    #[default]
    File,
    /// A directory.
    Directory,
    /// A symbolic link.
    Symlink,
    /// A character device.
    CharDevice,
    /// A block device.
    BlockDevice,
    /// A named pipe.
    Pipe,
    /// A unix domain socket.
    Socket,
}

bitflags! {
    /// Unix mode bits of a filesystem entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct FileMode: u32 {
        /// Readable by the owning user.
        const USER_READ = 0o400;
        /// Writable by the owning user.
        const USER_WRITE = 0o200;
        /// Executable by the owning user.
        const USER_EXEC = 0o100;
        /// Readable by the owning group.
        const GROUP_READ = 0o040;
        /// Writable by the owning group.
        const GROUP_WRITE = 0o020;
        /// Executable by the owning group.
        const GROUP_EXEC = 0o010;
        /// Readable by everyone.
        const OTHER_READ = 0o004;
        /// Writable by everyone.
        const OTHER_WRITE = 0o002;
        /// Executable by everyone.
        const OTHER_EXEC = 0o001;
        /// Set-user-id.
        const SETUID = 0o4000;
        /// Set-group-id.
        const SETGID = 0o2000;
        /// Sticky bit.
        const STICKY = 0o1000;
    }
}

impl FileMode {
    /// Parses an octal mode string such as `"0755"` or `"4750"`, ignoring
    /// unknown bits.
    #[must_use]
    pub fn from_octal(text: &str) -> Option<Self> {
        u32::from_str_radix(text.trim(), 8)
            .ok()
            .map(FileMode::from_bits_truncate)
    }

    /// Returns `true` if anyone may write the entry.
    #[must_use]
    pub fn world_writable(self) -> bool {
        self.contains(FileMode::OTHER_WRITE)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const TRIPLES: [(FileMode, FileMode, FileMode, FileMode, char); 3] = [
            (FileMode::USER_READ, FileMode::USER_WRITE, FileMode::USER_EXEC, FileMode::SETUID, 's'),
            (FileMode::GROUP_READ, FileMode::GROUP_WRITE, FileMode::GROUP_EXEC, FileMode::SETGID, 's'),
            (FileMode::OTHER_READ, FileMode::OTHER_WRITE, FileMode::OTHER_EXEC, FileMode::STICKY, 't'),
        ];
        for (read, write, exec, special, marker) in TRIPLES {
            let x = match (self.contains(exec), self.contains(special)) {
                (true, true) => marker,
                (false, true) => marker.to_ascii_uppercase(),
                (true, false) => 'x',
                (false, false) => '-',
            };
            write!(
                f,
                "{}{}{}",
                if self.contains(read) { 'r' } else { '-' },
                if self.contains(write) { 'w' } else { '-' },
                x
            )?;
        }
        Ok(())
    }
}

mod mode_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::FileMode;

    pub fn serialize<S: Serializer>(mode: &FileMode, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:04o}", mode.bits()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FileMode, D::Error> {
        let text = String::deserialize(deserializer)?;
        FileMode::from_octal(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid octal mode '{text}'")))
    }
}

/// One entry of the filesystem image.
///
/// Entries are identified by their full path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// The absolute path.
    pub path: String,
    /// The entry type.
    #[serde(default)]
    pub kind: FileKind,
    /// The owning user.
    pub user: String,
    /// The owning group.
    pub group: String,
    /// Mode bits, serialized as an octal string.
    #[serde(with = "mode_serde", default)]
    pub mode: FileMode,
    /// The target of a symbolic link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

impl FileEntry {
    /// Creates a regular file entry with mode `0660`.
    pub fn new(path: impl Into<String>, user: impl Into<String>, group: impl Into<String>) -> Self {
        FileEntry {
            path: path.into(),
            kind: FileKind::File,
            user: user.into(),
            group: group.into(),
            mode: FileMode::USER_READ
                | FileMode::USER_WRITE
                | FileMode::GROUP_READ
                | FileMode::GROUP_WRITE,
            link_target: None,
        }
    }

    /// Returns `true` if the user or group is one of `principals`.
    #[must_use]
    pub fn owned_by_any(&self, principals: &BTreeSet<String>) -> bool {
        principals.contains(&self.user) || principals.contains(&self.group)
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A user or group and the permissions that grant its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// The user or group name.
    pub name: String,
    /// `true` for groups.
    #[serde(default)]
    pub is_group: bool,
    /// Permissions whose holders run as this user or in this group.
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Paths of the entries owned by this user or group.
    #[serde(default)]
    pub files: BTreeSet<String>,
}

impl Owner {
    /// Creates an owner without permissions or files.
    pub fn new(name: impl Into<String>, is_group: bool) -> Self {
        Owner {
            name: name.into(),
            is_group,
            permissions: BTreeSet::new(),
            files: BTreeSet::new(),
        }
    }

    /// Adds a granting permission.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Adds an owned file path.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.insert(path.into());
        self
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name={}, Type={}",
            self.name,
            if self.is_group { "Group" } else { "User" }
        )
    }
}

/// Read-only access to the filesystem image.
pub trait OwnershipDatabase: Send + Sync {
    /// Returns every entry of the image.
    fn all_file_entries(&self) -> Vec<FileEntry>;

    /// Returns the users and groups owning `entry`.
    fn owners_of(&self, entry: &FileEntry) -> Vec<&Owner>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_mode_octal() {
        let mode = FileMode::from_octal("4750").unwrap();
        assert!(mode.contains(FileMode::SETUID));
        assert!(mode.contains(FileMode::USER_EXEC));
        assert!(!mode.world_writable());
        assert_eq!(mode.to_string(), "rwsr-x---");
        assert!(FileMode::from_octal("9z").is_none());
    }

    #[test]
    fn test_mode_display_sticky() {
        assert_eq!(FileMode::from_octal("1777").unwrap().to_string(), "rwxrwxrwt");
        assert_eq!(FileMode::from_octal("0644").unwrap().to_string(), "rw-r--r--");
    }

    #[test]
    fn test_file_entry_serde() {
        let json = r#"{"path": "/data/system/x", "kind": "file", "user": "system",
                       "group": "system", "mode": "0600"}"#;
        let entry: FileEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.mode, FileMode::USER_READ | FileMode::USER_WRITE);
        let back = serde_json::to_string(&entry).unwrap();
        assert!(back.contains(r#""mode":"0600""#));
    }

    #[test]
    fn test_file_kind_strings() {
        assert_eq!(FileKind::from_str("char_device").unwrap(), FileKind::CharDevice);
        assert_eq!(FileKind::Symlink.to_string(), "symlink");
    }

    #[test]
    fn test_owned_by_any() {
        let entry = FileEntry::new("/data/x", "root", "system");
        let principals: BTreeSet<String> = ["system".to_string()].into_iter().collect();
        assert!(entry.owned_by_any(&principals));
        assert!(!FileEntry::new("/data/y", "media", "media").owned_by_any(&principals));
    }
}
