//! Detection of permission redelegation.
//!
//! An entry point redelegates a permission when it touches a file whose owners
//! are granted permissions the entry point never checks for. The caller then
//! acts on the file with privileges it does not hold: a confused deputy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{entrypoint::EntryPoint, ownership::FileEntry};

/// The classification of one (entry point, file) pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// A candidate confused deputy.
    Redelegation,
    /// The entry point enforces everything the file requires.
    NoRedelegation,
}

/// Returns the permissions granted by the file's owners that `entry_point`
/// does not enforce.
#[must_use]
pub fn missing_permissions(entry_point: &EntryPoint, granted: &BTreeSet<String>) -> BTreeSet<String> {
    granted
        .difference(&entry_point.permissions)
        .cloned()
        .collect()
}

/// Classifies (entry point, file) pairs.
#[derive(Debug, Clone)]
pub struct RedelegationAnalyzer {
    privileged_principals: BTreeSet<String>,
}

impl RedelegationAnalyzer {
    /// Creates an analyzer treating files owned by `privileged_principals` as
    /// privileged.
    #[must_use]
    pub fn new(privileged_principals: BTreeSet<String>) -> Self {
        RedelegationAnalyzer {
            privileged_principals,
        }
    }

    /// Classifies one pair.
    ///
    /// # Arguments
    ///
    /// * `entry_point` - The entry point touching the file.
    /// * `file` - The matched file.
    /// * `missing` - The result of [`missing_permissions`] for the pair.
    #[must_use]
    pub fn classify(&self, entry_point: &EntryPoint, file: &FileEntry, missing: &BTreeSet<String>) -> Verdict {
        let privileged_reach =
            entry_point.third_party_callable && file.owned_by_any(&self.privileged_principals);
        if !missing.is_empty() || privileged_reach {
            Verdict::Redelegation
        } else {
            Verdict::NoRedelegation
        }
    }
}
