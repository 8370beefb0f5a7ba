//! Entry points and seeds.
//!
//! An [`EntryPoint`] is a privileged method reachable through an exposed
//! interface stub, together with the permissions its access-control checks
//! enforce. A [`Seed`] is a program location where a filesystem path is
//! consumed; resolving all seeds of an entry point yields the paths the entry
//! point may touch on behalf of its caller.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::part::{MethodId, PlaceholderKey};

/// A privileged entry point.
///
/// Equality, ordering and hashing only consider `(stub, implementation)`; the
/// permission set and the reachability flag are attributes of the entry point,
/// not part of its identity.
///
/// # Examples
///
/// ```rust,ignore
/// use pathscope::entrypoint::EntryPoint;
///
/// let ep = EntryPoint::new("<S: void write(java.lang.String)>", "IStorage$Stub")
///     .with_permission("android.permission.WRITE_SETTINGS");
/// assert_eq!(ep.to_string(), "{IStorage$Stub : <S: void write(java.lang.String)>}");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    /// The method implementing the entry point.
    pub implementation: MethodId,
    /// The interface stub that exposes it.
    pub stub: String,
    /// Permissions enforced before the entry point does its work.
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Whether callers without any special privilege can reach it.
    #[serde(default)]
    pub third_party_callable: bool,
}

impl EntryPoint {
    /// Creates an entry point enforcing no permissions.
    pub fn new(implementation: impl Into<MethodId>, stub: impl Into<String>) -> Self {
        EntryPoint {
            implementation: implementation.into(),
            stub: stub.into(),
            permissions: BTreeSet::new(),
            third_party_callable: false,
        }
    }

    /// Adds an enforced permission.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Marks the entry point as reachable by third-party callers.
    #[must_use]
    pub fn third_party(mut self) -> Self {
        self.third_party_callable = true;
        self
    }

    fn identity(&self) -> (&str, &MethodId) {
        (&self.stub, &self.implementation)
    }
}

impl PartialEq for EntryPoint {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for EntryPoint {}

impl PartialOrd for EntryPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl Hash for EntryPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} : {}}}", self.stub, self.implementation)
    }
}

/// A location where a path value is consumed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seed {
    /// The placeholder whose value is the consumed path.
    pub key: PlaceholderKey,
    /// `true` when the consumer lists the children of a directory; the
    /// resolved value is then extended with `/` and a child wildcard.
    #[serde(default)]
    pub lists_children: bool,
}

impl Seed {
    /// Creates a seed for a plain path consumer.
    #[must_use]
    pub fn new(key: PlaceholderKey) -> Self {
        Seed {
            key,
            lists_children: false,
        }
    }

    /// Creates a seed for a directory listing consumer.
    #[must_use]
    pub fn listing(key: PlaceholderKey) -> Self {
        Seed {
            key,
            lists_children: true,
        }
    }

    /// Returns the method containing the seed's call site.
    #[must_use]
    pub fn source_method(&self) -> &MethodId {
        self.key.source_method()
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lists_children {
            write!(f, "LIST[{}]", self.key)
        } else {
            write!(f, "{}", self.key)
        }
    }
}

/// An entry point together with the seeds reachable from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPointSeeds {
    /// The entry point.
    pub entry_point: EntryPoint,
    /// Its seeds.
    pub seeds: Vec<Seed>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::part::CallSite;

    #[test]
    fn test_identity_ignores_permissions() {
        let a = EntryPoint::new("<S: void f()>", "IFoo$Stub").with_permission("A");
        let b = EntryPoint::new("<S: void f()>", "IFoo$Stub").third_party();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering_by_stub_first() {
        let a = EntryPoint::new("<Z: void f()>", "A$Stub");
        let b = EntryPoint::new("<A: void f()>", "B$Stub");
        assert!(a < b);
    }

    #[test]
    fn test_display() {
        let ep = EntryPoint::new("<S: void f()>", "IFoo$Stub");
        assert_eq!(ep.to_string(), "{IFoo$Stub : <S: void f()>}");
    }

    #[test]
    fn test_seed_source_method() {
        let seed = Seed::listing(PlaceholderKey::Argument {
            site: CallSite::new("<S: void g()>", 3),
            index: 0,
        });
        assert_eq!(seed.source_method().as_str(), "<S: void g()>");
        assert!(seed.to_string().starts_with("LIST["));
    }
}
