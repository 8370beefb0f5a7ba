//! Tagged wildcards.
//!
//! A wildcard stands for "some value we chose not to (or could not) compute",
//! tagged with the category of value it abstracts and, when known, the program
//! location it came from. The category drives both the simple rendering used in
//! dumps and the regex fragment used for matching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::part::placeholder::{CallSite, MethodId};

/// Regex fragment for wildcards that can be any string.
pub const ANY_REGEX: &str = ".*";

/// Regex fragment for wildcards that are always a decimal number.
pub const NUMBER_REGEX: &str = r"\d+";

/// The category of value a wildcard abstracts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AnyKind {
    /// An element read from an array or collection.
    Array,
    /// A field read with no resolvable writes.
    FieldRef(String),
    /// The return value of a method without a body.
    MethodReturn(MethodId),
    /// An invocation with no resolvable callee.
    MethodRef,
    /// An object created through an unmodelled constructor.
    NewInvoke,
    /// An argument of the entry point itself, i.e. caller controlled.
    EntryPointArg(u32),
    /// An unknown parent directory.
    ParentPath,
    /// An unknown child entry of a listed directory.
    ChildPath,
    /// A number of the given primitive type.
    Number(String),
    /// A resource or asset name.
    ResourceOrAsset,
    /// Input from a command line.
    CommandLineInput,
    /// A runtime or VM setting.
    RuntimeSetting,
    /// An account identifier.
    AccountId,
    /// A user identifier.
    UserId,
    /// A kernel uid.
    Uid,
    /// Package or application metadata.
    PackageInfo,
    /// Named contextual information, e.g. `PACKAGENAME` or `ENVVAR`.
    Info(String),
}

impl AnyKind {
    /// Returns the tag shown in simple renderings.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            AnyKind::Array => "ARRAY",
            AnyKind::FieldRef(_) => "FIELDREF",
            AnyKind::MethodReturn(_) => "METHODRETURN",
            AnyKind::MethodRef => "METHODREF",
            AnyKind::NewInvoke => "NEWINVOKE",
            AnyKind::EntryPointArg(_) => "EPARG",
            AnyKind::ParentPath => "PARENTPATH",
            AnyKind::ChildPath => "CHILDPATH",
            AnyKind::Number(ty) => ty,
            AnyKind::ResourceOrAsset => "RESOURCEORASSET",
            AnyKind::CommandLineInput => "COMMANDLINEINPUT",
            AnyKind::RuntimeSetting => "VMRUNTIMESETTING",
            AnyKind::AccountId => "ACCOUNTID",
            AnyKind::UserId => "USERID",
            AnyKind::Uid => "UID",
            AnyKind::PackageInfo => "APKINFO",
            AnyKind::Info(name) => name,
        }
    }

    /// Returns `true` if the wildcard only ever stands for a decimal number.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AnyKind::Number(_) | AnyKind::UserId | AnyKind::Uid | AnyKind::AccountId
        )
    }

    /// Returns the regex fragment for this category.
    #[must_use]
    pub fn regex(&self) -> &'static str {
        if self.is_numeric() {
            NUMBER_REGEX
        } else {
            ANY_REGEX
        }
    }

    /// Returns the optional payload of the category, used in full renderings.
    fn detail(&self) -> Option<String> {
        match self {
            AnyKind::FieldRef(field) => Some(field.clone()),
            AnyKind::MethodReturn(method) => Some(method.to_string()),
            AnyKind::EntryPointArg(index) => Some(index.to_string()),
            _ => None,
        }
    }
}

/// A wildcard leaf with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wildcard {
    /// The abstracted value category.
    pub kind: AnyKind,
    /// The statement that produced the wildcard, when known.
    pub origin: Option<CallSite>,
}

impl Wildcard {
    /// Creates a wildcard without provenance.
    #[must_use]
    pub fn new(kind: AnyKind) -> Self {
        Wildcard { kind, origin: None }
    }

    /// Creates a wildcard produced at `origin`.
    #[must_use]
    pub fn at(kind: AnyKind, origin: CallSite) -> Self {
        Wildcard {
            kind,
            origin: Some(origin),
        }
    }

    /// Returns the simple rendering, e.g. `` `ANY[ARRAY]` `` or `` `NUM[INT]` ``.
    #[must_use]
    pub fn simple(&self) -> String {
        match &self.kind {
            AnyKind::Number(ty) => format!("`NUM[{ty}]`"),
            AnyKind::Info(name) => format!("`INFO[{name}]`"),
            kind => format!("`ANY[{}]`", kind.tag()),
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            AnyKind::Number(_) => "NUM",
            AnyKind::Info(_) => "INFO",
            _ => "ANY",
        };
        write!(f, "`{prefix}[TYPE={}", self.kind.tag())?;
        if let Some(detail) = self.kind.detail() {
            write!(f, ", DATA={detail}")?;
        }
        if let Some(origin) = &self.origin {
            write!(f, ", SOURCE={origin}")?;
        }
        f.write_str("]`")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_regex() {
        assert_eq!(AnyKind::UserId.regex(), r"\d+");
        assert_eq!(AnyKind::Uid.regex(), r"\d+");
        assert_eq!(AnyKind::AccountId.regex(), r"\d+");
        assert_eq!(AnyKind::Number("INT".into()).regex(), r"\d+");
        assert_eq!(AnyKind::Array.regex(), ".*");
        assert_eq!(AnyKind::Info("PACKAGENAME".into()).regex(), ".*");
    }

    #[test]
    fn test_simple_rendering() {
        assert_eq!(Wildcard::new(AnyKind::Array).simple(), "`ANY[ARRAY]`");
        assert_eq!(
            Wildcard::new(AnyKind::Number("LONG".into())).simple(),
            "`NUM[LONG]`"
        );
        assert_eq!(
            Wildcard::new(AnyKind::Info("ENVVAR".into())).simple(),
            "`INFO[ENVVAR]`"
        );
    }

    #[test]
    fn test_full_rendering_includes_provenance() {
        let w = Wildcard::at(
            AnyKind::FieldRef("<A: java.lang.String f>".into()),
            CallSite::new("<A: void m()>", 2),
        );
        assert_eq!(
            w.to_string(),
            "`ANY[TYPE=FIELDREF, DATA=<A: java.lang.String f>, SOURCE=<A: void m()>@2]`"
        );
    }
}
