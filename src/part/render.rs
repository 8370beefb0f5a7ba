//! Textual renderings of part trees.
//!
//! Three renderings exist for every tree:
//!
//! - **full** ([`PartArena::display`]): includes provenance of wildcards and the
//!   keys of placeholders. Used for the "Expressions" column of dumps and for
//!   bucketing during deduplication.
//! - **simple** ([`PartArena::simple`]): one short tag per leaf, e.g.
//!   `` {/data/ + `ANY[ARRAY]`} ``. Used in human-readable dumps.
//! - **regex** ([`PartArena::regex`]): the pattern the matcher compiles.
//!
//! | Part | simple | regex |
//! |------|--------|-------|
//! | string constant | value | escaped value |
//! | null constant | `null` | `null` |
//! | unrecognized constant | `` `CONST[value]` `` | `.*` |
//! | numeric wildcard | `` `NUM[ty]` `` / `` `ANY[UID]` `` | `\d+` |
//! | other wildcard | `` `ANY[TAG]` `` | `.*` |
//! | collapsed wildcards | `` `ANY[COMBO]` `` | `.*` |
//! | unknown | `` `UNKNOWN[VALUE]` `` | `.*` |
//! | placeholder | `` `PH[ARG]` `` | `.*` |
//! | append | `{a + b}` | concatenation, loops skipped |
//! | or | `(a \| b)`, sorted | `(?:a\|b)`, sorted, loops skipped |
//! | loop | `` `LOOP[id]` `` | unsupported |
//! | normalize | `NORM[..]` | child regex |
//! | other wrappers | `PARENT[..]`, `NAME[..]`, ... | `.*` |
//!
//! Rendering recurses through the tree. It never follows loop starts, so it
//! always terminates.

use std::collections::BTreeSet;

use crate::{
    part::{PartArena, PartId},
    part::{Constant, ConstantKind, Part, WrapKind, ANY_REGEX, SEPARATOR},
    Error, Result,
};

const APPEND_DIV: &str = " + ";
const OR_DIV: &str = " | ";

impl PartArena {
    /// Returns the full rendering of the tree rooted at `id`.
    #[must_use]
    pub fn display(&self, id: PartId) -> String {
        let mut out = String::new();
        self.write_display(id, &mut out);
        out
    }

    /// Returns the simple rendering of the tree rooted at `id`.
    #[must_use]
    pub fn simple(&self, id: PartId) -> String {
        let mut out = String::new();
        self.write_simple(id, &mut out);
        out
    }

    /// Returns the regex fragment for the tree rooted at `id`.
    ///
    /// The fragment is not anchored; the matcher anchors it to the full path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if `id` itself is a loop. Loops nested in
    /// a concatenation or union are skipped instead.
    pub fn regex(&self, id: PartId) -> Result<String> {
        match self.get(id) {
            Part::Constant(c) => Ok(constant_regex(c)),
            Part::Any(w) => Ok(w.kind.regex().to_string()),
            Part::AnyCombo(_) | Part::Unknown(_) | Part::Placeholder(_) => {
                Ok(ANY_REGEX.to_string())
            }
            Part::Append(children) => {
                let mut out = String::new();
                for child in children {
                    if self.is_loop(*child) {
                        continue;
                    }
                    out.push_str(&self.regex(*child)?);
                }
                Ok(out)
            }
            Part::Or(children) => {
                let mut alternatives = BTreeSet::new();
                for child in children {
                    if self.is_loop(*child) {
                        continue;
                    }
                    alternatives.insert(self.regex(*child)?);
                }
                Ok(match alternatives.len() {
                    0 => String::new(),
                    1 => alternatives.into_iter().next().unwrap_or_default(),
                    _ => format!(
                        "(?:{})",
                        alternatives.into_iter().collect::<Vec<_>>().join("|")
                    ),
                })
            }
            Part::Loop { id: loop_id, .. } => Err(Error::Unsupported(format!(
                "loop {loop_id} has no regex form"
            ))),
            Part::Wrap(WrapKind::Normalize, child) => {
                if self.is_loop(*child) {
                    Ok(String::new())
                } else {
                    self.regex(*child)
                }
            }
            Part::Wrap(..) => Ok(ANY_REGEX.to_string()),
        }
    }

    fn is_loop(&self, id: PartId) -> bool {
        matches!(self.get(id), Part::Loop { .. })
    }

    fn write_display(&self, id: PartId, out: &mut String) {
        match self.get(id) {
            Part::Constant(c) => match c.kind {
                ConstantKind::Unrecognized => {
                    push_framed(out, &format!("CONST[TYPE=UNRECOGNIZED, VALUE={}]", c.value));
                }
                _ => out.push_str(c.text()),
            },
            Part::Any(w) => out.push_str(&w.to_string()),
            Part::AnyCombo(contents) => {
                let inner: Vec<String> = contents.iter().map(|c| self.display(*c)).collect();
                push_framed(out, &format!("ANY[TYPE=COMBO, CONTENTS=[{}]]", inner.join(", ")));
            }
            Part::Unknown(u) => {
                push_framed(
                    out,
                    &format!("UNKNOWN[TYPE={}, DATA={}]", u.tag(), u.description()),
                );
            }
            Part::Placeholder(key) => out.push_str(&key.to_string()),
            Part::Append(children) => {
                out.push('{');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(APPEND_DIV);
                    }
                    self.write_display(*child, out);
                }
                out.push('}');
            }
            Part::Or(children) => {
                let alternatives: BTreeSet<String> =
                    children.iter().map(|c| self.display(*c)).collect();
                push_or(out, alternatives);
            }
            Part::Loop { id: loop_id, .. } => push_framed(out, &format!("LOOP[ID={loop_id}]")),
            Part::Wrap(kind, child) => {
                out.push_str(&kind.to_string());
                out.push('[');
                self.write_display(*child, out);
                out.push(']');
            }
        }
    }

    fn write_simple(&self, id: PartId, out: &mut String) {
        match self.get(id) {
            Part::Constant(c) => match c.kind {
                ConstantKind::Unrecognized => push_framed(out, &format!("CONST[{}]", c.value)),
                _ => out.push_str(c.text()),
            },
            Part::Any(w) => out.push_str(&w.simple()),
            Part::AnyCombo(_) => push_framed(out, "ANY[COMBO]"),
            Part::Unknown(u) => push_framed(out, &format!("UNKNOWN[{}]", u.tag())),
            Part::Placeholder(key) => push_framed(out, &format!("PH[{}]", key.tag())),
            Part::Append(children) => {
                out.push('{');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(APPEND_DIV);
                    }
                    self.write_simple(*child, out);
                }
                out.push('}');
            }
            Part::Or(children) => {
                let alternatives: BTreeSet<String> =
                    children.iter().map(|c| self.simple(*c)).collect();
                push_or(out, alternatives);
            }
            Part::Loop { id: loop_id, .. } => push_framed(out, &format!("LOOP[{loop_id}]")),
            Part::Wrap(kind, child) => {
                out.push_str(&kind.to_string());
                out.push('[');
                self.write_simple(*child, out);
                out.push(']');
            }
        }
    }
}

fn constant_regex(constant: &Constant) -> String {
    match constant.kind {
        ConstantKind::Unrecognized => ANY_REGEX.to_string(),
        _ => regex::escape(constant.text()),
    }
}

fn push_framed(out: &mut String, body: &str) {
    out.push(SEPARATOR);
    out.push_str(body);
    out.push(SEPARATOR);
}

fn push_or(out: &mut String, alternatives: BTreeSet<String>) {
    out.push('(');
    for (i, alt) in alternatives.iter().enumerate() {
        if i > 0 {
            out.push_str(OR_DIV);
        }
        out.push_str(alt);
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use crate::part::{AnyKind, CallSite, PartArena, PlaceholderKey, Unknown, Wildcard, WrapKind};
    use crate::Error;

    #[test]
    fn test_simple_rendering() {
        let mut arena = PartArena::new();
        let data = arena.string("/data/");
        let any = arena.any(Wildcard::new(AnyKind::Array));
        let app = arena.append(vec![data, any]);
        let sys = arena.string("/system");
        let root = arena.or(vec![app, sys]);
        assert_eq!(arena.simple(root), "(/system | {/data/ + `ANY[ARRAY]`})");
    }

    #[test]
    fn test_wrapper_rendering() {
        let mut arena = PartArena::new();
        let name = arena.string("ANDROID_DATA");
        let env = arena.wrap(WrapKind::EnvVar, name);
        let norm = arena.wrap(WrapKind::Normalize, env);
        assert_eq!(arena.simple(norm), "NORM[ENVVAR[ANDROID_DATA]]");
        assert_eq!(arena.regex(norm).unwrap(), ".*");
    }

    #[test]
    fn test_regex_escapes_constants() {
        let mut arena = PartArena::new();
        let a = arena.string("/data/app.db");
        let uid = arena.any(Wildcard::new(AnyKind::UserId));
        let root = arena.append(vec![a, uid]);
        assert_eq!(arena.regex(root).unwrap(), r"/data/app\.db\d+");
    }

    #[test]
    fn test_regex_or_sorted_and_bare_singleton() {
        let mut arena = PartArena::new();
        let b = arena.string("/b");
        let a = arena.string("/a");
        let or = arena.or(vec![b, a]);
        assert_eq!(arena.regex(or).unwrap(), "(?:/a|/b)");

        let lone = arena.string("/c");
        let start = arena.string("/d");
        let lp = arena.new_loop(start);
        let single = arena.or(vec![lone, lp]);
        assert_eq!(arena.regex(single).unwrap(), "/c");
    }

    #[test]
    fn test_regex_loop_unsupported() {
        let mut arena = PartArena::new();
        let s = arena.string("/x");
        let lp = arena.new_loop(s);
        assert!(matches!(arena.regex(lp), Err(Error::Unsupported(_))));

        let root = arena.append(vec![s, lp]);
        assert_eq!(arena.regex(root).unwrap(), "/x");
        assert_eq!(arena.simple(root), "{/x + `LOOP[0]`}");
    }

    #[test]
    fn test_opaque_leaves() {
        let mut arena = PartArena::new();
        let ph = arena.placeholder(PlaceholderKey::Return {
            method: "<A: java.lang.String f()>".into(),
        });
        let unk = arena.unknown(Unknown::Value("$r1 instanceof X".into()));
        let null = arena.null();
        let root = arena.append(vec![ph, unk, null]);
        assert_eq!(arena.simple(root), "{`PH[RETURN]` + `UNKNOWN[VALUE]` + null}");
        assert_eq!(arena.regex(root).unwrap(), ".*.*null");
    }

    #[test]
    fn test_full_rendering_shows_provenance() {
        let mut arena = PartArena::new();
        let any = arena.any(Wildcard::at(AnyKind::Array, CallSite::new("m", 1)));
        assert_eq!(arena.display(any), "`ANY[TYPE=ARRAY, SOURCE=m@1]`");
    }
}
