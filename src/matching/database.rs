//! The match database.
//!
//! For every entry point the database keeps one map per [`Bucket`], keyed by
//! pattern. Each [`PatternMatches`] records the seed expressions that
//! synthesized the pattern and the files it matched, with the permissions the
//! files' owners are granted and the ones the entry point does not enforce.
//!
//! The database is persisted as pretty-printed JSON.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Write as _},
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{entrypoint::EntryPoint, entrypoint::Seed, ownership::FileEntry, Result};

/// Where a pattern ended up after matching.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Matched files the entry point does not fully protect.
    Redelegation,
    /// Matched files the entry point protects.
    NoRedelegation,
    /// Patterns that matched no file.
    NoMatch,
    /// Patterns that would match anything.
    MatchAll,
}

/// One seed's contribution to a pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeedExpression {
    /// The seed.
    pub seed: Seed,
    /// The simple rendering of the rewritten alternative.
    pub simple: String,
    /// The full rendering of the resolved value before rewriting.
    pub original: String,
    /// Full renderings of the opaque leaves of the resolved value.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub leaves: BTreeSet<String>,
}

impl SeedExpression {
    /// Writes the expression as an indented block.
    pub fn write_text(&self, out: &mut String, indent: &str) -> fmt::Result {
        writeln!(out, "{indent}SimpleMatchPath: {}", self.simple)?;
        writeln!(out, "{indent}  OriginalMatchPath: {}", self.original)?;
        writeln!(out, "{indent}  Seed: {}", self.seed)
    }
}

/// A file matched by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    /// The matched entry.
    pub entry: FileEntry,
    /// Permissions granted to the entry's owners.
    pub granted: BTreeSet<String>,
    /// Granted permissions the entry point does not enforce.
    pub missing: BTreeSet<String>,
}

impl FileMatch {
    /// Writes the file as an indented block.
    pub fn write_text(&self, out: &mut String, indent: &str) -> fmt::Result {
        writeln!(
            out,
            "{indent}{} - User: {} - Group: {}",
            self.entry.path, self.entry.user, self.entry.group
        )?;
        writeln!(out, "{indent}  Missing Permissions: {}", list(&self.missing))?;
        writeln!(out, "{indent}  UID/GID Permissions: {}", list(&self.granted))
    }
}

impl fmt::Display for FileMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entry.path)
    }
}

/// A pattern, where it came from and what it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatches {
    /// The regex, unanchored.
    pub pattern: String,
    /// The seed expressions synthesizing the pattern.
    pub expressions: BTreeSet<SeedExpression>,
    /// Matched files, keyed by path.
    #[serde(default)]
    pub files: BTreeMap<String, FileMatch>,
}

impl PatternMatches {
    /// Creates an empty record for `pattern`.
    pub fn new(pattern: impl Into<String>) -> Self {
        PatternMatches {
            pattern: pattern.into(),
            expressions: BTreeSet::new(),
            files: BTreeMap::new(),
        }
    }

    /// Merges `other` into this record.
    pub fn merge(&mut self, other: PatternMatches) {
        self.expressions.extend(other.expressions);
        self.files.extend(other.files);
    }

    /// Writes the record as an indented block.
    pub fn write_text(&self, out: &mut String, indent: &str) -> fmt::Result {
        writeln!(out, "{indent}{}", self.pattern)?;
        writeln!(out, "{indent}  Files: ")?;
        for file in self.files.values() {
            file.write_text(out, &format!("{indent}    "))?;
        }
        writeln!(out, "{indent}  Intermediate Expressions: ")?;
        for expression in &self.expressions {
            expression.write_text(out, &format!("{indent}    "))?;
        }
        Ok(())
    }
}

impl fmt::Display for PatternMatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_text(&mut out, "")?;
        f.write_str(&out)
    }
}

/// Everything matched for one entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointMatches {
    /// The entry point.
    pub entry_point: EntryPoint,
    /// Patterns per bucket.
    #[serde(default)]
    pub buckets: BTreeMap<Bucket, BTreeMap<String, PatternMatches>>,
    /// Seeds excluded by configuration, with their resolved values.
    #[serde(default)]
    pub removed: BTreeSet<SeedExpression>,
}

impl EntryPointMatches {
    /// Creates an empty record.
    #[must_use]
    pub fn new(entry_point: EntryPoint) -> Self {
        EntryPointMatches {
            entry_point,
            buckets: BTreeMap::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Returns the patterns of `bucket`.
    pub fn patterns(&self, bucket: Bucket) -> impl Iterator<Item = &PatternMatches> {
        self.buckets.get(&bucket).into_iter().flat_map(BTreeMap::values)
    }

    /// Returns the record of `pattern` in `bucket`.
    #[must_use]
    pub fn pattern(&self, bucket: Bucket, pattern: &str) -> Option<&PatternMatches> {
        self.buckets.get(&bucket).and_then(|b| b.get(pattern))
    }

    fn pattern_mut(&mut self, bucket: Bucket, pattern: &str) -> &mut PatternMatches {
        self.buckets
            .entry(bucket)
            .or_default()
            .entry(pattern.to_string())
            .or_insert_with(|| PatternMatches::new(pattern))
    }
}

/// Serialized form of [`MatchesDatabase`].
#[derive(Serialize, Deserialize)]
struct DatabaseDocument {
    entry_points: Vec<EntryPointMatches>,
}

/// The match results of a run, keyed by entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchesDatabase {
    entries: BTreeMap<EntryPoint, EntryPointMatches>,
}

impl MatchesDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entry points with results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the records in entry point order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryPointMatches> {
        self.entries.values()
    }

    /// Returns the record of `entry_point`.
    #[must_use]
    pub fn get(&self, entry_point: &EntryPoint) -> Option<&EntryPointMatches> {
        self.entries.get(entry_point)
    }

    /// Returns the record of `entry_point`, creating it if needed.
    pub fn entry(&mut self, entry_point: &EntryPoint) -> &mut EntryPointMatches {
        self.entries
            .entry(entry_point.clone())
            .or_insert_with(|| EntryPointMatches::new(entry_point.clone()))
    }

    /// Records that `expression` synthesized `pattern` in `bucket`.
    pub fn add_expression(
        &mut self,
        entry_point: &EntryPoint,
        bucket: Bucket,
        pattern: &str,
        expression: SeedExpression,
    ) {
        self.entry(entry_point)
            .pattern_mut(bucket, pattern)
            .expressions
            .insert(expression);
    }

    /// Records a file matched by `pattern` in `bucket`.
    pub fn add_file(&mut self, entry_point: &EntryPoint, bucket: Bucket, pattern: &str, file: FileMatch) {
        self.entry(entry_point)
            .pattern_mut(bucket, pattern)
            .files
            .insert(file.entry.path.clone(), file);
    }

    /// Records a seed excluded by configuration.
    pub fn add_removed(&mut self, entry_point: &EntryPoint, expression: SeedExpression) {
        self.entry(entry_point).removed.insert(expression);
    }

    /// Merges `other` into this database.
    pub fn merge(&mut self, other: MatchesDatabase) {
        for (entry_point, record) in other.entries {
            let target = self.entry(&entry_point);
            target.removed.extend(record.removed);
            for (bucket, patterns) in record.buckets {
                let target_bucket = target.buckets.entry(bucket).or_default();
                for (pattern, matches) in patterns {
                    match target_bucket.get_mut(&pattern) {
                        Some(existing) => existing.merge(matches),
                        None => {
                            target_bucket.insert(pattern, matches);
                        }
                    }
                }
            }
        }
    }

    /// Returns the distinct patterns recorded in `bucket`.
    #[must_use]
    pub fn unique_patterns(&self, bucket: Bucket) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|record| record.patterns(bucket))
            .map(|p| p.pattern.as_str())
            .collect()
    }

    /// Returns the distinct seed expressions recorded in `bucket`.
    #[must_use]
    pub fn unique_expressions(&self, bucket: Bucket) -> BTreeSet<&SeedExpression> {
        self.iter()
            .flat_map(|record| record.patterns(bucket))
            .flat_map(|p| p.expressions.iter())
            .collect()
    }

    /// Returns the distinct matched paths recorded in `bucket`.
    #[must_use]
    pub fn unique_files(&self, bucket: Bucket) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|record| record.patterns(bucket))
            .flat_map(|p| p.files.keys())
            .map(String::as_str)
            .collect()
    }

    /// Returns `(bucket, patterns, files)` counts for every bucket.
    #[must_use]
    pub fn summary(&self) -> Vec<(Bucket, usize, usize)> {
        Bucket::iter()
            .map(|b| (b, self.unique_patterns(b).len(), self.unique_files(b).len()))
            .collect()
    }

    /// Writes the database as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] or [`crate::Error::FileError`]
    /// if writing fails.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let document = DatabaseDocument {
            entry_points: self.entries.values().cloned().collect(),
        };
        serde_json::to_writer_pretty(writer, &document)?;
        Ok(())
    }

    /// Reads a database written by [`MatchesDatabase::to_writer`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the document is invalid.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: DatabaseDocument = serde_json::from_reader(reader)?;
        let mut db = MatchesDatabase::new();
        for record in document.entry_points {
            db.entries.insert(record.entry_point.clone(), record);
        }
        Ok(db)
    }

    /// Writes the database to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be created.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads the database from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened and
    /// [`crate::Error::Serialization`] if it is not a valid database.
    pub fn read_json(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

/// Renders a set as `[a, b]`.
pub(crate) fn list(values: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = values.iter().map(String::as_str).collect();
    format!("[{}]", joined.join(", "))
}
