//! Human-readable dumps of a run.
//!
//! [`write_database_dumps`] writes, for every [`Bucket`] of a
//! [`MatchesDatabase`], a family of text files prefixed with the bucket name:
//!
//! | File | Content |
//! |------|---------|
//! | `<bucket>_count.txt` | number of unique regexes, expressions and files |
//! | `<bucket>_{regex,ie,file}_stub_count.txt` | unique values per interface stub |
//! | `<bucket>_{regex,ie,file}_ep_count.txt` | unique values per entry point |
//! | `<bucket>_{regex,ie,file}_dump.txt` | unique values |
//! | `<bucket>_{regex,ie,file}_ep_dump.txt` | values grouped by entry point |
//! | `<bucket>_leaf_parts.txt` | opaque leaves of the originating values |
//! | `<bucket>.tsv` | one row per entry point, pattern and file |
//!
//! Seeds excluded from matching are written to `removed_ie_ep_dump.txt`.
//!
//! [`write_resolution_dumps`] writes the resolved values of a run before
//! matching.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write as _,
    fs,
    path::Path,
};

use strum::IntoEnumIterator;

use crate::{
    engine::SeedResolution,
    entrypoint::EntryPoint,
    matching::{list, Bucket, EntryPointMatches, MatchesDatabase},
    Error, Result,
};

/// Header row of the tab-separated table.
pub const TSV_HEADER: &str = "Entry Point\tStub\tRegex\tFile\tGID\tEntry Point Permissions\tGID Permissions\tMissing Permissions\tSeeds\tSimple Expressions\tExpressions";

/// The value families dumped per bucket.
#[derive(Debug, Clone, Copy)]
enum Kind {
    Regex,
    Ie,
    File,
}

impl Kind {
    const ALL: [Kind; 3] = [Kind::Regex, Kind::Ie, Kind::File];

    fn file_tag(self) -> &'static str {
        match self {
            Kind::Regex => "regex",
            Kind::Ie => "ie",
            Kind::File => "file",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Kind::Regex => "Regex",
            Kind::Ie => "IE",
            Kind::File => "File",
        }
    }
}

/// Returns the values of one kind recorded for `record` in `bucket`, keyed by
/// their identity, with the text used in per-entry-point dumps.
fn values(record: &EntryPointMatches, bucket: Bucket, kind: Kind) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for matches in record.patterns(bucket) {
        match kind {
            Kind::Regex => {
                let mut text = String::new();
                matches.write_text(&mut text, "    ").map_err(fmt_error)?;
                out.insert(matches.pattern.clone(), text);
            }
            Kind::Ie => {
                for expression in &matches.expressions {
                    let mut key = String::new();
                    expression.write_text(&mut key, "").map_err(fmt_error)?;
                    let mut text = String::new();
                    expression.write_text(&mut text, "    ").map_err(fmt_error)?;
                    out.insert(key, text);
                }
            }
            Kind::File => {
                for (path, file) in &matches.files {
                    let mut text = String::new();
                    file.write_text(&mut text, "    ").map_err(fmt_error)?;
                    out.insert(path.clone(), text);
                }
            }
        }
    }
    Ok(out)
}

fn fmt_error(e: std::fmt::Error) -> Error {
    Error::Error(format!("formatting failed: {e}"))
}

fn push_line(out: &mut String, value: &str) {
    out.push_str(value);
    if !value.ends_with('\n') {
        out.push('\n');
    }
}

/// Renders the unique value counts of `bucket`.
#[must_use]
pub fn bucket_counts(db: &MatchesDatabase, bucket: Bucket) -> String {
    format!(
        "Unique Regexes: {}\nUnique IEs: {}\nUnique Files: {}\n",
        db.unique_patterns(bucket).len(),
        db.unique_expressions(bucket).len(),
        db.unique_files(bucket).len()
    )
}

/// Renders `counts` sorted by descending count, then by name.
fn count_listing(header: &str, counts: BTreeMap<String, BTreeSet<String>>) -> String {
    let mut rows: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k, v.len())).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut out = format!("{header}\n");
    for (name, count) in rows {
        out.push_str(&format!("  {name} & {count}\n"));
    }
    out
}

fn grouped_counts<F>(db: &MatchesDatabase, bucket: Bucket, kind: Kind, group: F) -> Result<BTreeMap<String, BTreeSet<String>>>
where
    F: Fn(&EntryPoint) -> String,
{
    let mut counts: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for record in db.iter() {
        let keys = values(record, bucket, kind)?;
        if keys.is_empty() {
            continue;
        }
        counts
            .entry(group(&record.entry_point))
            .or_default()
            .extend(keys.into_keys());
    }
    Ok(counts)
}

fn unique_dump(db: &MatchesDatabase, bucket: Bucket, kind: Kind) -> Result<String> {
    let mut unique = BTreeSet::new();
    for record in db.iter() {
        unique.extend(values(record, bucket, kind)?.into_keys());
    }
    let mut out = String::new();
    for value in &unique {
        push_line(&mut out, value);
    }
    Ok(out)
}

fn entry_point_header(out: &mut String, entry_point: &EntryPoint) {
    out.push_str(&format!("EntryPoint: {entry_point}\n"));
    out.push_str(&format!(
        "  EntryPoint Permissions: {}\n",
        list(&entry_point.permissions)
    ));
}

fn entry_point_dump(db: &MatchesDatabase, bucket: Bucket, kind: Kind) -> Result<String> {
    let mut out = String::new();
    for record in db.iter() {
        let texts = values(record, bucket, kind)?;
        if texts.is_empty() {
            continue;
        }
        entry_point_header(&mut out, &record.entry_point);
        for text in texts.values() {
            out.push_str(text);
        }
    }
    Ok(out)
}

fn leaf_dump(db: &MatchesDatabase, bucket: Bucket) -> String {
    let leaves: BTreeSet<&String> = db
        .unique_expressions(bucket)
        .into_iter()
        .flat_map(|e| e.leaves.iter())
        .collect();
    let mut out = String::new();
    for leaf in leaves {
        push_line(&mut out, leaf);
    }
    out
}

fn removed_dump(db: &MatchesDatabase) -> Result<String> {
    let mut out = String::new();
    for record in db.iter().filter(|r| !r.removed.is_empty()) {
        entry_point_header(&mut out, &record.entry_point);
        for expression in &record.removed {
            expression.write_text(&mut out, "    ").map_err(fmt_error)?;
        }
    }
    Ok(out)
}

fn tsv_cell(value: String) -> Result<String> {
    ensure_malformed!(
        !value.contains('\t') && !value.contains('\n'),
        "value '{}' cannot be written to a tab-separated table",
        value.escape_debug()
    );
    Ok(value)
}

fn tsv_row(cells: Vec<String>) -> Result<String> {
    let cells = cells.into_iter().map(tsv_cell).collect::<Result<Vec<_>>>()?;
    Ok(cells.join("\t"))
}

/// Renders `bucket` as a tab-separated table.
///
/// Every (entry point, pattern, file) triple is one row; patterns without
/// files get one row with empty file columns.
///
/// # Errors
///
/// Returns [`Error::Malformed`] if a value contains a tab or a newline.
pub fn bucket_tsv(db: &MatchesDatabase, bucket: Bucket) -> Result<String> {
    let mut out = format!("{TSV_HEADER}\n");
    for record in db.iter() {
        let ep = &record.entry_point;
        for matches in record.patterns(bucket) {
            let seeds: BTreeSet<String> = matches.expressions.iter().map(|e| e.seed.to_string()).collect();
            let simple: BTreeSet<String> = matches.expressions.iter().map(|e| e.simple.clone()).collect();
            let original: BTreeSet<String> = matches.expressions.iter().map(|e| e.original.clone()).collect();
            let head = [
                ep.implementation.to_string(),
                ep.stub.clone(),
                matches.pattern.clone(),
            ];
            let tail = [list(&seeds), list(&simple), list(&original)];

            if matches.files.is_empty() {
                let mut cells = head.to_vec();
                cells.extend([String::new(), String::new(), list(&ep.permissions), String::new(), String::new()]);
                cells.extend(tail.iter().cloned());
                out.push_str(&tsv_row(cells)?);
                out.push('\n');
                continue;
            }

            for file in matches.files.values() {
                let mut cells = head.to_vec();
                cells.extend([
                    file.entry.path.clone(),
                    file.entry.group.clone(),
                    list(&ep.permissions),
                    list(&file.granted),
                    list(&file.missing),
                ]);
                cells.extend(tail.iter().cloned());
                out.push_str(&tsv_row(cells)?);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Writes every database dump into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`Error::FileError`] if a file cannot be written and
/// [`Error::Malformed`] if a value cannot be written to a table.
pub fn write_database_dumps(db: &MatchesDatabase, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    for bucket in Bucket::iter() {
        let prefix = bucket.to_string();
        fs::write(dir.join(format!("{prefix}_count.txt")), bucket_counts(db, bucket))?;

        for kind in Kind::ALL {
            let tag = kind.file_tag();
            let by_stub = grouped_counts(db, bucket, kind, |ep| ep.stub.clone())?;
            fs::write(
                dir.join(format!("{prefix}_{tag}_stub_count.txt")),
                count_listing(&format!("{} Stub Counts: ", kind.title()), by_stub),
            )?;
            let by_ep = grouped_counts(db, bucket, kind, |ep| ep.to_string())?;
            fs::write(
                dir.join(format!("{prefix}_{tag}_ep_count.txt")),
                count_listing(&format!("{} EntryPoint Counts: ", kind.title()), by_ep),
            )?;
            fs::write(
                dir.join(format!("{prefix}_{tag}_dump.txt")),
                unique_dump(db, bucket, kind)?,
            )?;
            fs::write(
                dir.join(format!("{prefix}_{tag}_ep_dump.txt")),
                entry_point_dump(db, bucket, kind)?,
            )?;
        }

        fs::write(dir.join(format!("{prefix}_leaf_parts.txt")), leaf_dump(db, bucket))?;
        fs::write(dir.join(format!("{prefix}.tsv")), bucket_tsv(db, bucket)?)?;
    }

    fs::write(dir.join("removed_ie_ep_dump.txt"), removed_dump(db)?)?;
    log::info!("wrote database dumps to {}", dir.display());
    Ok(())
}

/// Writes the resolved values of a run into `dir`, creating it if needed.
///
/// | File | Content |
/// |------|---------|
/// | `file_paths_ep_and_seed.txt` | rewritten value per entry point and seed |
/// | `file_paths.txt` | unique rewritten values |
/// | `file_paths_regex.txt` | unique regexes of the alternatives |
/// | `file_paths_simple.txt` | unique simple forms of the alternatives |
/// | `leaf_parts.txt` | unique opaque leaves of the resolved values |
///
/// # Errors
///
/// Returns [`Error::FileError`] if a file cannot be written.
pub fn write_resolution_dumps(resolutions: &[SeedResolution], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut by_entry_point: BTreeMap<&EntryPoint, Vec<&SeedResolution>> = BTreeMap::new();
    let mut values = BTreeSet::new();
    let mut regexes = BTreeSet::new();
    let mut simple = BTreeSet::new();
    let mut leaves = BTreeSet::new();

    for resolution in resolutions {
        by_entry_point
            .entry(&resolution.entry_point)
            .or_default()
            .push(resolution);

        let tree = &resolution.rewritten;
        values.insert(tree.display());
        for alternative in tree.alternatives() {
            simple.insert(tree.arena.simple(alternative));
            match tree.arena.regex(alternative) {
                Ok(regex) => {
                    regexes.insert(regex);
                }
                Err(e) => log::debug!("no regex for {}: {e}", tree.arena.simple(alternative)),
            }
        }
        leaves.extend(resolution.resolved.opaque_leaves());
    }

    let mut listing = String::new();
    for (entry_point, resolutions) in &by_entry_point {
        let _ = writeln!(listing, "EntryPoint: {entry_point}");
        for resolution in resolutions {
            let _ = writeln!(listing, "  Seed: {}", resolution.seed);
            let _ = writeln!(listing, "    {}", resolution.rewritten.display());
        }
    }

    let lines = |set: &BTreeSet<String>| {
        let mut out = String::new();
        for value in set {
            push_line(&mut out, value);
        }
        out
    };

    fs::write(dir.join("file_paths_ep_and_seed.txt"), listing)?;
    fs::write(dir.join("file_paths.txt"), lines(&values))?;
    fs::write(dir.join("file_paths_regex.txt"), lines(&regexes))?;
    fs::write(dir.join("file_paths_simple.txt"), lines(&simple))?;
    fs::write(dir.join("leaf_parts.txt"), lines(&leaves))?;
    log::info!("wrote resolution dumps to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entrypoint::Seed,
        matching::{FileMatch, SeedExpression},
        ownership::FileEntry,
        part::{AnyKind, CallSite, PartTree, PlaceholderKey, Wildcard},
    };

    fn expression(simple: &str) -> SeedExpression {
        SeedExpression {
            seed: Seed::new(PlaceholderKey::Base {
                site: CallSite::new("<S: void f()>", 2),
            }),
            simple: simple.to_string(),
            original: simple.to_string(),
            leaves: BTreeSet::from(["`ANY[TYPE=UID]`".to_string()]),
        }
    }

    fn sample() -> (EntryPoint, MatchesDatabase) {
        let ep = EntryPoint::new("<S: void f()>", "IS$Stub").with_permission("A");
        let mut db = MatchesDatabase::new();
        db.add_expression(&ep, Bucket::Redelegation, "/data/x", expression("/data/x"));
        db.add_file(
            &ep,
            Bucket::Redelegation,
            "/data/x",
            FileMatch {
                entry: FileEntry::new("/data/x", "u", "g"),
                granted: BTreeSet::from(["A".to_string(), "B".to_string()]),
                missing: BTreeSet::from(["B".to_string()]),
            },
        );
        db.add_expression(&ep, Bucket::NoMatch, "/nowhere", expression("/nowhere"));
        (ep, db)
    }

    #[test]
    fn test_counts() {
        let (_, db) = sample();
        assert_eq!(
            bucket_counts(&db, Bucket::Redelegation),
            "Unique Regexes: 1\nUnique IEs: 1\nUnique Files: 1\n"
        );
    }

    #[test]
    fn test_tsv_rows() {
        let (_, db) = sample();
        let tsv = bucket_tsv(&db, Bucket::Redelegation).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], TSV_HEADER);
        let cells: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(cells.len(), 11);
        assert_eq!(cells[3], "/data/x");
        assert_eq!(cells[4], "g");
        assert_eq!(cells[7], "[B]");

        let no_match = bucket_tsv(&db, Bucket::NoMatch).unwrap();
        let cells: Vec<&str> = no_match.lines().nth(1).unwrap().split('\t').collect();
        assert_eq!(cells.len(), 11);
        assert_eq!(cells[3], "");
    }

    #[test]
    fn test_tsv_rejects_tabs() {
        let ep = EntryPoint::new("<S: void f()>", "IS$Stub");
        let mut db = MatchesDatabase::new();
        db.add_expression(&ep, Bucket::NoMatch, "/a\tb", expression("/a\tb"));
        assert!(matches!(
            bucket_tsv(&db, Bucket::NoMatch),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_stub_counts_sorted() {
        let (_, mut db) = sample();
        let other = EntryPoint::new("<T: void g()>", "IT$Stub");
        db.add_expression(&other, Bucket::Redelegation, "/a", expression("/a"));
        db.add_expression(&other, Bucket::Redelegation, "/b", expression("/b"));
        let counts = grouped_counts(&db, Bucket::Redelegation, Kind::Regex, |ep| ep.stub.clone()).unwrap();
        assert_eq!(
            count_listing("Regex Stub Counts: ", counts),
            "Regex Stub Counts: \n  IT$Stub & 2\n  IS$Stub & 1\n"
        );
    }

    #[test]
    fn test_write_database_dumps() {
        let (_, db) = sample();
        let dir = tempfile::tempdir().unwrap();
        write_database_dumps(&db, dir.path()).unwrap();

        let ep_dump = fs::read_to_string(dir.path().join("redelegation_regex_ep_dump.txt")).unwrap();
        assert!(ep_dump.starts_with("EntryPoint: {IS$Stub : <S: void f()>}\n  EntryPoint Permissions: [A]\n    /data/x\n"));
        let leaves = fs::read_to_string(dir.path().join("redelegation_leaf_parts.txt")).unwrap();
        assert_eq!(leaves, "`ANY[TYPE=UID]`\n");
        assert!(dir.path().join("match_all.tsv").exists());
    }

    #[test]
    fn test_write_resolution_dumps() {
        let ep = EntryPoint::new("<S: void f()>", "IS$Stub");
        let tree = PartTree::build(|arena| {
            let a = arena.string("/data/");
            let uid = arena.any(Wildcard::new(AnyKind::Uid));
            let app = arena.append(vec![a, uid]);
            let b = arena.string("/cache");
            arena.or(vec![app, b])
        });
        let resolutions = vec![SeedResolution {
            entry_point: ep,
            seed: Seed::new(PlaceholderKey::Base {
                site: CallSite::new("<S: void f()>", 2),
            }),
            resolved: tree.clone(),
            rewritten: tree,
        }];

        let dir = tempfile::tempdir().unwrap();
        write_resolution_dumps(&resolutions, dir.path()).unwrap();
        let regexes = fs::read_to_string(dir.path().join("file_paths_regex.txt")).unwrap();
        assert_eq!(regexes, "/cache\n/data/\\d+\n");
        let listing = fs::read_to_string(dir.path().join("file_paths_ep_and_seed.txt")).unwrap();
        assert!(listing.starts_with("EntryPoint: {IS$Stub : <S: void f()>}\n  Seed: "));
    }
}
