//! Patch engine: merges suggested edits into new file content and renders
//! unified diffs
//!
//! Two modes, deliberately split: when auto-fixing, edits from all accepted
//! fixes for a file are merged into one physical write, because applying
//! fixes one at a time against a mutating file invalidates offsets. When not
//! auto-fixing, a would-be diff is computed per individual fix so each
//! suggestion is shown independently.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

use crate::cache::SourceCache;
use crate::diagnostics::{AnalyzerResult, Document, Edit};
use crate::error::MetalintError;
use crate::result::Result;

/// Edits queued for application, grouped by target file
pub type PendingEdits = BTreeMap<String, Vec<Edit>>;

/// Merge a set of edits into new content in a single pass over the original.
///
/// Edits are sorted by start offset; the result does not depend on the order
/// they were discovered in. An edit that begins before the read cursor
/// overlaps the previous one, and there is no deterministic correct
/// resolution, so the whole run aborts rather than guessing.
pub fn merge_edits(file: &str, content: &str, edits: &mut [Edit]) -> Result<String> {
    edits.sort_by_key(|e| e.start);

    let original = content.as_bytes();
    let mut patched: Vec<u8> = Vec::with_capacity(original.len());
    let mut cursor = 0usize;
    for edit in edits.iter() {
        let start = edit.start;
        let end = edit.effective_end();
        if start < cursor {
            return Err(MetalintError::OverlappingEdits {
                file: file.to_string(),
                start,
                cursor,
            });
        }
        if end > original.len() {
            return Err(MetalintError::EditOutOfBounds {
                file: file.to_string(),
                start,
                end,
                len: original.len(),
            });
        }
        patched.extend_from_slice(&original[cursor..start]);
        patched.extend_from_slice(edit.new.as_bytes());
        cursor = end;
    }
    patched.extend_from_slice(&original[cursor..]);

    String::from_utf8(patched).map_err(|_| {
        MetalintError::internal_error(format!(
            "patched content for file '{file}' is not valid UTF-8"
        ))
    })
}

/// Line-based unified diff between old and new content, context radius 1,
/// without file headers. Empty when the contents are identical.
pub fn unified_diff(original: &str, modified: &str) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let mut output = String::new();

    for group in diff.grouped_ops(1) {
        let old_start = group[0].old_range().start;
        let new_start = group[0].new_range().start;
        let old_len = group.iter().map(|op| op.old_range().len()).sum::<usize>();
        let new_len = group.iter().map(|op| op.new_range().len()).sum::<usize>();

        output.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start + 1,
            old_len,
            new_start + 1,
            new_len
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push(sign);
                output.push_str(change.value());
                if !change.value().ends_with('\n') {
                    output.push('\n');
                }
            }
        }
    }

    output
}

/// Applies merged edits to disk. Read and write failures here are fatal: a
/// fix cannot be safely applied without the original bytes.
pub struct PatchEngine<'a> {
    cache: &'a SourceCache,
}

impl<'a> PatchEngine<'a> {
    pub fn new(cache: &'a SourceCache) -> Self {
        Self { cache }
    }

    /// Merge and persist all pending edits, one write per file
    pub fn apply(&self, pending: PendingEdits) -> Result<()> {
        for (filename, mut edits) in pending {
            let file = self.cache.load(&filename)?;
            let patched = merge_edits(&filename, &file.content, &mut edits)?;
            tracing::debug!(
                "applied {} edit(s) to '{}':\n{}",
                edits.len(),
                filename,
                unified_diff(&file.content, &patched)
            );
            persist(&file.path, &patched)?;
        }
        Ok(())
    }
}

/// Full overwrite, keeping the original permission bits
fn persist(path: &Path, content: &str) -> Result<()> {
    let permissions = fs::metadata(path)
        .map_err(|e| MetalintError::io_error(path, e))?
        .permissions();
    fs::write(path, content).map_err(|e| MetalintError::io_error(path, e))?;
    fs::set_permissions(path, permissions).map_err(|e| MetalintError::io_error(path, e))?;
    Ok(())
}

/// Compute the would-be diff for every surviving fix, storing it on the fix
/// for the renderers. Runs in the single-threaded stage so the document is
/// read-only once rendering fans out.
///
/// A fix spanning more than one distinct file, or whose edits cannot be
/// merged cleanly, is dropped with a warning; nothing is being written in
/// this mode, so the run proceeds.
pub fn render_fix_diffs(doc: &mut Document, cache: &SourceCache) {
    for (_, analyzers) in doc.0.iter_mut() {
        for (analyzer, result) in analyzers.iter_mut() {
            let AnalyzerResult::Issues(issues) = result else {
                continue;
            };
            for issue in issues.iter_mut() {
                issue.suggested_fixes.retain_mut(|fix| {
                    let Some(target) = fix.target_file() else {
                        tracing::warn!(
                            "suggested fix from '{analyzer}' modifies more than one file, skipping: {:?}",
                            fix.message
                        );
                        return false;
                    };
                    let file = match cache.load(target) {
                        Ok(file) => file,
                        Err(e) => {
                            tracing::warn!("reading file '{target}' failed: {e}");
                            fix.diff = String::new();
                            return true;
                        }
                    };
                    let mut edits = fix.edits.clone();
                    match merge_edits(target, &file.content, &mut edits) {
                        Ok(patched) => {
                            fix.diff = unified_diff(&file.content, &patched);
                            true
                        }
                        Err(e) => {
                            tracing::warn!("cannot preview suggested fix for '{target}': {e}");
                            false
                        }
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use std::fs;
    use tempfile::TempDir;

    fn edit(filename: &str, start: usize, end: usize, new: &str) -> Edit {
        Edit {
            filename: filename.to_string(),
            new: new.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn merge_is_order_independent() {
        let content = "0123456789abcdefghij";
        let edits = vec![
            edit("f", 2, 4, "XY"),
            edit("f", 8, 8, "INS"),
            edit("f", 12, 15, ""),
        ];
        let expected = {
            let mut s = String::from(content);
            s.replace_range(12..15, "");
            s.replace_range(8..8, "INS");
            s.replace_range(2..4, "XY");
            s
        };

        // All 6 permutations of three edits
        let perms: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for perm in perms {
            let mut shuffled: Vec<Edit> = perm.iter().map(|&i| edits[i].clone()).collect();
            let patched = merge_edits("f", content, &mut shuffled).unwrap();
            assert_eq!(patched, expected);
        }
    }

    #[test]
    fn overlapping_edits_are_fatal() {
        let content = "x".repeat(50);
        let mut edits = vec![edit("f", 10, 20, "a"), edit("f", 15, 25, "b")];
        let err = merge_edits("f", &content, &mut edits).unwrap_err();
        match err {
            MetalintError::OverlappingEdits { file, start, cursor } => {
                assert_eq!(file, "f");
                assert_eq!(start, 15);
                assert_eq!(cursor, 20);
            }
            other => panic!("expected overlap error, got {other}"),
        }
    }

    #[test]
    fn end_before_start_is_zero_width_insertion() {
        let mut edits = vec![edit("f", 3, 0, "-")];
        let patched = merge_edits("f", "abcdef", &mut edits).unwrap();
        assert_eq!(patched, "abc-def");
    }

    #[test]
    fn edit_past_end_of_file_is_rejected() {
        let mut edits = vec![edit("f", 2, 99, "x")];
        assert!(matches!(
            merge_edits("f", "abc", &mut edits),
            Err(MetalintError::EditOutOfBounds { .. })
        ));
    }

    #[test]
    fn replacement_changes_length_as_expected() {
        // 50-byte file, replace [10,14) with "X": 50 - 4 + 1 bytes
        let content = "y".repeat(50);
        let mut edits = vec![edit("f", 10, 14, "X")];
        let patched = merge_edits("f", &content, &mut edits).unwrap();
        assert_eq!(patched.len(), 50 - 4 + 1);
    }

    #[test]
    fn unified_diff_marks_changed_lines() {
        let diff = unified_diff("a\nb\nc\n", "a\nB\nc\n");
        assert!(diff.contains("@@"));
        assert!(diff.contains("-b"));
        assert!(diff.contains("+B"));
        assert!(diff.contains(" a"));
    }

    #[test]
    fn unified_diff_empty_for_identical_content() {
        assert_eq!(unified_diff("same\n", "same\n"), "");
    }

    #[test]
    fn apply_persists_and_preserves_permissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello world").unwrap();
        #[cfg(unix)]
        let mode_before = {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            fs::metadata(&path).unwrap().permissions().mode()
        };

        let name = path.to_str().unwrap().to_string();
        let cache = SourceCache::new();
        let mut pending = PendingEdits::new();
        pending.insert(name.clone(), vec![edit(&name, 0, 5, "goodbye")]);

        PatchEngine::new(&cache).apply(pending).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "goodbye world");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&path).unwrap().permissions().mode(), mode_before);
        }
    }

    #[test]
    fn apply_aborts_on_overlap_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "0123456789012345678901234").unwrap();
        let name = path.to_str().unwrap().to_string();

        let cache = SourceCache::new();
        let mut pending = PendingEdits::new();
        pending.insert(
            name.clone(),
            vec![edit(&name, 10, 20, "a"), edit(&name, 15, 25, "b")],
        );

        let err = PatchEngine::new(&cache).apply(pending).unwrap_err();
        assert!(matches!(err, MetalintError::OverlappingEdits { .. }));
        // Original untouched
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "0123456789012345678901234"
        );
    }

    #[test]
    fn render_fix_diffs_drops_cross_file_fixes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\n").unwrap();
        let name = path.to_str().unwrap().to_string();

        let payload = format!(
            r#"{{"pkg": {{"lint": [{{"message":"m","posn":"{name}:1","suggested_fixes":[
                {{"edits":[{{"filename":"{name}","new":"ONE","start":0,"end":3}}]}},
                {{"edits":[{{"filename":"{name}","new":"x","start":0,"end":1}},
                           {{"filename":"other.txt","new":"y","start":0,"end":1}}]}}
            ]}}]}}}}"#
        );
        let mut doc = Document::decode(payload.as_bytes()).unwrap();
        let cache = SourceCache::new();
        render_fix_diffs(&mut doc, &cache);

        let (_, _, result) = doc.entries().next().unwrap();
        let AnalyzerResult::Issues(issues) = result else {
            panic!("expected issues");
        };
        assert_eq!(issues[0].severity_level, Severity::Error);
        assert_eq!(issues[0].suggested_fixes.len(), 1);
        let diff = &issues[0].suggested_fixes[0].diff;
        assert!(diff.contains("-one"));
        assert!(diff.contains("+ONE"));
    }
}
