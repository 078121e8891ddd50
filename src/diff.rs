//! Unified diff parsing
//!
//! Reconstructs file/hunk/line structure from raw `git diff` text, tracking
//! old/new line numbers so findings can be anchored to exact lines. Parsing is
//! best-effort: unparsable lines are skipped, never surfaced as errors.

use serde::{Deserialize, Serialize};

/// Kind of change a single diff line represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Added,
    Removed,
    Context,
}

/// A single line in a diff hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// Line content without the leading +/-/space marker
    pub content: String,
    /// Line number in the old file (None for additions)
    pub old_line: Option<u32>,
    /// Line number in the new file (None for removals)
    pub new_line: Option<u32>,
}

/// A contiguous block of changes within one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Trailing hunk header text (e.g. the enclosing function signature)
    pub header: Option<String>,
    pub lines: Vec<DiffLine>,
}

/// Change status of a file in the diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }
}

/// One file's change set within a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFile {
    /// Path on the old side (a/ prefix removed)
    pub old_path: String,
    /// Path on the new side (b/ prefix removed)
    pub new_path: String,
    pub status: FileStatus,
    pub hunks: Vec<DiffHunk>,
}

/// Parser state threaded through the single forward pass.
///
/// Keeping the current file/hunk and both line cursors in one place makes the
/// finalize transitions explicit: a hunk is closed from exactly three sites
/// (next `@@`, next `diff --git`, end of input) and must always land in its
/// owning file before that file is pushed.
#[derive(Default)]
struct ParseState {
    files: Vec<DiffFile>,
    current_file: Option<DiffFile>,
    current_hunk: Option<DiffHunk>,
    old_cursor: u32,
    new_cursor: u32,
}

impl ParseState {
    /// Close the open hunk, if any, appending it to the current file
    fn finalize_hunk(&mut self) {
        if let Some(hunk) = self.current_hunk.take() {
            if let Some(file) = self.current_file.as_mut() {
                file.hunks.push(hunk);
            }
        }
    }

    /// Close the open hunk and file, pushing the file onto the result list
    fn finalize_file(&mut self) {
        self.finalize_hunk();
        if let Some(file) = self.current_file.take() {
            self.files.push(file);
        }
    }
}

/// Parse raw unified diff text into structured file change records.
///
/// Never fails: malformed headers and unknown marker lines are skipped, and an
/// empty input yields an empty list. Files appearing twice in the text produce
/// two separate entries.
pub fn parse_diff(diff_text: &str) -> Vec<DiffFile> {
    let mut state = ParseState::default();

    for line in diff_text.lines() {
        // File header: diff --git a/path b/path
        if line.starts_with("diff --git") {
            state.finalize_file();
            if let Some((old_path, new_path)) = parse_file_header(line) {
                state.current_file = Some(DiffFile {
                    old_path,
                    new_path,
                    status: FileStatus::Modified,
                    hunks: Vec::new(),
                });
            }
            continue;
        }

        // Everything before the first file header is noise
        let Some(file) = state.current_file.as_mut() else {
            continue;
        };

        // Status markers
        if line.starts_with("new file mode") {
            file.status = FileStatus::Added;
            continue;
        }
        if line.starts_with("deleted file mode") {
            file.status = FileStatus::Deleted;
            continue;
        }
        if line.starts_with("rename from") {
            file.status = FileStatus::Renamed;
            continue;
        }

        // Hunk header: @@ -start,lines +start,lines @@ optional context
        if line.starts_with("@@") {
            state.finalize_hunk();
            if let Some(hunk) = parse_hunk_header(line) {
                state.old_cursor = hunk.old_start;
                state.new_cursor = hunk.new_start;
                state.current_hunk = Some(hunk);
            }
            continue;
        }

        let Some(hunk) = state.current_hunk.as_mut() else {
            continue;
        };

        let parsed = if let Some(content) = line.strip_prefix('+') {
            let new_line = state.new_cursor;
            state.new_cursor += 1;
            Some(DiffLine {
                kind: DiffLineKind::Added,
                content: content.to_string(),
                old_line: None,
                new_line: Some(new_line),
            })
        } else if let Some(content) = line.strip_prefix('-') {
            let old_line = state.old_cursor;
            state.old_cursor += 1;
            Some(DiffLine {
                kind: DiffLineKind::Removed,
                content: content.to_string(),
                old_line: Some(old_line),
                new_line: None,
            })
        } else if line.is_empty() || line.starts_with(' ') {
            let content = line.strip_prefix(' ').unwrap_or(line);
            let old_line = state.old_cursor;
            let new_line = state.new_cursor;
            state.old_cursor += 1;
            state.new_cursor += 1;
            Some(DiffLine {
                kind: DiffLineKind::Context,
                content: content.to_string(),
                old_line: Some(old_line),
                new_line: Some(new_line),
            })
        } else {
            // Skip other markers (e.g. "\ No newline at end of file")
            None
        };

        if let Some(diff_line) = parsed {
            hunk.lines.push(diff_line);
        }
    }

    state.finalize_file();
    state.files
}

/// Split `diff --git a/<old> b/<new>` into (old, new) paths.
/// The split is on the last ` b/` so old paths containing that byte sequence
/// still parse.
fn parse_file_header(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("diff --git ")?;
    let rest = rest.strip_prefix("a/")?;
    let (old_path, new_part) = rest.rsplit_once(" b/")?;
    if old_path.is_empty() || new_part.is_empty() {
        return None;
    }
    Some((old_path.to_string(), new_part.to_string()))
}

/// Parse `@@ -old_start[,old_lines] +new_start[,new_lines] @@ [header]`
fn parse_hunk_header(line: &str) -> Option<DiffHunk> {
    let rest = line.strip_prefix("@@ -")?;
    let (old_range, rest) = rest.split_once(" +")?;
    let (new_range, trailer) = rest.split_once(" @@")?;

    let (old_start, old_lines) = parse_range(old_range)?;
    let (new_start, new_lines) = parse_range(new_range)?;

    let header = {
        let trimmed = trailer.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };

    Some(DiffHunk {
        old_start,
        old_lines,
        new_start,
        new_lines,
        header,
        lines: Vec::new(),
    })
}

/// Parse a range like "10,5" or "10" into (start, count); omitted count is 1
fn parse_range(s: &str) -> Option<(u32, u32)> {
    match s.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

/// Format parsed diff files for inclusion in an analysis prompt.
///
/// Each line carries its new-file line number (old-file number for removals)
/// so the model can reference exact positions in its findings.
pub fn format_diff_for_prompt(files: &[DiffFile]) -> String {
    let mut out = String::new();

    for file in files {
        out.push_str(&format!(
            "\n### File: {} ({})\n\n",
            file.new_path,
            file.status.as_str()
        ));

        for hunk in &file.hunks {
            if let Some(header) = &hunk.header {
                out.push_str(&format!("Context: {}\n", header));
            }

            for line in &hunk.lines {
                let prefix = match line.kind {
                    DiffLineKind::Added => '+',
                    DiffLineKind::Removed => '-',
                    DiffLineKind::Context => ' ',
                };
                let number = line
                    .new_line
                    .or(line.old_line)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                out.push_str(&format!("{} L{}: {}\n", prefix, number, line.content));
            }
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_DIFF: &str = "\
diff --git a/src/a.ts b/src/a.ts
@@ -1,2 +1,3 @@
 line1
+line2
 line3
";

    #[test]
    fn test_parse_simple_diff() {
        let files = parse_diff(SIMPLE_DIFF);
        assert_eq!(files.len(), 1);

        let file = &files[0];
        assert_eq!(file.old_path, "src/a.ts");
        assert_eq!(file.new_path, "src/a.ts");
        assert_eq!(file.status, FileStatus::Modified);
        assert_eq!(file.hunks.len(), 1);

        let hunk = &file.hunks[0];
        assert_eq!(
            (hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines),
            (1, 2, 1, 3)
        );
        assert_eq!(hunk.lines.len(), 3);

        assert_eq!(hunk.lines[0].kind, DiffLineKind::Context);
        assert_eq!(hunk.lines[0].old_line, Some(1));
        assert_eq!(hunk.lines[0].new_line, Some(1));

        assert_eq!(hunk.lines[1].kind, DiffLineKind::Added);
        assert_eq!(hunk.lines[1].old_line, None);
        assert_eq!(hunk.lines[1].new_line, Some(2));
        assert_eq!(hunk.lines[1].content, "line2");

        assert_eq!(hunk.lines[2].kind, DiffLineKind::Context);
        assert_eq!(hunk.lines[2].old_line, Some(2));
        assert_eq!(hunk.lines[2].new_line, Some(3));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_diff("").is_empty());
    }

    #[test]
    fn test_lines_before_first_header_ignored() {
        let diff = "some preamble\nnot a diff line\ndiff --git a/x.rs b/x.rs\n";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 1);
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn test_status_markers() {
        let diff = "\
diff --git a/new.rs b/new.rs
new file mode 100644
@@ -0,0 +1 @@
+fn main() {}
diff --git a/gone.rs b/gone.rs
deleted file mode 100644
@@ -1 +0,0 @@
-fn main() {}
diff --git a/old_name.rs b/new_name.rs
rename from old_name.rs
rename to new_name.rs
diff --git a/plain.rs b/plain.rs
@@ -1 +1 @@
-a
+b
";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 4);
        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!(files[1].status, FileStatus::Deleted);
        assert_eq!(files[2].status, FileStatus::Renamed);
        assert_eq!(files[3].status, FileStatus::Modified);
    }

    #[test]
    fn test_hunk_header_without_counts_defaults_to_one() {
        let diff = "\
diff --git a/x.rs b/x.rs
@@ -5 +7 @@
-old
+new
";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!((hunk.old_start, hunk.old_lines), (5, 1));
        assert_eq!((hunk.new_start, hunk.new_lines), (7, 1));
        assert_eq!(hunk.lines[0].old_line, Some(5));
        assert_eq!(hunk.lines[1].new_line, Some(7));
    }

    #[test]
    fn test_hunk_trailing_header_captured() {
        let diff = "\
diff --git a/x.rs b/x.rs
@@ -10,3 +10,4 @@ fn do_work(input: &str) -> bool {
 a
+b
 c
 d
";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.header.as_deref(), Some("fn do_work(input: &str) -> bool {"));
    }

    #[test]
    fn test_no_newline_marker_skipped_and_cursors_untouched() {
        let diff = "\
diff --git a/x.rs b/x.rs
@@ -1,2 +1,2 @@
 a
\\ No newline at end of file
-b
+c
";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.lines.len(), 3);
        // The marker consumed no line numbers
        assert_eq!(hunk.lines[1].old_line, Some(2));
        assert_eq!(hunk.lines[2].new_line, Some(2));
    }

    #[test]
    fn test_empty_line_is_context() {
        let diff = "\
diff --git a/x.rs b/x.rs
@@ -1,3 +1,3 @@
 a

 b
";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.lines.len(), 3);
        assert_eq!(hunk.lines[1].kind, DiffLineKind::Context);
        assert_eq!(hunk.lines[1].content, "");
        assert_eq!(hunk.lines[1].old_line, Some(2));
        assert_eq!(hunk.lines[1].new_line, Some(2));
    }

    #[test]
    fn test_duplicate_paths_kept_separate() {
        let diff = "\
diff --git a/x.rs b/x.rs
@@ -1 +1 @@
-a
+b
diff --git a/x.rs b/x.rs
@@ -5 +5 @@
-c
+d
";
        let files = parse_diff(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].new_path, files[1].new_path);
    }

    #[test]
    fn test_line_accounting_matches_hunk_counts() {
        let diff = "\
diff --git a/y.rs b/y.rs
@@ -3,4 +3,5 @@
 keep
-drop
+swap
+extra
 keep2
 keep3
";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];

        let new_side = hunk
            .lines
            .iter()
            .filter(|l| matches!(l.kind, DiffLineKind::Added | DiffLineKind::Context))
            .count() as u32;
        let old_side = hunk
            .lines
            .iter()
            .filter(|l| matches!(l.kind, DiffLineKind::Removed | DiffLineKind::Context))
            .count() as u32;

        assert_eq!(new_side, hunk.new_lines);
        assert_eq!(old_side, hunk.old_lines);
    }

    #[test]
    fn test_new_line_numbers_strictly_increasing() {
        let diff = "\
diff --git a/z.rs b/z.rs
@@ -10,3 +20,4 @@
 a
+b
-c
+d
 e
";
        let files = parse_diff(diff);
        let hunk = &files[0].hunks[0];

        let new_numbers: Vec<u32> = hunk.lines.iter().filter_map(|l| l.new_line).collect();
        assert_eq!(new_numbers, vec![20, 21, 22, 23]);

        let old_numbers: Vec<u32> = hunk.lines.iter().filter_map(|l| l.old_line).collect();
        assert_eq!(old_numbers, vec![10, 11, 12]);
    }

    #[test]
    fn test_format_diff_for_prompt() {
        let files = parse_diff(SIMPLE_DIFF);
        let formatted = format_diff_for_prompt(&files);
        assert!(formatted.contains("### File: src/a.ts (modified)"));
        assert!(formatted.contains("+ L2: line2"));
        assert!(formatted.contains("  L1: line1"));
    }
}
