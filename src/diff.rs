//! Line-change application.
//!
//! Rebuilds a file's content from its original lines and a sparse set of
//! per-line edits keyed by original 1-based line number. The engine is pure:
//! callers read and write files (and take backups) themselves.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::error::CapabilityError;
use crate::types::LineChange;

/// Separator for content that has no line break to copy.
pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Line separator already used by `text`: CRLF if any line ends with one,
/// LF if any line break exists, [`LINE_SEPARATOR`] otherwise.
pub fn line_separator(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else if text.contains('\n') {
        "\n"
    } else {
        LINE_SEPARATOR
    }
}

/// Counters describing what an application did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub original_line_count: usize,
    /// Number of lines in the output (not the number of modified lines).
    pub output_line_count: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl DiffStats {
    pub fn total_changes(&self) -> usize {
        self.added + self.modified + self.deleted
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "original_line_count": self.original_line_count,
            "output_line_count": self.output_line_count,
            "added": self.added,
            "modified": self.modified,
            "deleted": self.deleted,
            "total_changes": self.total_changes(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    pub lines: Vec<String>,
    pub stats: DiffStats,
}

impl DiffOutcome {
    /// Output lines joined with the separator of `original`, keeping its
    /// trailing line break if it had one.
    pub fn render(&self, original: &str) -> String {
        let separator = line_separator(original);
        let mut content = self.lines.join(separator);
        if original.ends_with('\n') && !content.is_empty() {
            content.push_str(separator);
        }
        content
    }
}

/// Apply `changes` to `original`, optionally prefixing `header_comment`.
///
/// Added entries are inserted before the original line carrying the same
/// number, or appended (in ascending order) when the number is past the end.
/// Deleted lines are dropped, modified lines replaced, and everything else,
/// including `Context` entries, passes through verbatim.
pub fn apply_changes<S: AsRef<str>>(
    original: &[S],
    changes: &BTreeMap<u32, LineChange>,
    header_comment: Option<&str>,
) -> Result<DiffOutcome, CapabilityError> {
    if changes.is_empty() {
        return Err(CapabilityError::invalid("No changes specified"));
    }
    if changes.contains_key(&0) {
        return Err(CapabilityError::invalid(
            "Line numbers are 1-based; line 0 is not valid",
        ));
    }

    let mut deleted: BTreeSet<u32> = BTreeSet::new();
    let mut modified: HashMap<u32, &str> = HashMap::new();
    let mut added: BTreeMap<u32, &str> = BTreeMap::new();
    for (&line, change) in changes {
        match change {
            LineChange::Added { content } => {
                added.insert(line, content.as_str());
            }
            LineChange::Modified { content, .. } => {
                modified.insert(line, content.as_str());
            }
            LineChange::Deleted { .. } => {
                deleted.insert(line);
            }
            LineChange::Context { .. } => {}
        }
    }

    let mut stats = DiffStats {
        original_line_count: original.len(),
        ..DiffStats::default()
    };
    let mut lines: Vec<String> = Vec::with_capacity(original.len() + added.len() + 1);

    if let Some(header) = header_comment {
        lines.push(header.to_string());
        stats.added += 1;
    }

    for (idx, line) in original.iter().enumerate() {
        let number = (idx + 1) as u32;

        if let Some(content) = added.get(&number) {
            lines.push((*content).to_string());
            stats.added += 1;
        }

        if deleted.contains(&number) {
            stats.deleted += 1;
            continue;
        }

        match modified.get(&number) {
            Some(content) => {
                lines.push((*content).to_string());
                stats.modified += 1;
            }
            None => lines.push(line.as_ref().to_string()),
        }
    }

    let past_end = original.len() as u32 + 1;
    for content in added.range(past_end..).map(|(_, c)| *c) {
        lines.push(content.to_string());
        stats.added += 1;
    }

    stats.output_line_count = lines.len();
    Ok(DiffOutcome { lines, stats })
}
