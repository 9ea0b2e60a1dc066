//! Line diff between the previous and the new version of a document.

use std::time::{Duration, Instant};

use similar::{Algorithm, ChangeTag};

use crate::theme::Theme;

/// Lines kept around each change when rendering.
const CONTEXT_LINES: usize = 2;

/// Past this, the diff degrades to coarser delete/insert blocks.
const DIFF_DEADLINE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    Equal(String),
    Delete(String),
    Insert(String),
}

/// Changed part of a line replaced by another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub removed: String,
    pub added: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextDiff {
    ops: Vec<DiffOp>,
}

impl TextDiff {
    /// Myers diff of the lines of `old` and `new`, bounded in time.
    pub fn lines(old: &str, new: &str) -> Self {
        let diff = similar::TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .deadline(Instant::now() + DIFF_DEADLINE)
            .diff_lines(old, new);

        // Within each changed run, deletions come before insertions
        let mut ops = Vec::new();
        let (mut deleted, mut inserted) = (Vec::new(), Vec::new());
        for change in diff.iter_all_changes() {
            let line = trim_newline(change.value()).to_string();
            match change.tag() {
                ChangeTag::Delete => deleted.push(DiffOp::Delete(line)),
                ChangeTag::Insert => inserted.push(DiffOp::Insert(line)),
                ChangeTag::Equal => {
                    ops.append(&mut deleted);
                    ops.append(&mut inserted);
                    ops.push(DiffOp::Equal(line));
                }
            }
        }
        ops.append(&mut deleted);
        ops.append(&mut inserted);

        Self { ops }
    }

    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn has_changes(&self) -> bool {
        self.ops.iter().any(|op| !matches!(op, DiffOp::Equal(_)))
    }

    /// Deleted lines paired with the inserted lines following them, reduced
    /// to what differs between each pair. Unpaired lines are kept whole.
    pub fn fragments(&self) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut i = 0;
        while i < self.ops.len() {
            let deleted: Vec<&str> = self.ops[i..]
                .iter()
                .map_while(|op| match op {
                    DiffOp::Delete(line) => Some(line.as_str()),
                    _ => None,
                })
                .collect();
            let inserted: Vec<&str> = self.ops[i + deleted.len()..]
                .iter()
                .map_while(|op| match op {
                    DiffOp::Insert(line) => Some(line.as_str()),
                    _ => None,
                })
                .collect();

            if deleted.is_empty() && inserted.is_empty() {
                i += 1;
                continue;
            }
            i += deleted.len() + inserted.len();

            for pair in 0..deleted.len().max(inserted.len()) {
                let before = deleted.get(pair).copied().unwrap_or("");
                let after = inserted.get(pair).copied().unwrap_or("");
                fragments.push(inline_change(before, after));
            }
        }
        fragments
    }

    /// `-`/`+` prefixed lines with a little context, hunks separated by `...`.
    pub fn render(&self, theme: &Theme) -> String {
        let mut visible = vec![false; self.ops.len()];
        for (i, op) in self.ops.iter().enumerate() {
            if !matches!(op, DiffOp::Equal(_)) {
                let end = (i + CONTEXT_LINES).min(self.ops.len() - 1);
                visible[i.saturating_sub(CONTEXT_LINES)..=end].fill(true);
            }
        }

        let mut out = String::new();
        let mut skipped = false;
        for (i, op) in self.ops.iter().enumerate() {
            if !visible[i] {
                skipped = true;
                continue;
            }
            if skipped && !out.is_empty() {
                out.push_str(&theme.secondary_text("..."));
                out.push('\n');
            }
            skipped = false;

            let line = match op {
                DiffOp::Equal(line) => format!("  {}", line),
                DiffOp::Delete(line) => theme.error_text(&format!("- {}", line)),
                DiffOp::Insert(line) => theme.success_text(&format!("+ {}", line)),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn trim_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn inline_change(before: &str, after: &str) -> Fragment {
    let prefix: usize = before
        .chars()
        .zip(after.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    let (before_rest, after_rest) = (&before[prefix..], &after[prefix..]);

    let suffix: usize = before_rest
        .chars()
        .rev()
        .zip(after_rest.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();

    Fragment {
        removed: before_rest[..before_rest.len() - suffix].to_string(),
        added: after_rest[..after_rest.len() - suffix].to_string(),
    }
}
