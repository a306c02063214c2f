//! Domain model types shared by the detectors, the session, and the CLI.

use serde::{Deserialize, Serialize};

/// Delimiter separating a record's semantic ID from the rest of the line.
pub const ID_DELIMITER: char = ';';

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// A single line as produced by the diff collaborator.
///
/// `content` never includes the line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub number: u32,
    pub content: String,
}

impl Line {
    pub fn new(number: u32, content: impl Into<String>) -> Self {
        Self {
            number,
            content: content.into(),
        }
    }

    /// The semantic ID of this line, see [`semantic_id`].
    pub fn semantic_id(&self) -> &str {
        semantic_id(&self.content)
    }
}

/// Return the text before the first `;`, or the whole line when it has none.
pub fn semantic_id(content: &str) -> &str {
    match content.split_once(ID_DELIMITER) {
        Some((id, _)) => id,
        None => content,
    }
}

/// How a line changed relative to the merge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Added,
    Deleted,
    Unchanged,
}

impl Change {
    /// Short marker used when rendering a report.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Added => "[+]",
            Self::Deleted => "[-]",
            Self::Unchanged => "",
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Deleted => write!(f, "deleted"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A line together with its change classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub line: Line,
    pub change: Change,
}

/// One conflicting position: the local change and the remote change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChangePair {
    pub local: LineChange,
    pub remote: LineChange,
}

impl LineChangePair {
    /// Line number both sides collide on.
    pub fn number(&self) -> u32 {
        self.local.line.number
    }
}

// ---------------------------------------------------------------------------
// Diffs
// ---------------------------------------------------------------------------

/// Added and deleted lines of one file relative to the merge base.
///
/// Added lines are numbered in the target version, deleted lines in the base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    pub added: Vec<Line>,
    pub deleted: Vec<Line>,
}

impl LineDiff {
    pub fn new(added: Vec<Line>, deleted: Vec<Line>) -> Self {
        Self { added, deleted }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    /// Classify `line` by membership in the added and deleted sets.
    ///
    /// Added takes priority when the line is present in both.
    pub fn classify(&self, line: &Line) -> Change {
        if self.added.contains(line) {
            Change::Added
        } else if self.deleted.contains(line) {
            Change::Deleted
        } else {
            Change::Unchanged
        }
    }
}

/// Local and remote diffs of one path against the shared merge base.
///
/// `None` means the file is untouched on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPair {
    pub local: Option<LineDiff>,
    pub remote: Option<LineDiff>,
}

// ---------------------------------------------------------------------------
// Merge hand-off
// ---------------------------------------------------------------------------

/// Result of pulling the remote branch into the local one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum MergeOutcome {
    /// Local already contains the remote tip.
    UpToDate,
    /// Local was behind and moved to the remote tip.
    FastForward { sha: String },
    /// A merge commit was created.
    Merged { sha: String },
    /// The merge produced conflicts and was aborted.
    Conflicts { paths: Vec<String> },
}

impl std::fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpToDate => write!(f, "already up to date"),
            Self::FastForward { sha } => write!(f, "fast-forwarded to {}", short_sha(sha)),
            Self::Merged { sha } => write!(f, "merged as {}", short_sha(sha)),
            Self::Conflicts { paths } => write!(f, "conflicts in {}", paths.join(", ")),
        }
    }
}

/// The human decision taken after a report was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Decline,
}

/// First eight characters of a hash, for display.
pub fn short_sha(sha: &str) -> &str {
    &sha[..8.min(sha.len())]
}
