use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder diff body for content that is not UTF-8 text.
pub const BINARY_PLACEHOLDER: &str = "(binary file)";
/// Placeholder diff body when git produced no patch for an entry.
pub const NO_DIFF_PLACEHOLDER: &str = "(no diff available)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Abbreviated (7 character) hash
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub path: String,
    pub change_type: ChangeType,
    pub diff: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Deleted => "deleted",
            ChangeType::Renamed => "renamed",
            ChangeType::Copied => "copied",
            ChangeType::TypeChanged => "type-changed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContext {
    pub current_branch: String,
    pub target_branch: String,
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncommittedChange {
    pub path: String,
    pub status: ChangeStatus,
    /// Full file text for untracked files, diff text otherwise
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Staged,
    Unstaged,
    Untracked,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeStatus::Staged => "staged",
            ChangeStatus::Unstaged => "unstaged",
            ChangeStatus::Untracked => "untracked",
        })
    }
}
