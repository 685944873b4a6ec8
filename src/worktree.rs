use git2::{Diff, ErrorCode, Status, StatusOptions};

use crate::diff;
use crate::error::RepositoryError;
use crate::git::GitAnalyzer;
use crate::models::{ChangeStatus, UncommittedChange};

impl GitAnalyzer {
    /// Staged, then unstaged, then untracked changes, each group in git's order.
    pub fn uncommitted_changes(&self) -> Result<Vec<UncommittedChange>, RepositoryError> {
        let repo = self.repo();

        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };

        let staged = repo.diff_tree_to_index(head_tree.as_ref(), None, None)?;

        let unstaged = repo.diff_index_to_workdir(None, None)?;

        let mut changes = diff_changes(&staged, ChangeStatus::Staged);
        changes.extend(diff_changes(&unstaged, ChangeStatus::Unstaged));
        changes.extend(self.untracked_files()?);

        tracing::info!("Found {} uncommitted changes", changes.len());

        Ok(changes)
    }

    fn untracked_files(&self) -> Result<Vec<UncommittedChange>, RepositoryError> {
        let repo = self.repo();
        let workdir = repo
            .workdir()
            .ok_or_else(|| git2::Error::from_str("repository has no working tree"))?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = repo.statuses(Some(&mut opts))?;

        let mut files = Vec::new();
        for entry in statuses.iter() {
            if !entry.status().contains(Status::WT_NEW) {
                continue;
            }
            let Some(path) = entry.path() else {
                tracing::warn!("Skipping untracked file with a non UTF-8 path");
                continue;
            };

            let full_path = workdir.join(path);
            let bytes = std::fs::read(&full_path).map_err(|source| RepositoryError::Io {
                path: full_path.clone(),
                source,
            })?;
            let content = String::from_utf8(bytes).map_err(|_| RepositoryError::FileDecode {
                path: path.to_string(),
            })?;

            files.push(UncommittedChange {
                path: path.to_string(),
                status: ChangeStatus::Untracked,
                content,
            });
        }

        Ok(files)
    }
}

fn diff_changes(diff: &Diff<'_>, status: ChangeStatus) -> Vec<UncommittedChange> {
    diff::collect_changes(diff::entries(diff))
        .into_iter()
        .map(|change| UncommittedChange {
            path: change.path,
            status,
            content: change.diff,
        })
        .collect()
}
