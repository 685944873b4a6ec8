use chrono::{FixedOffset, Offset, TimeZone, Utc};
use git2::{ErrorCode, Oid, Repository, Sort};
use std::path::Path;

use crate::diff;
use crate::error::{BranchComparisonFailed, RepositoryError};
use crate::models::{Commit, RepositoryContext};

/// Branches tried, in order, when the requested target does not exist.
const FALLBACK_BRANCHES: [&str; 3] = ["main", "master", "dev"];

/// Reference names accepted as the merge target when describing the repository.
const CONTEXT_TARGET_CANDIDATES: [&str; 6] =
    ["origin/main", "main", "origin/master", "master", "origin/dev", "dev"];

const DEFAULT_CONTEXT_TARGET: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Short name of the matched reference, e.g. `origin/dev`
    pub name: String,
    pub oid: Oid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    /// The current branch is the target; there is nothing to compare.
    SameBranch,
    Found(ResolvedTarget),
    Unresolved,
}

/// Outcome of walking `target..head`.
enum RangeWalk {
    Commits(Vec<Oid>),
    FallbackRequested(BranchComparisonFailed),
}

pub struct GitAnalyzer {
    repo: Repository,
    recent_limit: usize,
}

impl GitAnalyzer {
    /// Open the repository containing `start`, searching parent directories.
    pub fn open(start: &Path, recent_limit: usize) -> Result<Self, RepositoryError> {
        let repo = Repository::discover(start).map_err(|e| match e.code() {
            ErrorCode::NotFound => RepositoryError::NotAGitRepository {
                path: start.to_path_buf(),
            },
            _ => RepositoryError::Git(e),
        })?;

        tracing::debug!("Opened repository at {:?}", repo.path());

        Ok(Self { repo, recent_limit })
    }

    pub fn open_current_dir(recent_limit: usize) -> Result<Self, RepositoryError> {
        let cwd = std::env::current_dir().map_err(|source| RepositoryError::Io {
            path: ".".into(),
            source,
        })?;
        Self::open(&cwd, recent_limit)
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Name of the checked-out branch. An unborn branch (no commits yet) still has a name.
    pub fn current_branch(&self) -> Result<String, RepositoryError> {
        match self.repo.head() {
            Ok(head) => {
                if !head.is_branch() {
                    return Err(RepositoryError::DetachedHead);
                }
                head.shorthand()
                    .map(str::to_string)
                    .ok_or(RepositoryError::DetachedHead)
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                head.symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .ok_or(RepositoryError::DetachedHead)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_oid(&self) -> Result<Option<Oid>, RepositoryError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Locate the reference to compare against.
    ///
    /// Tries `target`, `origin/<target>` and `refs/remotes/origin/<target>`, then each
    /// fallback branch (bare name first, then its `origin/` form).
    pub fn resolve_target(&self, target: &str) -> Result<TargetResolution, RepositoryError> {
        let current = self.current_branch()?;
        if current == target {
            return Ok(TargetResolution::SameBranch);
        }

        let exact = [
            target.to_string(),
            format!("origin/{}", target),
            format!("refs/remotes/origin/{}", target),
        ];
        if let Some(found) = exact.iter().find_map(|name| self.lookup_reference(name)) {
            tracing::debug!("Resolved target '{}' to {}", target, found.name);
            return Ok(TargetResolution::Found(found));
        }

        for fallback in FALLBACK_BRANCHES.iter().filter(|b| **b != target) {
            for name in [fallback.to_string(), format!("origin/{}", fallback)] {
                if let Some(found) = self.lookup_reference(&name) {
                    tracing::warn!(
                        "Target branch '{}' not found, comparing against {}",
                        target,
                        found.name
                    );
                    return Ok(TargetResolution::Found(found));
                }
            }
        }

        Ok(TargetResolution::Unresolved)
    }

    /// Branch or remote-tracking reference for `name`; tags never match.
    fn lookup_reference(&self, name: &str) -> Option<ResolvedTarget> {
        let candidates = if name.starts_with("refs/") {
            vec![name.to_string()]
        } else {
            vec![format!("refs/heads/{}", name), format!("refs/remotes/{}", name)]
        };

        let reference = candidates
            .iter()
            .filter_map(|full| self.repo.find_reference(full).ok())
            .find(|r| r.is_branch() || r.is_remote())?;
        let oid = reference.peel_to_commit().ok()?.id();
        Some(ResolvedTarget {
            name: reference.shorthand().unwrap_or(name).to_string(),
            oid,
        })
    }

    /// Commits reachable from the current branch but not from `target`, newest first.
    ///
    /// Without a usable target this lists the most recent commits of the current branch.
    pub fn commits_unique_to(&self, target: &str) -> Result<Vec<Commit>, RepositoryError> {
        let resolution = self.resolve_target(target)?;

        let Some(head) = self.head_oid()? else {
            tracing::info!("Current branch has no commits yet");
            return Ok(Vec::new());
        };

        let oids = match resolution {
            TargetResolution::SameBranch => {
                tracing::info!("Current branch is '{}', nothing to compare", target);
                return Ok(Vec::new());
            }
            TargetResolution::Unresolved => {
                tracing::warn!(
                    "No target branch found for '{}', listing the {} most recent commits",
                    target,
                    self.recent_limit
                );
                self.recent_commits(head)?
            }
            TargetResolution::Found(resolved) => match self.walk_range(head, resolved.oid) {
                RangeWalk::Commits(oids) => oids,
                RangeWalk::FallbackRequested(e) => {
                    tracing::warn!("{}, listing recent commits instead", e);
                    self.recent_commits(head)?
                }
            },
        };

        tracing::info!("Found {} commits to analyze", oids.len());

        oids.into_iter().map(|oid| self.read_commit(oid)).collect()
    }

    fn walk_range(&self, head: Oid, target: Oid) -> RangeWalk {
        match self.try_walk_range(head, target) {
            Ok(oids) => RangeWalk::Commits(oids),
            Err(e) => RangeWalk::FallbackRequested(e),
        }
    }

    fn try_walk_range(&self, head: Oid, target: Oid) -> Result<Vec<Oid>, BranchComparisonFailed> {
        // Unrelated histories have no merge base; hiding the target would hide nothing
        self.repo.merge_base(head, target)?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head)?;
        revwalk.hide(target)?;

        let mut oids = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            // Hidden commits are already excluded; this catches inconsistent ref state
            if self.reachable_from(target, oid)? {
                tracing::debug!("Dropping {} which is part of the target history", oid);
                continue;
            }
            oids.push(oid);
        }

        Ok(oids)
    }

    fn reachable_from(&self, tip: Oid, oid: Oid) -> Result<bool, git2::Error> {
        Ok(tip == oid || self.repo.graph_descendant_of(tip, oid)?)
    }

    fn recent_commits(&self, head: Oid) -> Result<Vec<Oid>, RepositoryError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head)?;

        let oids = revwalk
            .take(self.recent_limit)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(oids)
    }

    fn read_commit(&self, oid: Oid) -> Result<Commit, RepositoryError> {
        let commit = self.repo.find_commit(oid)?;
        let author = commit.author();
        let author = author
            .name()
            .filter(|n| !n.is_empty())
            .or_else(|| author.email())
            .unwrap_or("unknown")
            .to_string();

        let changes = match diff::diff_for(&self.repo, &commit) {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!("Could not diff commit {}: {}", oid, e);
                Vec::new()
            }
        };

        Ok(Commit {
            hash: short_hash(oid),
            message: commit.message().unwrap_or("").trim().to_string(),
            author,
            date: format_commit_time(commit.time()),
            changes,
        })
    }

    /// Current branch, likely merge target and `origin` URL.
    pub fn context(&self) -> Result<RepositoryContext, RepositoryError> {
        let current_branch = self.current_branch()?;

        let remote_url = match self.repo.find_remote("origin") {
            Ok(remote) => remote.url().map(str::to_string),
            Err(_) => None,
        };

        let mut target_branch = None;
        for reference in self.repo.references()?.flatten() {
            if !(reference.is_branch() || reference.is_remote()) {
                continue;
            }
            if let Some(name) = reference.shorthand() {
                if CONTEXT_TARGET_CANDIDATES.contains(&name) {
                    target_branch = Some(name.to_string());
                    break;
                }
            }
        }

        Ok(RepositoryContext {
            current_branch,
            target_branch: target_branch.unwrap_or_else(|| DEFAULT_CONTEXT_TARGET.to_string()),
            remote_url,
        })
    }
}

fn short_hash(oid: Oid) -> String {
    let mut hash = oid.to_string();
    hash.truncate(7);
    hash
}

fn format_commit_time(time: git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    match offset.timestamp_opt(time.seconds(), 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        None => time.seconds().to_string(),
    }
}
