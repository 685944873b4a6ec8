use git2::{Delta, Diff, DiffDelta, DiffFindOptions, Patch, Repository};

use crate::error::DiffEntryError;
use crate::models::{Change, ChangeType, BINARY_PLACEHOLDER, NO_DIFF_PLACEHOLDER};

/// Compute the file-level changes of a commit against its first parent,
/// or against an empty tree for a root commit.
pub fn diff_for(repo: &Repository, commit: &git2::Commit) -> Result<Vec<Change>, git2::Error> {
    let tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
    if let Err(e) = detect_renames(&mut diff) {
        tracing::warn!("Rename detection failed for {}: {}", commit.id(), e);
    }

    Ok(collect_changes(entries(&diff)))
}

pub fn detect_renames(diff: &mut Diff<'_>) -> Result<(), git2::Error> {
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    find_opts.copies(true);
    diff.find_similar(Some(&mut find_opts))
}

/// One result per delta, in the order git reports them.
pub fn entries<'a>(
    diff: &'a Diff<'a>,
) -> impl Iterator<Item = Result<Change, DiffEntryError>> + 'a {
    (0..diff.deltas().len()).map(move |idx| change_at(diff, idx))
}

/// Keeps every successfully decoded entry; failed entries are logged and dropped.
pub fn collect_changes<I>(entries: I) -> Vec<Change>
where
    I: IntoIterator<Item = Result<Change, DiffEntryError>>,
{
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match entry {
            Ok(change) => Some(change),
            Err(e) => {
                tracing::warn!("Skipping diff entry {}: {}", idx, e);
                None
            }
        })
        .collect()
}

fn change_at(diff: &Diff<'_>, idx: usize) -> Result<Change, DiffEntryError> {
    let delta = diff.get_delta(idx).ok_or(DiffEntryError::MissingPath)?;
    let change_type = change_type_of(delta.status())?;
    let path = delta_path(&delta, change_type).ok_or(DiffEntryError::MissingPath)?;
    let body = patch_text(diff, idx)?;

    Ok(Change {
        path,
        change_type,
        diff: body,
    })
}

fn change_type_of(status: Delta) -> Result<ChangeType, DiffEntryError> {
    match status {
        Delta::Added => Ok(ChangeType::Added),
        Delta::Modified => Ok(ChangeType::Modified),
        Delta::Deleted => Ok(ChangeType::Deleted),
        Delta::Renamed => Ok(ChangeType::Renamed),
        Delta::Copied => Ok(ChangeType::Copied),
        Delta::Typechange => Ok(ChangeType::TypeChanged),
        other => Err(DiffEntryError::UnsupportedStatus(other)),
    }
}

// Post-change path, except deletions which only have a meaningful old path
fn delta_path(delta: &DiffDelta<'_>, change_type: ChangeType) -> Option<String> {
    let path = if change_type == ChangeType::Deleted {
        delta.old_file().path().or_else(|| delta.new_file().path())
    } else {
        delta.new_file().path().or_else(|| delta.old_file().path())
    };
    path.map(|p| p.to_string_lossy().to_string())
}

// The binary flag is only reliable once libgit2 has loaded the content for the patch
fn patch_text(diff: &Diff<'_>, idx: usize) -> Result<String, git2::Error> {
    let patch = Patch::from_diff(diff, idx)?;
    let binary = diff.get_delta(idx).is_some_and(|d| d.flags().is_binary())
        || patch.as_ref().is_some_and(|p| p.delta().flags().is_binary());

    if binary {
        return Ok(BINARY_PLACEHOLDER.to_string());
    }
    match patch {
        None => Ok(NO_DIFF_PLACEHOLDER.to_string()),
        Some(mut patch) => {
            let buf = patch.to_buf()?;
            Ok(decode_or_placeholder(&buf))
        }
    }
}

pub fn decode_or_placeholder(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => BINARY_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit_all, init_repo, remove, write};

    fn changes_of(repo: &Repository, oid: git2::Oid) -> Vec<Change> {
        let commit = repo.find_commit(oid).unwrap();
        diff_for(repo, &commit).unwrap()
    }

    #[test]
    fn root_commit_lists_every_file_as_added() {
        let (_dir, repo) = init_repo();
        write(&repo, "README.md", "# demo\n");
        write(&repo, "src/lib.rs", "pub fn one() -> u8 { 1 }\n");
        let root = commit_all(&repo, "initial");

        let changes = changes_of(&repo, root);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.change_type == ChangeType::Added));
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert!(paths.contains(&"README.md"));
        assert!(paths.contains(&"src/lib.rs"));
    }

    #[test]
    fn binary_blob_yields_placeholder() {
        let (_dir, repo) = init_repo();
        write(&repo, "README.md", "# demo\n");
        commit_all(&repo, "initial");
        write(&repo, "logo.png", [0x89u8, b'P', b'N', b'G', 0, 0, 0, 13, 0xff, 0x00, 0xfe]);
        let oid = commit_all(&repo, "add logo");

        let changes = changes_of(&repo, oid);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "logo.png");
        assert_eq!(changes[0].diff, BINARY_PLACEHOLDER);
    }

    #[test]
    fn modified_and_deleted_files_are_tagged() {
        let (_dir, repo) = init_repo();
        write(&repo, "keep.txt", "one\n");
        write(&repo, "gone.txt", "bye\n");
        commit_all(&repo, "initial");
        write(&repo, "keep.txt", "one\ntwo\n");
        remove(&repo, "gone.txt");
        let oid = commit_all(&repo, "edit and delete");

        let changes = changes_of(&repo, oid);
        let kept = changes.iter().find(|c| c.path == "keep.txt").unwrap();
        assert_eq!(kept.change_type, ChangeType::Modified);
        assert!(kept.diff.contains("+two"));

        let gone = changes.iter().find(|c| c.path == "gone.txt").unwrap();
        assert_eq!(gone.change_type, ChangeType::Deleted);
        assert!(gone.diff.contains("-bye"));
    }

    #[test]
    fn renamed_file_reports_new_path() {
        let (_dir, repo) = init_repo();
        let body = "line\n".repeat(40);
        write(&repo, "old_name.txt", &body);
        commit_all(&repo, "initial");
        remove(&repo, "old_name.txt");
        write(&repo, "new_name.txt", &body);
        let oid = commit_all(&repo, "rename");

        let changes = changes_of(&repo, oid);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Renamed);
        assert_eq!(changes[0].path, "new_name.txt");
    }

    #[test]
    fn merge_commit_diffs_against_first_parent_only() {
        let (_dir, repo) = init_repo();
        write(&repo, "base.txt", "base\n");
        let base = commit_all(&repo, "base");
        write(&repo, "main.txt", "main\n");
        let main_tip = commit_all(&repo, "main work");

        // Side branch adds a file on top of base
        let base_commit = repo.find_commit(base).unwrap();
        let mut builder = repo.treebuilder(Some(&base_commit.tree().unwrap())).unwrap();
        let blob = repo.blob(b"side\n").unwrap();
        builder.insert("side.txt", blob, 0o100644).unwrap();
        let side_tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = git2::Signature::now("Tester", "tester@example.com").unwrap();
        let side = repo
            .commit(None, &sig, &sig, "side work", &side_tree, &[&base_commit])
            .unwrap();

        // Merge tree contains all three files
        let main_commit = repo.find_commit(main_tip).unwrap();
        let mut builder = repo.treebuilder(Some(&main_commit.tree().unwrap())).unwrap();
        builder.insert("side.txt", blob, 0o100644).unwrap();
        let merge_tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let side_commit = repo.find_commit(side).unwrap();
        let merge = repo
            .commit(Some("HEAD"), &sig, &sig, "merge", &merge_tree, &[&main_commit, &side_commit])
            .unwrap();

        let changes = changes_of(&repo, merge);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "side.txt");
        assert_eq!(changes[0].change_type, ChangeType::Added);
    }

    #[test]
    fn failed_entry_is_skipped_and_order_kept() {
        let change = |path: &str| Change {
            path: path.to_string(),
            change_type: ChangeType::Modified,
            diff: "@@ -1 +1 @@\n".to_string(),
        };
        let entries = vec![
            Ok(change("a.rs")),
            Err(DiffEntryError::Git(git2::Error::from_str("simulated failure"))),
            Ok(change("c.rs")),
        ];

        let changes = collect_changes(entries);
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["a.rs", "c.rs"]);
    }

    #[test]
    fn unreadable_blob_drops_only_that_file() {
        let (_dir, repo) = init_repo();
        write(&repo, "README.md", "# demo\n");
        commit_all(&repo, "initial");
        write(&repo, "a.txt", "alpha\n");
        write(&repo, "b.txt", "bravo\n");
        write(&repo, "c.txt", "charlie\n");
        let oid = commit_all(&repo, "three files");

        let blob = repo.blob(b"bravo\n").unwrap().to_string();
        let object = repo.path().join("objects").join(&blob[..2]).join(&blob[2..]);
        std::fs::remove_file(object).unwrap();

        // Fresh handle so the blob is not served from the object cache
        let reopened = Repository::open(repo.path()).unwrap();
        let changes = changes_of(&reopened, oid);
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "c.txt"]);
        assert!(changes[0].diff.contains("+alpha"));
    }

    #[test]
    fn invalid_utf8_decodes_to_placeholder() {
        assert_eq!(decode_or_placeholder(b"+ok\n"), "+ok\n");
        assert_eq!(decode_or_placeholder(&[0xff, 0xfe, 0x00]), BINARY_PLACEHOLDER);
    }
}
