//! Throw-away repositories for tests.

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;

pub fn init_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Tester").unwrap();
        config.set_str("user.email", "tester@example.com").unwrap();
    }
    // Pin the initial branch name regardless of the host's init.defaultBranch
    repo.set_head("refs/heads/main").unwrap();
    (dir, repo)
}

pub fn write(repo: &Repository, rel: &str, contents: impl AsRef<[u8]>) {
    let path = repo.workdir().unwrap().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn remove(repo: &Repository, rel: &str) {
    fs::remove_file(repo.workdir().unwrap().join(rel)).unwrap();
}

pub fn stage(repo: &Repository, rel: &str) {
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(rel)).unwrap();
    index.write().unwrap();
}

/// Stages the whole working tree (including deletions) and commits it on HEAD.
pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index.add_all(["."], IndexAddOption::DEFAULT, None).unwrap();
    index.update_all(["."], None).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Tester", "tester@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
}

/// Creates `refs/heads/<name>` at `oid` and checks it out.
pub fn checkout_new_branch(repo: &Repository, name: &str, oid: Oid) {
    let commit = repo.find_commit(oid).unwrap();
    repo.branch(name, &commit, false).unwrap();
    repo.set_head(&format!("refs/heads/{name}")).unwrap();
    repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))
        .unwrap();
}

pub fn set_reference(repo: &Repository, full_name: &str, oid: Oid) {
    repo.reference(full_name, oid, true, "test").unwrap();
}
