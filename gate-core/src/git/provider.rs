use super::repo::Worktree;
use anyhow::Result;
use std::path::Path;

/// Everything capture and apply need from git.
///
/// Read queries return `None`/`false`/empty when git cannot answer; callers
/// treat that as "fact unavailable". Mutations propagate failures.
pub trait GitProvider: Send + Sync {
    /// `path` is the top level of a git working copy (main checkout or
    /// linked worktree), not merely a directory inside one.
    fn is_repo_root(&self, path: &Path) -> bool;
    /// The per-worktree git directory differs from the common one.
    fn is_linked_worktree(&self, path: &Path) -> bool;
    fn list_worktrees(&self, repo_path: &Path) -> Vec<Worktree>;
    fn current_branch(&self, path: &Path) -> Option<String>;
    fn head_commit(&self, path: &Path) -> Option<String>;
    fn remote_url(&self, path: &Path, remote: &str) -> Option<String>;
    fn has_uncommitted_changes(&self, path: &Path) -> bool;

    fn clone_repo(&self, url: &str, path: &Path) -> Result<()>;
    /// Check out `branch`, creating it at the current HEAD if it does not exist.
    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()>;
    fn reset_hard(&self, path: &Path, commit: &str) -> Result<()>;
    /// Leave HEAD detached at `commit` without moving any branch.
    fn checkout_detached(&self, path: &Path, commit: &str) -> Result<()>;
    /// Attach `worktree_path` to `main_path` at `branch`, creating the branch
    /// if it does not exist.
    fn add_worktree(&self, main_path: &Path, worktree_path: &Path, branch: &str) -> Result<()>;
}
