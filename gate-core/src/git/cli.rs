use super::{parse_worktree_porcelain, provider::GitProvider, repo::Worktree};
use crate::constants::GIT_DIR_ENTRY;
use anyhow::Result;
use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

pub struct CliGitProvider;

impl GitProvider for CliGitProvider {
    fn is_repo_root(&self, path: &Path) -> bool {
        // Cheap filter before spawning git for every directory of the walk
        if !path.join(GIT_DIR_ENTRY).exists() {
            return false;
        }

        let Some(toplevel) = Self::query(path, &["rev-parse", "--show-toplevel"]) else {
            return false;
        };

        match (dunce::canonicalize(path), dunce::canonicalize(&toplevel)) {
            (Ok(dir), Ok(top)) => dir == top,
            _ => false,
        }
    }

    fn is_linked_worktree(&self, path: &Path) -> bool {
        let (Some(git_dir), Some(common_dir)) = (
            Self::query(path, &["rev-parse", "--git-dir"]),
            Self::query(path, &["rev-parse", "--git-common-dir"]),
        ) else {
            return false;
        };

        Self::resolve_git_path(path, &git_dir) != Self::resolve_git_path(path, &common_dir)
    }

    fn list_worktrees(&self, repo_path: &Path) -> Vec<Worktree> {
        let output = Command::new("git")
            .args(["worktree", "list", "--porcelain"])
            .current_dir(repo_path)
            .output();

        let Ok(output) = output else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }

        parse_worktree_porcelain(&String::from_utf8_lossy(&output.stdout))
    }

    fn current_branch(&self, path: &Path) -> Option<String> {
        Self::query(path, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn head_commit(&self, path: &Path) -> Option<String> {
        Self::query(path, &["rev-parse", "HEAD"])
    }

    fn remote_url(&self, path: &Path, remote: &str) -> Option<String> {
        Self::query(path, &["remote", "get-url", remote])
    }

    fn has_uncommitted_changes(&self, path: &Path) -> bool {
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(path)
            .output();

        match output {
            Ok(output) if output.status.success() => !output.stdout.trim_ascii().is_empty(),
            _ => false,
        }
    }

    fn clone_repo(&self, url: &str, path: &Path) -> Result<()> {
        let output = Command::new("git")
            .args(["clone", url])
            .arg(path)
            .output()?;

        Self::check("git clone", &output)
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["checkout", branch])
            .current_dir(path)
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        log::debug!(
            "checkout of {branch} in {} failed, creating it",
            path.display()
        );
        let output = Command::new("git")
            .args(["checkout", "-b", branch])
            .current_dir(path)
            .output()?;

        Self::check("git checkout -b", &output)
    }

    fn reset_hard(&self, path: &Path, commit: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["reset", "--hard", commit])
            .current_dir(path)
            .output()?;

        Self::check("git reset --hard", &output)
    }

    fn checkout_detached(&self, path: &Path, commit: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["checkout", "--detach", commit])
            .current_dir(path)
            .output()?;

        Self::check("git checkout --detach", &output)
    }

    fn add_worktree(&self, main_path: &Path, worktree_path: &Path, branch: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["worktree", "add", &worktree_path.to_string_lossy(), branch])
            .current_dir(main_path)
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        log::debug!(
            "git worktree add {} {branch} failed, retrying with a new branch",
            worktree_path.display()
        );
        let output = Command::new("git")
            .args([
                "worktree",
                "add",
                "-b",
                branch,
                &worktree_path.to_string_lossy(),
            ])
            .current_dir(main_path)
            .output()?;

        Self::check("git worktree add -b", &output)
    }
}

impl CliGitProvider {
    /// Trimmed stdout of a successful git command run in `dir`.
    fn query(dir: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if s.is_empty() { None } else { Some(s) }
    }

    fn check(what: &str, output: &Output) -> Result<()> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{what} failed: {}", stderr.trim());
        }
        Ok(())
    }

    /// `rev-parse --git-dir` style output is relative to `base` unless absolute.
    fn resolve_git_path(base: &Path, reported: &str) -> PathBuf {
        let path = Path::new(reported);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        dunce::canonicalize(&joined).unwrap_or(joined)
    }
}
