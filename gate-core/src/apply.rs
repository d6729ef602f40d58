//! Replay of a captured [`State`] onto a directory tree.
//!
//! Main checkouts are cloned before any worktree is attached, so a worktree's
//! main checkout always exists by the time it is needed. Paths that already
//! exist are left untouched, which makes replaying the same state twice safe.
//! A failing repository is reported and the remaining ones are still applied.

use anyhow::{Context, Result};
use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    constants::{DETACHED_HEAD, SHORT_COMMIT_LEN},
    git::GitProvider,
    paths::{normalize, relative_path, to_record_path},
    state::{Repository, State},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Report what would be created without touching the filesystem.
    pub dry_run: bool,
}

/// Per-repository outcome counts of one [`apply`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Created,
    Skipped,
}

/// Main checkouts first, then worktrees; by path within each group.
pub fn replay_order(repositories: &[Repository]) -> Vec<&Repository> {
    let mut ordered: Vec<&Repository> = repositories.iter().collect();
    ordered.sort_by(|a, b| {
        a.is_worktree
            .cmp(&b.is_worktree)
            .then_with(|| a.path.cmp(&b.path))
    });
    ordered
}

/// Materialize every repository of `state` under `root`.
///
/// Progress, skip warnings and per-repository errors go to `diagnostics`.
/// Only a failure to write diagnostics aborts the run.
pub fn apply(
    state: &State,
    root: &Path,
    git: &dyn GitProvider,
    options: ApplyOptions,
    diagnostics: &mut dyn Write,
) -> Result<ApplySummary> {
    let mut replay = Replay {
        root,
        git,
        options,
        diagnostics,
        planned: HashSet::new(),
    };
    let mut summary = ApplySummary::default();

    for repo in replay_order(&state.repositories) {
        match replay.repository(repo) {
            Ok(Outcome::Created) => summary.created += 1,
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Err(err) => {
                log::warn!("failed to apply {}: {err:#}", repo.path);
                writeln!(replay.diagnostics, "error: {}: {err:#}", repo.path)?;
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "apply finished: {} created, {} skipped, {} failed",
        summary.created,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

struct Replay<'a> {
    root: &'a Path,
    git: &'a dyn GitProvider,
    options: ApplyOptions,
    diagnostics: &'a mut dyn Write,
    /// Targets a dry run would have created.
    planned: HashSet<PathBuf>,
}

impl Replay<'_> {
    fn repository(&mut self, repo: &Repository) -> Result<Outcome> {
        let target = normalize(&repo.target(self.root));
        if target.exists() {
            writeln!(self.diagnostics, "warning: {} already exists, skipping", repo.path)?;
            return Ok(Outcome::Skipped);
        }

        if repo.is_worktree {
            self.worktree(repo, &target)?;
        } else {
            self.main_checkout(repo, &target)?;
        }

        if self.options.dry_run {
            self.planned.insert(target);
        }
        Ok(Outcome::Created)
    }

    fn main_checkout(&mut self, repo: &Repository, target: &Path) -> Result<()> {
        let Some(url) = repo.remote_url.as_deref().filter(|url| !url.is_empty()) else {
            anyhow::bail!("no remote URL for main checkout");
        };

        if self.options.dry_run {
            writeln!(self.diagnostics, "would clone {} from {url}", repo.path)?;
            return Ok(());
        }

        writeln!(self.diagnostics, "cloning {} from {url}", repo.path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).context("failed to create parent directory")?;
        }
        self.git.clone_repo(url, target).context("failed to clone")?;
        self.pin(repo, target).context("failed to checkout")?;
        self.checked_out(repo)
    }

    fn worktree(&mut self, repo: &Repository, target: &Path) -> Result<()> {
        let Some(main_checkout_path) = repo
            .main_checkout_path
            .as_deref()
            .filter(|path| !path.is_empty())
        else {
            anyhow::bail!("no main checkout path for worktree");
        };

        // Relative to the worktree itself, not to the root
        let main_checkout_path = Path::new(main_checkout_path);
        let main_path = if main_checkout_path.is_absolute() {
            normalize(main_checkout_path)
        } else {
            normalize(&target.join(main_checkout_path))
        };
        let shown = to_record_path(&relative_path(self.root, &main_path));

        if !main_path.exists() && !self.planned.contains(&main_path) {
            anyhow::bail!("main checkout {shown} does not exist");
        }

        if self.options.dry_run {
            writeln!(self.diagnostics, "would add worktree {} from {shown}", repo.path)?;
            return Ok(());
        }

        writeln!(self.diagnostics, "adding worktree {} from {shown}", repo.path)?;
        let branch = if repo.branch.is_empty() {
            DETACHED_HEAD
        } else {
            repo.branch.as_str()
        };
        self.git
            .add_worktree(&main_path, target, branch)
            .context("failed to add worktree")?;
        if !repo.commit.is_empty() {
            self.git
                .reset_hard(target, &repo.commit)
                .context("failed to reset worktree")?;
        }
        self.checked_out(repo)
    }

    /// Put a fresh clone on the recorded branch and commit.
    fn pin(&self, repo: &Repository, target: &Path) -> Result<()> {
        if repo.is_detached() {
            // The default branch of the clone must not move
            if !repo.commit.is_empty() {
                self.git.checkout_detached(target, &repo.commit)?;
            }
            return Ok(());
        }
        if !repo.branch.is_empty() {
            self.git.checkout_branch(target, &repo.branch)?;
        }
        if !repo.commit.is_empty() {
            self.git.reset_hard(target, &repo.commit)?;
        }
        Ok(())
    }

    fn checked_out(&mut self, repo: &Repository) -> Result<()> {
        writeln!(
            self.diagnostics,
            "  checked out {} at {}",
            repo.branch,
            short_commit(&repo.commit)
        )?;
        Ok(())
    }
}

fn short_commit(commit: &str) -> &str {
    commit
        .char_indices()
        .nth(SHORT_COMMIT_LEN)
        .map_or(commit, |(idx, _)| &commit[..idx])
}
