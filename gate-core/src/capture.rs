//! Discovery of every git working copy reachable from a root directory.
//!
//! The scan runs in two directions: up through the root's ancestors, so a
//! capture started inside a checkout still records it, and down through the
//! whole subtree, continuing into each working copy so nested ones are found
//! too. Results are keyed by their path relative to the root, which both
//! deduplicates the two scans and yields the sorted output order.

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::Config,
    constants::GIT_DIR_ENTRY,
    git::GitProvider,
    paths::{relative_path, to_record_path},
    state::{Repository, State},
};

/// How a working copy relates to the repository's other working copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkout {
    Main,
    /// A linked worktree. The path leads from the worktree to its main checkout.
    Worktree { main_checkout_path: String },
}

/// Snapshot every repository above and below `root`.
///
/// Warnings about dirty working trees are written to `diagnostics`.
pub fn capture(
    root: &Path,
    config: &Config,
    git: &dyn GitProvider,
    diagnostics: &mut dyn Write,
) -> Result<State> {
    let root = dunce::canonicalize(root)
        .with_context(|| format!("failed to resolve {}", root.display()))?;
    log::info!("capturing repositories around {}", root.display());

    let mut discovery = Discovery {
        root,
        config,
        git,
        diagnostics,
        repos: BTreeMap::new(),
    };
    discovery.scan_upward()?;
    discovery.scan_downward()?;

    let repositories: Vec<Repository> = discovery.repos.into_values().collect();
    log::info!("captured {} repositories", repositories.len());
    Ok(State { repositories })
}

/// Decide whether the working copy at `path` is a main checkout or a worktree.
///
/// A working copy whose git dir is the common git dir is a main checkout.
/// Otherwise the main entry of its worktree listing is the main checkout.
pub fn classify(git: &dyn GitProvider, path: &Path) -> Checkout {
    if !git.is_linked_worktree(path) {
        return Checkout::Main;
    }

    let worktrees = git.list_worktrees(path);
    let Some(main) = worktrees.iter().find(|wt| wt.is_main) else {
        log::warn!(
            "{} looks like a linked worktree but its worktree list is unavailable",
            path.display()
        );
        return Checkout::Main;
    };

    let own = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let main_path = dunce::canonicalize(&main.path).unwrap_or_else(|_| main.path.clone());
    if main_path == own {
        return Checkout::Main;
    }

    Checkout::Worktree {
        main_checkout_path: to_record_path(&relative_path(&own, &main_path)),
    }
}

struct Discovery<'a> {
    root: PathBuf,
    config: &'a Config,
    git: &'a dyn GitProvider,
    diagnostics: &'a mut dyn Write,
    repos: BTreeMap<String, Repository>,
}

impl Discovery<'_> {
    fn scan_upward(&mut self) -> Result<()> {
        let mut current = self.root.clone();
        while let Some(parent) = current.parent().map(Path::to_path_buf) {
            if self.git.is_repo_root(&parent) {
                self.register(&parent)?;
            }
            current = parent;
        }
        Ok(())
    }

    fn scan_downward(&mut self) -> Result<()> {
        let config = self.config;
        let skip_dirs = &config.capture.skip_dirs;
        let walker = WalkDir::new(self.root.clone())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_pruned(entry, skip_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };

            if entry.file_type().is_dir() && self.git.is_repo_root(entry.path()) {
                // Keep walking below it: nested repositories are recorded too
                self.register(entry.path())?;
            }
        }
        Ok(())
    }

    fn register(&mut self, path: &Path) -> Result<()> {
        let rel = to_record_path(&relative_path(&self.root, path));
        if self.repos.contains_key(&rel) {
            return Ok(());
        }

        if self.git.has_uncommitted_changes(path) {
            writeln!(self.diagnostics, "warning: {rel} has uncommitted changes")?;
        }

        let checkout = classify(self.git, path);
        let branch = self.git.current_branch(path).unwrap_or_else(|| {
            log::warn!("could not read the branch of {rel}");
            String::new()
        });
        let commit = self.git.head_commit(path).unwrap_or_else(|| {
            log::warn!("could not read the HEAD commit of {rel}");
            String::new()
        });

        let repo = match checkout {
            Checkout::Main => Repository {
                path: rel.clone(),
                remote_url: self
                    .git
                    .remote_url(path, &self.config.remote)
                    .filter(|url| !url.is_empty()),
                branch,
                commit,
                is_worktree: false,
                main_checkout_path: None,
            },
            Checkout::Worktree { main_checkout_path } => Repository {
                path: rel.clone(),
                remote_url: None,
                branch,
                commit,
                is_worktree: true,
                main_checkout_path: Some(main_checkout_path),
            },
        };

        log::debug!("registered {rel} (worktree: {})", repo.is_worktree);
        self.repos.insert(rel, repo);
        Ok(())
    }
}

fn is_pruned(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == GIT_DIR_ENTRY || skip_dirs.iter().any(|skip| *skip == name)
}
