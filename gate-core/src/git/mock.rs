use super::{provider::GitProvider, repo::Worktree};
use anyhow::Result;
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Facts for one working copy known to [`MockGitProvider`].
#[derive(Debug, Clone, Default)]
pub struct MockRepo {
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub remotes: HashMap<String, String>,
    pub dirty: bool,
    pub linked: bool,
    pub worktrees: Vec<Worktree>,
}

/// A mutation requested through [`GitProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Clone { url: String, path: PathBuf },
    Checkout { path: PathBuf, branch: String },
    Reset { path: PathBuf, commit: String },
    Detach { path: PathBuf, commit: String },
    AddWorktree {
        main_path: PathBuf,
        worktree_path: PathBuf,
        branch: String,
    },
}

/// In-memory git. Read queries are answered from `repos`; mutations are
/// recorded in `calls` and create the target directory on disk so that the
/// existence checks done by apply behave as with real git.
#[derive(Default)]
pub struct MockGitProvider {
    pub repos: HashMap<PathBuf, MockRepo>,
    pub calls: Mutex<Vec<MockCall>>,
    /// Paths whose clone or worktree add fails.
    pub failing_paths: HashSet<PathBuf>,
}

impl MockGitProvider {
    pub fn with_repo(mut self, path: impl Into<PathBuf>, repo: MockRepo) -> Self {
        self.repos.insert(path.into(), repo);
        self
    }

    pub fn failing_at(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing_paths.insert(path.into());
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn repo(&self, path: &Path) -> Option<&MockRepo> {
        self.repos.get(path)
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn materialize(&self, what: &str, path: &Path) -> Result<()> {
        if self.failing_paths.contains(path) {
            anyhow::bail!("{what} failed: mock failure at {}", path.display());
        }
        fs::create_dir_all(path)?;
        Ok(())
    }
}

impl GitProvider for MockGitProvider {
    fn is_repo_root(&self, path: &Path) -> bool {
        self.repos.contains_key(path)
    }

    fn is_linked_worktree(&self, path: &Path) -> bool {
        self.repo(path).is_some_and(|r| r.linked)
    }

    fn list_worktrees(&self, repo_path: &Path) -> Vec<Worktree> {
        self.repo(repo_path)
            .map(|r| r.worktrees.clone())
            .unwrap_or_default()
    }

    fn current_branch(&self, path: &Path) -> Option<String> {
        self.repo(path).and_then(|r| r.branch.clone())
    }

    fn head_commit(&self, path: &Path) -> Option<String> {
        self.repo(path).and_then(|r| r.commit.clone())
    }

    fn remote_url(&self, path: &Path, remote: &str) -> Option<String> {
        self.repo(path).and_then(|r| r.remotes.get(remote).cloned())
    }

    fn has_uncommitted_changes(&self, path: &Path) -> bool {
        self.repo(path).is_some_and(|r| r.dirty)
    }

    fn clone_repo(&self, url: &str, path: &Path) -> Result<()> {
        self.record(MockCall::Clone {
            url: url.to_string(),
            path: path.to_path_buf(),
        });
        self.materialize("git clone", path)
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()> {
        self.record(MockCall::Checkout {
            path: path.to_path_buf(),
            branch: branch.to_string(),
        });
        Ok(())
    }

    fn reset_hard(&self, path: &Path, commit: &str) -> Result<()> {
        self.record(MockCall::Reset {
            path: path.to_path_buf(),
            commit: commit.to_string(),
        });
        Ok(())
    }

    fn checkout_detached(&self, path: &Path, commit: &str) -> Result<()> {
        self.record(MockCall::Detach {
            path: path.to_path_buf(),
            commit: commit.to_string(),
        });
        Ok(())
    }

    fn add_worktree(&self, main_path: &Path, worktree_path: &Path, branch: &str) -> Result<()> {
        self.record(MockCall::AddWorktree {
            main_path: main_path.to_path_buf(),
            worktree_path: worktree_path.to_path_buf(),
            branch: branch.to_string(),
        });
        self.materialize("git worktree add", worktree_path)
    }
}
