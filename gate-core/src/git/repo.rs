use std::path::PathBuf;

/// One entry of `git worktree list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    /// The first entry of the listing owns the common git directory.
    pub is_main: bool,
}
