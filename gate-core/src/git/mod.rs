pub mod cli;
pub mod mock;
pub mod provider;
pub mod repo;

pub use cli::CliGitProvider;
pub use provider::GitProvider;
pub use repo::Worktree;

/// Parse `git worktree list --porcelain` output into worktrees.
///
/// Only the `worktree` lines matter here; the first entry is the main checkout.
pub fn parse_worktree_porcelain(output: &str) -> Vec<Worktree> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("worktree "))
        .enumerate()
        .map(|(index, path)| Worktree {
            path: std::path::PathBuf::from(path),
            is_main: index == 0,
        })
        .collect()
}
