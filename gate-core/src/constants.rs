/// Name of the git metadata entry in a working copy (a directory for main
/// checkouts, a `gitdir:` pointer file for linked worktrees).
pub const GIT_DIR_ENTRY: &str = ".git";

/// Branch reported by `git rev-parse --abbrev-ref HEAD` when HEAD is detached.
pub const DETACHED_HEAD: &str = "HEAD";

pub const DEFAULT_REMOTE: &str = "origin";

/// Path recorded for the invocation root itself.
pub const ROOT_RECORD_PATH: &str = ".";

/// Number of revision id characters shown in progress lines.
pub const SHORT_COMMIT_LEN: usize = 12;
