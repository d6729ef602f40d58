pub mod apply;
pub mod capture;
pub mod config;
pub mod constants;
pub mod git;
pub mod paths;
pub mod state;

// Re-export commonly used types at crate root
pub use apply::{ApplyOptions, ApplySummary, apply, replay_order};
pub use capture::{Checkout, capture, classify};
pub use config::Config;
pub use git::{CliGitProvider, GitProvider, Worktree};
pub use state::{Repository, State};
