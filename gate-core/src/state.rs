use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::DETACHED_HEAD;

/// One git working copy, either a main checkout or a linked worktree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Location relative to the capture root, `/`-separated. `.` is the root.
    pub path: String,

    /// Only recorded for main checkouts; worktrees reach their remote through
    /// the main checkout.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_non_empty"
    )]
    pub remote_url: Option<String>,

    /// Checked-out branch, or `HEAD` when detached.
    pub branch: String,

    pub commit: String,

    #[serde(default)]
    pub is_worktree: bool,

    /// Location of the main checkout relative to this worktree's own path.
    /// Always serialized, as `null` for main checkouts.
    #[serde(default)]
    pub main_checkout_path: Option<String>,
}

impl Repository {
    pub fn is_detached(&self) -> bool {
        self.branch == DETACHED_HEAD
    }

    /// Target location of this record under `root`.
    pub fn target(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }
}

/// A full snapshot of every repository found under one capture root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub repositories: Vec<Repository>,
}

impl State {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("failed to parse JSON")
    }

    /// Pretty-printed with two-space indentation and a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self).context("failed to encode state")?;
        out.push('\n');
        Ok(out)
    }
}

fn deserialize_non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
