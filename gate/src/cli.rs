use gate_core::{
    apply::{ApplyOptions, ApplySummary, apply},
    capture::capture,
    config::Config,
    git::GitProvider,
    state::State,
};
use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Clone)]
pub struct CliError {
    message: String,
    code: i32,
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 1,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 2,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(value: anyhow::Error) -> Self {
        Self::system(format!("{value:#}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureArgs {
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyArgs {
    pub input: Option<PathBuf>,
    pub dry_run: bool,
}

/// The directory both pipelines work relative to.
pub fn resolve_root(root: Option<&Path>) -> CliResult<PathBuf> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| CliError::system(format!("failed to get current directory: {e}")))?,
    };
    dunce::canonicalize(&root)
        .map_err(|e| CliError::user(format!("cannot use {} as root: {e}", root.display())))
}

pub fn cmd_capture(
    root: &Path,
    config: &Config,
    git: &dyn GitProvider,
    args: &CaptureArgs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> CliResult<()> {
    let state = capture(root, config, git, stderr)?;
    let json = state.to_json()?;

    match &args.output {
        Some(path) => fs::write(path, json).map_err(|e| {
            CliError::system(format!("failed to write {}: {e}", path.display()))
        })?,
        None => stdout
            .write_all(json.as_bytes())
            .map_err(|e| CliError::system(format!("failed to write output: {e}")))?,
    }

    Ok(())
}

/// Replay a state read from `args.input` (or `stdin`). Failures of single
/// repositories are reported on `stderr` and do not make this return an error.
pub fn cmd_apply(
    root: &Path,
    git: &dyn GitProvider,
    args: &ApplyArgs,
    stdin: &mut dyn Read,
    stderr: &mut dyn Write,
) -> CliResult<ApplySummary> {
    let input = match &args.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| CliError::system(format!("failed to read {}: {e}", path.display())))?,
        None => {
            let mut input = String::new();
            stdin
                .read_to_string(&mut input)
                .map_err(|e| CliError::system(format!("failed to read stdin: {e}")))?;
            input
        }
    };

    let state = State::from_json(&input).map_err(|e| CliError::user(format!("{e:#}")))?;
    log::info!(
        "applying {} repositories under {}",
        state.repositories.len(),
        root.display()
    );

    let options = ApplyOptions {
        dry_run: args.dry_run,
    };
    Ok(apply(&state, root, git, options, stderr)?)
}

pub fn print_error(error: &CliError) {
    eprintln!("error: {}", error.message());
}
