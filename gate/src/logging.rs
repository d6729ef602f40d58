use std::path::PathBuf;

const APP_NAME: &str = "gate";
const LOG_FILE_NAME: &str = "gate.log";

pub const DEFAULT_LOG_LEVEL: &str = "warn";

pub fn cache_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Ok(xdg_cache_home) = std::env::var("XDG_CACHE_HOME")
            && !xdg_cache_home.is_empty()
        {
            return Some(PathBuf::from(xdg_cache_home).join(APP_NAME));
        }
        dirs::home_dir().map(|home| home.join(".cache").join(APP_NAME))
    }
    #[cfg(windows)]
    {
        Some(
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME),
        )
    }
}

pub fn default_log_file() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(LOG_FILE_NAME))
}

pub fn setup_logging(level: log::LevelFilter) -> anyhow::Result<()> {
    let Some(log_file) = default_log_file() else {
        anyhow::bail!("unable to determine a cache directory for the log file");
    };
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    simple_log::file(log_file.to_string_lossy().into_owned(), level, 10, 10)
        .map_err(|e| anyhow::anyhow!(e))?;
    log::info!("gate logging initialised (level={level})");
    Ok(())
}
