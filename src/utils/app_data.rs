use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "erx";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the stage and index executables.
    /// If None, `build/` next to the running executable is used.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,

    /// Resource-usage reporter wrapped around benchmark runs
    #[serde(default = "default_time_program")]
    pub time_program: PathBuf,

    /// Deadline for a single benchmark run
    #[serde(default = "default_bench_timeout_secs")]
    pub bench_timeout_secs: u64,
}

fn default_time_program() -> PathBuf {
    PathBuf::from("/usr/bin/time")
}

fn default_bench_timeout_secs() -> u64 {
    2 * 24 * 60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            time_program: default_time_program(),
            bench_timeout_secs: default_bench_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: AppConfig = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Configured executable directory, else `build/` beside this binary
    pub fn effective_bin_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.bin_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe().context("Could not locate the running executable")?;
        let parent = exe
            .parent()
            .context("Running executable has no parent directory")?;
        Ok(parent.join("build"))
    }

    pub fn bench_timeout(&self) -> Duration {
        Duration::from_secs(self.bench_timeout_secs)
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
