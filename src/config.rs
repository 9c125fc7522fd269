use std::env;
use std::path::PathBuf;

pub const DEFAULT_SLOT_KEY: &str = "jobboard_pro_data";

/// Runtime configuration, read from the environment (and a `.env` file if present).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory holding the database.
    /// Default: the platform data directory for "jobboard", or `.`.
    pub data_dir: PathBuf,

    /// Directory for the rolling log file. Default: `<data_dir>/logs`.
    pub log_dir: PathBuf,

    /// Name of the slot the snapshot is stored under.
    pub slot_key: String,
}

impl Config {
    /// Optional environment variables:
    /// - JOBBOARD_DATA_DIR
    /// - JOBBOARD_LOG_DIR
    /// - JOBBOARD_SLOT_KEY (default: jobboard_pro_data)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = set("JOBBOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let log_dir = set("JOBBOARD_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));
        let slot_key = set("JOBBOARD_SLOT_KEY").unwrap_or_else(|| DEFAULT_SLOT_KEY.to_string());

        Config {
            data_dir,
            log_dir,
            slot_key,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("jobboard.db")
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data directory, or the current directory
    match directories::ProjectDirs::from("", "", "jobboard") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("."),
    }
}
