use anyhow::{Context, Result};
use directories::ProjectDirs;
use encoding_rs::Encoding;
use std::path::PathBuf;

use eiyo_core::dataset::encoding_for_label;

pub const DATA_ENV: &str = "EIYO_DATA";
pub const RECIPE_APP_ID_ENV: &str = "RAKUTEN_APP_ID";

pub struct Config {
    pub data_path: PathBuf,
    pub encoding: &'static Encoding,
    pub recipe_app_id: Option<String>,
}

impl Config {
    /// Resolve the dataset path (`--data`, then `EIYO_DATA`, then the
    /// platform data directory), the dataset encoding, and the optional
    /// recipe API credential.
    pub fn load(data_override: Option<PathBuf>, encoding_label: &str) -> Result<Self> {
        let data_path = match data_override.or_else(|| env_value(DATA_ENV).map(PathBuf::from)) {
            Some(path) => path,
            None => {
                let proj_dirs = ProjectDirs::from("", "", "eiyo")
                    .context("Could not determine home directory")?;
                proj_dirs.data_dir().join("data.csv")
            }
        };

        let encoding = encoding_for_label(encoding_label)?;

        Ok(Config {
            data_path,
            encoding,
            recipe_app_id: env_value(RECIPE_APP_ID_ENV),
        })
    }
}

/// An environment variable, treating empty values as unset.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
