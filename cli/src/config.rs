use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::PathBuf;

const DEFAULT_SEARCH_PAGE_SIZE: usize = 25;
const DEFAULT_BROWSE_PAGE_SIZE: usize = 10;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub search_page_size: usize,
    pub browse_page_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.data_dir.display()
            )
        })?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("NOSH_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "nosh")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };

        let db_path = data_dir.join("nosh.db");

        Ok(Config {
            db_path,
            data_dir,
            search_page_size: page_size(
                &lookup,
                "NOSH_SEARCH_PAGE_SIZE",
                DEFAULT_SEARCH_PAGE_SIZE,
            )?,
            browse_page_size: page_size(
                &lookup,
                "NOSH_BROWSE_PAGE_SIZE",
                DEFAULT_BROWSE_PAGE_SIZE,
            )?,
        })
    }
}

fn page_size(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let n: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid {key} '{raw}': expected a whole number"))?;
    if n == 0 {
        bail!("{key} must be at least 1");
    }
    Ok(n)
}
