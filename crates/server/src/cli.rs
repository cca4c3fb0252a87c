use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;
use pantry_core::AppConfig;

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "food_items.db";

#[derive(Debug, Parser)]
#[command(name = "pantry-server")]
#[command(author, version, about = "Food inventory, receipt import and menu suggestions over HTTP")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "PANTRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on; overrides the configuration file and PANTRY_BIND
    #[arg(short, long)]
    pub bind: Option<String>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pantry", "Pantry")
}

/// Where the SQLite file lives when the configuration names none.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let Some(dirs) = project_dirs() else {
        return Ok(PathBuf::from(DATABASE_FILE));
    };
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    Ok(data_dir.join(DATABASE_FILE))
}

impl Cli {
    /// The file the configuration is read from: the explicit path if given,
    /// otherwise the platform default when it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            project_dirs()
                .map(|d| d.config_dir().join(CONFIG_FILE))
                .filter(|path| path.exists())
        })
    }

    /// Load the configuration file, apply environment and flag overrides, and validate.
    ///
    /// An explicitly named file must exist; the platform default is optional.
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        self.load_config_with(|key| std::env::var(key).ok())
    }

    /// [`Cli::load_config`] with environment lookups served by `lookup`.
    pub fn load_config_with<F>(&self, lookup: F) -> anyhow::Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path() {
            Some(path) => AppConfig::load(&path)?,
            None => AppConfig::default(),
        };

        config.apply_overrides(lookup);
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
