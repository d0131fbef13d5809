use anyhow::{bail, Result};
use dirs::config_dir;
use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use toml_edit::easy as toml;

/// The default subdirectory to place the config file in.
const CONFIG_DIR: &str = "rawc";
/// The default name of the config file.
const CONFIG_NAME: &str = "config.toml";

lazy_static! {
    /// The global config singleton.
    static ref CONFIG: Mutex<Config> = Mutex::new(Config::new());
}

/// Gets the default path for the user's config file.
///
/// See the `dirs` crate documentation for exact details, but in general this
/// will be in `AppData/Roaming` on Windows, `Library/Application Support` on
/// macOS, and `$XDG_CONFIG_DIR` or `~/.config` on Linux.
fn user_config_path() -> PathBuf {
    let mut dir = config_dir().unwrap_or_else(|| Path::new(".").to_owned());
    dir.push(CONFIG_DIR);
    dir.push(CONFIG_NAME);
    dir
}

/// The global rawc configuration.
#[non_exhaustive]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// The path to save the configuration back to. Set on load, not stored
    /// in the file itself.
    #[serde(skip)]
    pub path: PathBuf,

    /// Settings which affect program behavior.
    pub settings: Settings,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: PathBuf) -> Self {
        let mut config = Self::new();
        config.path = path;
        config
    }

    /// Locks the mutex for the global configuration and returns it.
    pub fn get() -> MutexGuard<'static, Config> {
        CONFIG.lock().unwrap()
    }

    /// Loads the configuration from the default path.
    pub fn load(&mut self) -> Result<()> {
        self.load_from(user_config_path())
    }

    /// Loads the configuration from `path`, creating it with defaults if it
    /// doesn't exist yet.
    pub fn load_from(&mut self, path: PathBuf) -> Result<()> {
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            *self = toml::from_str(&contents)?;
            self.path = path;
            debug!("Configuration loaded from {}", self.path.display());
        } else {
            debug!("Config file does not exist, creating a new one");
            *self = Self::with_path(path);
            self.save()?;
        }
        Ok(())
    }

    /// Saves the configuration back to the path it was loaded from.
    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if self.path.as_os_str().is_empty() {
            bail!("No config file is loaded");
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        fs::write(&self.path, contents)?;
        debug!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}

/// Settings which affect program behavior.
#[non_exhaustive]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// The default mods directory to discover mods from if `--mods` isn't
    /// given on the command line.
    pub mods_dir: String,

    /// The default output directory to write compiled files to if
    /// `--output` isn't given.
    pub output_dir: String,
}
