//! Configuration management for reccall.
//!
//! Reads `~/.reccall/settings.toml`, creates it with defaults on first run.
//! Environment variables (`RECCALL_*`) override the file, CLI flags override both.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const ROOT_DIR_NAME: &str = ".reccall";
const STORE_FILE_NAME: &str = ".reccall.json";
const STARTER_PACK_DIR_NAME: &str = "starter-pack";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Shortcut store location. Defaults to `~/.reccall.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<String>,
    /// Directory holding `manifest.json` and the bundled recipes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter_pack_dir: Option<String>,
    /// Seed an empty store from the starter pack on first read.
    pub bootstrap_starter_pack: bool,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_file: None,
            starter_pack_dir: None,
            bootstrap_starter_pack: true,
            http_timeout_secs: 30,
        }
    }
}

impl Settings {
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = env::var("RECCALL_STORE_FILE") {
            self.store_file = Some(v);
        }
        if let Ok(v) = env::var("RECCALL_STARTER_PACK_DIR") {
            self.starter_pack_dir = Some(v);
        }
        if let Ok(v) = env::var("RECCALL_BOOTSTRAP_STARTER_PACK") {
            self.bootstrap_starter_pack = parse_bool(&v)
                .ok_or_else(|| anyhow!("RECCALL_BOOTSTRAP_STARTER_PACK must be true or false"))?;
        }
        if let Ok(v) = env::var("RECCALL_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| anyhow!("RECCALL_HTTP_TIMEOUT_SECS must be a positive integer"))?;
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub home_dir: PathBuf,
    pub root_dir: PathBuf,
    pub settings_path: PathBuf,
}

impl Config {
    pub fn load_with_overrides(store_file: Option<String>) -> Result<Self> {
        let home_dir = home::home_dir().ok_or_else(|| anyhow!("failed to resolve home dir"))?;
        let root_dir = home_dir.join(ROOT_DIR_NAME);
        fs::create_dir_all(&root_dir)?;
        let settings_path = root_dir.join("settings.toml");

        let mut settings = if settings_path.exists() {
            let text = fs::read_to_string(&settings_path)?;
            toml::from_str::<Settings>(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %settings_path.display(), error = %e, "invalid settings file, using defaults");
                Settings::default()
            })
        } else {
            let s = Settings::default();
            let text = toml::to_string_pretty(&s)?;
            fs::write(&settings_path, text)?;
            s
        };

        settings.apply_env_overrides()?;
        if let Some(f) = store_file {
            settings.store_file = Some(f);
        }

        Ok(Self {
            settings,
            home_dir,
            root_dir,
            settings_path,
        })
    }

    /// Build a config rooted at an arbitrary directory with default settings.
    /// Nothing is written until `save` is called.
    pub fn rooted_at(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        let root_dir = home_dir.join(ROOT_DIR_NAME);
        let settings_path = root_dir.join("settings.toml");
        Self {
            settings: Settings::default(),
            home_dir,
            root_dir,
            settings_path,
        }
    }

    pub fn save(&self) -> Result<()> {
        let text = toml::to_string_pretty(&self.settings)?;
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.settings_path, text)?;
        Ok(())
    }

    pub fn store_file(&self) -> PathBuf {
        match &self.settings.store_file {
            Some(p) => expand_home(p, &self.home_dir),
            None => self.home_dir.join(STORE_FILE_NAME),
        }
    }

    pub fn repo_config_file(&self) -> PathBuf {
        self.root_dir.join("repo-config.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root_dir.join("log")
    }

    /// Cache directory used when the repo config does not name one.
    pub fn default_cache_dir(&self) -> PathBuf {
        directories::ProjectDirs::from("ai", "reccaller", "reccall")
            .map(|dirs| dirs.cache_dir().join("repo-cache"))
            .unwrap_or_else(|| self.root_dir.join("cache"))
    }

    /// Resolve the starter pack directory: explicit setting, then a
    /// `starter-pack/` next to the executable, then the one in the source tree.
    pub fn starter_pack_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.settings.starter_pack_dir {
            return Some(expand_home(dir, &self.home_dir));
        }
        let beside_exe = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join(STARTER_PACK_DIR_NAME)));
        if let Some(dir) = beside_exe.filter(|d| d.is_dir()) {
            return Some(dir);
        }
        let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join(STARTER_PACK_DIR_NAME);
        bundled.is_dir().then_some(bundled)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.http_timeout_secs.max(1))
    }
}

/// Expand a leading `~/` against the given home directory.
pub fn expand_home(p: &str, home_dir: &Path) -> PathBuf {
    match p.strip_prefix("~/") {
        Some(rest) => home_dir.join(rest),
        None if p == "~" => home_dir.to_path_buf(),
        None => PathBuf::from(p),
    }
}
