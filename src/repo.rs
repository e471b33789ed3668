//! Remote recipe repository client with a per-URL on-disk TTL cache.
//!
//! A repository is any HTTP base URL serving `manifest.json` and the recipe
//! files it lists. Listings are cached as `<cacheDir>/<sha256(url)>.json`.

use crate::{
    config::Config,
    error::{RepoError, RepoResult},
    recipe::{Manifest, Recipe, validate_recipe},
    service::{InstallOutcome, ShortcutService},
};
use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub const DEFAULT_REPO: &str = "https://raw.githubusercontent.com/reccaller-ai/reccall-recipes/main";
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Persisted repository settings (`~/.reccall/repo-config.json`).
/// Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    pub default_repo: String,
    pub cache_dir: PathBuf,
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialRepoConfig {
    default_repo: Option<String>,
    cache_dir: Option<PathBuf>,
    enabled: Option<bool>,
}

impl RepoConfig {
    pub fn defaults(cfg: &Config) -> Self {
        Self {
            default_repo: DEFAULT_REPO.to_string(),
            cache_dir: cfg.default_cache_dir(),
            enabled: true,
        }
    }

    /// Read the repo config, creating it with defaults on first use.
    pub fn load(cfg: &Config) -> Result<Self> {
        let path = cfg.repo_config_file();
        let defaults = Self::defaults(cfg);
        if !path.exists() {
            defaults.save(&path)?;
            return Ok(defaults);
        }
        let text = fs::read_to_string(&path)?;
        let partial = serde_json::from_str::<PartialRepoConfig>(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "invalid repo config, using defaults");
            PartialRepoConfig::default()
        });
        Ok(Self {
            default_repo: partial.default_repo.unwrap_or(defaults.default_repo),
            cache_dir: partial.cache_dir.unwrap_or(defaults.cache_dir),
            enabled: partial.enabled.unwrap_or(defaults.enabled),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The repository to use: an explicit URL, else the configured default.
    pub fn resolve_repo<'a>(&'a self, repo: Option<&'a str>) -> &'a str {
        repo.filter(|r| !r.trim().is_empty()).unwrap_or(self.default_repo.as_str())
    }
}

/// One cached repository listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub recipes: Vec<Recipe>,
}

impl CacheEntry {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            timestamp: now_millis(),
            recipes,
        }
    }

    /// Entries stamped in the future are stale.
    pub fn is_fresh(&self, now_ms: u64, ttl: Duration) -> bool {
        self.timestamp <= now_ms && now_ms - self.timestamp < ttl.as_millis() as u64
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn base_url(repo_url: &str) -> &str {
    repo_url.trim().trim_end_matches('/')
}

pub struct RepoClient {
    http: Client,
    cache_dir: PathBuf,
    ttl: Duration,
}

impl RepoClient {
    pub fn new(cache_dir: impl Into<PathBuf>, timeout: Duration) -> RepoResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reccall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepoError::Transport {
                url: String::new(),
                source: e,
            })?;
        Ok(Self {
            http,
            cache_dir: cache_dir.into(),
            ttl: CACHE_TTL,
        })
    }

    pub fn from_config(cfg: &Config, repo_cfg: &RepoConfig) -> RepoResult<Self> {
        if !repo_cfg.enabled {
            return Err(RepoError::Disabled);
        }
        Self::new(repo_cfg.cache_dir.clone(), cfg.http_timeout())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache file for a repository URL.
    pub fn cache_file(&self, repo_url: &str) -> PathBuf {
        let digest = Sha256::digest(base_url(repo_url).as_bytes());
        self.cache_dir.join(format!("{digest:x}.json"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> RepoResult<T> {
        tracing::debug!(url, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RepoError::Transport { url: url.to_string(), source: e })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RepoError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| RepoError::Transport { url: url.to_string(), source: e })?;
        serde_json::from_str(&body).map_err(|e| RepoError::Malformed { url: url.to_string(), source: e })
    }

    pub async fn fetch_manifest(&self, repo_url: &str) -> RepoResult<Manifest> {
        self.get_json(&format!("{}/manifest.json", base_url(repo_url))).await
    }

    /// Fetch the manifest and every recipe it lists. Recipes that fail to
    /// fetch or parse are skipped.
    pub async fn list_recipes(&self, repo_url: &str) -> RepoResult<Vec<Recipe>> {
        let manifest = self.fetch_manifest(repo_url).await?;
        let mut recipes = Vec::with_capacity(manifest.recipes.len());
        for entry in &manifest.recipes {
            let url = format!("{}/{}", base_url(repo_url), entry.file.trim_start_matches('/'));
            match self.get_json::<Recipe>(&url).await {
                Ok(recipe) => recipes.push(recipe.with_manifest_metadata(entry)),
                Err(e) => tracing::warn!(file = %entry.file, error = %e, "skipping repository recipe"),
            }
        }
        tracing::info!(repo = %repo_url, recipes = recipes.len(), "repository listing fetched");
        Ok(recipes)
    }

    fn read_cache(&self, repo_url: &str) -> Option<CacheEntry> {
        let path = self.cache_file(repo_url);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    pub fn write_cache(&self, repo_url: &str, entry: &CacheEntry) -> RepoResult<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let text = serde_json::to_string_pretty(entry).map_err(|e| RepoError::Malformed {
            url: repo_url.to_string(),
            source: e,
        })?;
        fs::write(self.cache_file(repo_url), text)?;
        Ok(())
    }

    /// Listing from a fresh cache entry when available, otherwise fetched and cached.
    pub async fn list_recipes_cached(&self, repo_url: &str) -> RepoResult<Vec<Recipe>> {
        if let Some(entry) = self.read_cache(repo_url) {
            if entry.is_fresh(now_millis(), self.ttl) {
                tracing::debug!(repo = %repo_url, "repository cache hit");
                return Ok(entry.recipes);
            }
        }
        let recipes = self.list_recipes(repo_url).await?;
        if let Err(e) = self.write_cache(repo_url, &CacheEntry::new(recipes.clone())) {
            tracing::warn!(repo = %repo_url, error = %e, "failed to write repository cache");
        }
        Ok(recipes)
    }

    pub async fn search_recipes(&self, repo_url: &str, query: &str) -> RepoResult<Vec<Recipe>> {
        let recipes = self.list_recipes_cached(repo_url).await?;
        Ok(recipes.into_iter().filter(|r| r.matches(query)).collect())
    }

    /// Install one recipe by exact shortcut into the local store.
    pub async fn install_recipe(
        &self,
        shortcut: &str,
        repo_url: &str,
        service: &ShortcutService,
    ) -> RepoResult<InstallOutcome> {
        let recipe = self
            .list_recipes_cached(repo_url)
            .await?
            .into_iter()
            .find(|r| r.shortcut == shortcut)
            .ok_or_else(|| RepoError::RecipeNotFound {
                shortcut: shortcut.to_string(),
                repo: repo_url.to_string(),
            })?;
        let report = validate_recipe(&recipe);
        if !report.valid {
            return Err(RepoError::InvalidRecipe {
                shortcut: shortcut.to_string(),
                errors: report.errors,
            });
        }
        Ok(service.install(&recipe)?)
    }

    /// Delete every cache file. A missing cache directory counts as empty.
    pub fn clear_cache(&self) -> RepoResult<usize> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::info!(dir = %self.cache_dir.display(), removed, "repository cache cleared");
        Ok(removed)
    }
}

/// Render a recipe listing for display.
pub fn format_recipes(recipes: &[Recipe]) -> String {
    recipes
        .iter()
        .map(|r| {
            let mut line = format!("• {}", r.shortcut);
            if let Some(name) = &r.name {
                line.push_str(&format!(" ({name})"));
            }
            if let Some(desc) = &r.description {
                line.push_str(&format!(": {desc}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
