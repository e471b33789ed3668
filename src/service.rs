//! Shortcut operations built on the store. Each mutating call is one
//! load -> mutate -> save cycle.

use crate::{
    config::Config,
    recipe::Recipe,
    store::{ShortcutMap, Store},
};
use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub name: String,
    pub preview: String,
}

impl Preview {
    fn new(name: String, context: &str) -> Self {
        let mut chars = context.chars();
        let mut preview: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            preview.push_str("...");
        }
        Self { name, preview }
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "• {}: {}", self.name, self.preview)
    }
}

fn available(names: &[String]) -> String {
    if names.is_empty() { "none".to_string() } else { names.join(", ") }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded { name: String, context: String },
    AlreadyExists { name: String, existing: String },
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recorded { name, context } => write!(
                f,
                "✓ Shortcut '{name}' has been recorded successfully!\n\nStored context:\n{context}"
            ),
            Self::AlreadyExists { name, existing } => write!(
                f,
                "⚠️  Warning: Shortcut '{name}' already exists!\n\nCurrent context: {existing}\n\nTo update it, use: update {name} <new_context>\nTo keep the existing shortcut, choose a different name."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { name: String, previous: String, context: String },
    NotFound { name: String, available: Vec<String> },
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated { name, previous, context } => write!(
                f,
                "✓ Shortcut '{name}' has been updated successfully!\n\nPrevious context: {previous}\n\nUpdated context:\n{context}"
            ),
            Self::NotFound { name, available: names } => write!(
                f,
                "✗ Error: Shortcut '{name}' does not exist. Use 'rec <shortcut> <context>' to create a new shortcut.\n\nAvailable shortcuts: {}",
                available(names)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { name: String },
    Absent { name: String },
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted { name } => write!(f, "✓ Shortcut '{name}' has been deleted successfully!"),
            Self::Absent { name } => write!(
                f,
                "ℹ️  Shortcut '{name}' does not exist. No action needed."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    Purged { count: usize },
    AlreadyEmpty,
    ConfirmationRequired { count: usize },
}

impl fmt::Display for PurgeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purged { count } => write!(
                f,
                "✓ All shortcuts have been purged successfully!\n\nDeleted {count} shortcut(s)."
            ),
            Self::AlreadyEmpty => write!(f, "ℹ️  No shortcuts to purge. Storage is already empty."),
            Self::ConfirmationRequired { count } => write!(
                f,
                "⚠️  Confirmation required to purge all {count} shortcut(s).\n\nThis will delete ALL stored shortcuts permanently.\nConfirm to proceed."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Found { name: String, context: String },
    NotFound { name: String, available: Vec<String> },
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found { context, .. } => f.write_str(context),
            Self::NotFound { name, available: names } => write!(
                f,
                "✗ Shortcut '{name}' not found.\n\nAvailable shortcuts: {}",
                available(names)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded { count: usize },
    ConfirmationRequired { count: usize },
}

impl fmt::Display for ReloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reloaded { count } => write!(
                f,
                "✓ Starter pack loaded successfully! {count} recipes loaded."
            ),
            Self::ConfirmationRequired { count } => write!(
                f,
                "⚠️  This will overwrite ALL {count} existing shortcuts with starter pack recipes.\nConfirm to proceed."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub merged: bool,
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let how = if self.merged { "merged with existing" } else { "overwrote existing" };
        write!(f, "✓ Imported {} shortcuts ({how})", self.imported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub shortcut: String,
    pub replaced: bool,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.replaced {
            write!(f, "✓ Recipe '{}' installed (replaced existing shortcut).", self.shortcut)
        } else {
            write!(f, "✓ Recipe '{}' installed.", self.shortcut)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub storage_file: PathBuf,
    pub total: usize,
    /// Prefix before the first '-' of a shortcut name -> shortcuts sharing it.
    pub categories: BTreeMap<String, usize>,
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 RecCall Information")?;
        writeln!(f, "====================")?;
        writeln!(f, "Version: {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(f, "Storage file: {}", self.storage_file.display())?;
        write!(f, "Total shortcuts: {}", self.total)?;
        if !self.categories.is_empty() {
            write!(f, "\n\n📁 Categories:")?;
            for (cat, n) in &self.categories {
                write!(f, "\n  • {cat}: {n} shortcuts")?;
            }
        }
        Ok(())
    }
}

/// Operation layer over a [`Store`].
#[derive(Debug, Clone)]
pub struct ShortcutService {
    store: Store,
    starter_pack_dir: Option<PathBuf>,
}

impl ShortcutService {
    /// The starter pack used by `reload_starter_pack` defaults to the store's bootstrap pack.
    pub fn new(store: Store) -> Self {
        let starter_pack_dir = store.starter_pack_dir().map(Path::to_path_buf);
        Self { store, starter_pack_dir }
    }

    pub fn with_starter_pack(mut self, dir: impl Into<PathBuf>) -> Self {
        self.starter_pack_dir = Some(dir.into());
        self
    }

    /// Service over the configured store. Bootstrap is only wired in when enabled,
    /// but an explicit reload can always use the starter pack.
    pub fn from_config(cfg: &Config) -> Self {
        let pack = cfg.starter_pack_dir();
        let mut store = Store::new(cfg.store_file());
        if let (true, Some(dir)) = (cfg.settings.bootstrap_starter_pack, &pack) {
            store = store.with_starter_pack(dir);
        }
        let service = Self::new(store);
        match pack {
            Some(dir) => service.with_starter_pack(dir),
            None => service,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn current(&self) -> Result<ShortcutMap> {
        self.store.load_or_bootstrap()
    }

    pub fn record(&self, name: &str, context: &str) -> Result<RecordOutcome> {
        let mut map = self.current()?;
        if let Some(existing) = map.get(name) {
            return Ok(RecordOutcome::AlreadyExists {
                name: name.to_string(),
                existing: existing.to_string(),
            });
        }
        map.insert(name, context);
        self.store.save(&map)?;
        tracing::info!(shortcut = %name, "shortcut recorded");
        Ok(RecordOutcome::Recorded {
            name: name.to_string(),
            context: context.to_string(),
        })
    }

    pub fn update(&self, name: &str, context: &str) -> Result<UpdateOutcome> {
        let mut map = self.current()?;
        if !map.contains(name) {
            return Ok(UpdateOutcome::NotFound {
                name: name.to_string(),
                available: map.names().map(str::to_string).collect(),
            });
        }
        let previous = map.insert(name, context).unwrap_or_default();
        self.store.save(&map)?;
        tracing::info!(shortcut = %name, "shortcut updated");
        Ok(UpdateOutcome::Updated {
            name: name.to_string(),
            previous,
            context: context.to_string(),
        })
    }

    pub fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        let mut map = self.current()?;
        if map.remove(name).is_none() {
            return Ok(DeleteOutcome::Absent { name: name.to_string() });
        }
        self.store.save(&map)?;
        tracing::info!(shortcut = %name, "shortcut deleted");
        Ok(DeleteOutcome::Deleted { name: name.to_string() })
    }

    /// Remove every shortcut. An already-empty store succeeds without confirmation.
    pub fn purge(&self, confirm: bool) -> Result<PurgeOutcome> {
        let map = self.store.load();
        let count = map.len();
        if count == 0 {
            return Ok(PurgeOutcome::AlreadyEmpty);
        }
        if !confirm {
            return Ok(PurgeOutcome::ConfirmationRequired { count });
        }
        self.store.save(&ShortcutMap::new())?;
        tracing::info!(count, "store purged");
        Ok(PurgeOutcome::Purged { count })
    }

    /// Full stored context, untruncated.
    pub fn call(&self, name: &str) -> Result<CallOutcome> {
        let map = self.current()?;
        Ok(match map.get(name) {
            Some(context) => CallOutcome::Found {
                name: name.to_string(),
                context: context.to_string(),
            },
            None => CallOutcome::NotFound {
                name: name.to_string(),
                available: map.names().map(str::to_string).collect(),
            },
        })
    }

    pub fn list(&self) -> Result<impl Iterator<Item = Preview> + use<>> {
        let map = self.current()?;
        Ok(map.into_iter().map(|(name, context)| Preview::new(name, &context)))
    }

    pub fn search(&self, query: &str) -> Result<impl Iterator<Item = Preview> + use<>> {
        let q = query.to_lowercase();
        let map = self.current()?;
        Ok(map
            .into_iter()
            .filter(move |(name, context)| {
                name.to_lowercase().contains(&q) || context.to_lowercase().contains(&q)
            })
            .map(|(name, context)| Preview::new(name, &context)))
    }

    /// Replace the whole store with the starter pack. Requires confirmation
    /// unless the store is empty.
    pub fn reload_starter_pack(&self, confirm: bool) -> Result<ReloadOutcome> {
        let count = self.store.load().len();
        if count > 0 && !confirm {
            return Ok(ReloadOutcome::ConfirmationRequired { count });
        }
        let pack = match &self.starter_pack_dir {
            Some(dir) => crate::starter_pack::load_starter_pack(dir),
            None => {
                tracing::warn!("no starter pack directory configured");
                ShortcutMap::new()
            }
        };
        self.store.save(&pack)?;
        tracing::info!(recipes = pack.len(), "starter pack reloaded");
        Ok(ReloadOutcome::Reloaded { count: pack.len() })
    }

    /// Write the current map to `path` as pretty JSON. Returns the number exported.
    pub fn export(&self, path: &Path) -> Result<usize> {
        let map = self.current()?;
        let text = serde_json::to_string_pretty(&map)?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
        Ok(map.len())
    }

    /// Overwrite the store with `path`'s contents, or shallow-merge them when `merge`.
    pub fn import(&self, path: &Path, merge: bool) -> Result<ImportOutcome> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let imported: ShortcutMap =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        let count = imported.len();
        let map = if merge {
            let mut existing = self.store.load();
            existing.extend(imported);
            existing
        } else {
            imported
        };
        self.store.save(&map)?;
        tracing::info!(imported = count, merge, "shortcuts imported");
        Ok(ImportOutcome { imported: count, merged: merge })
    }

    /// Insert or overwrite a repository recipe.
    pub fn install(&self, recipe: &Recipe) -> Result<InstallOutcome> {
        let mut map = self.current()?;
        let replaced = map.insert(recipe.shortcut.as_str(), recipe.context.as_str()).is_some();
        self.store.save(&map)?;
        tracing::info!(shortcut = %recipe.shortcut, replaced, "recipe installed");
        Ok(InstallOutcome {
            shortcut: recipe.shortcut.clone(),
            replaced,
        })
    }

    pub fn info(&self) -> Result<Info> {
        let map = self.current()?;
        let mut categories = BTreeMap::new();
        for name in map.names() {
            if let Some((prefix, _)) = name.split_once('-') {
                *categories.entry(prefix.to_string()).or_insert(0) += 1;
            }
        }
        Ok(Info {
            storage_file: self.store.path().to_path_buf(),
            total: map.len(),
            categories,
        })
    }
}
