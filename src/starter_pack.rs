//! Bundled starter pack: `manifest.json` plus one JSON file per recipe.

use crate::{
    recipe::{Manifest, Recipe},
    store::ShortcutMap,
};
use anyhow::{Context, Result};
use std::{fs, path::Path};

fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join("manifest.json");
    let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn read_recipe(path: &Path) -> Result<Recipe> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

/// Load every readable recipe listed in `dir/manifest.json`.
///
/// Failures never abort the load: a bad manifest yields an empty map and a
/// bad recipe is skipped.
pub fn load_starter_pack(dir: &Path) -> ShortcutMap {
    let mut shortcuts = ShortcutMap::new();
    let manifest = match read_manifest(dir) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %format!("{e:#}"), "failed to load starter pack");
            return shortcuts;
        }
    };
    for entry in &manifest.recipes {
        match read_recipe(&dir.join(&entry.file)) {
            Ok(recipe) => {
                shortcuts.insert(recipe.shortcut, recipe.context);
            }
            Err(e) => {
                tracing::warn!(file = %entry.file, error = %format!("{e:#}"), "failed to load starter recipe");
            }
        }
    }
    tracing::debug!(dir = %dir.display(), recipes = shortcuts.len(), "starter pack loaded");
    shortcuts
}
