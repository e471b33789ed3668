//! On-disk shortcut store: a single pretty-printed JSON object of name -> context.

use crate::starter_pack;
use anyhow::{Context, Result};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};
use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Shortcut name -> context, iterated in file/insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutMap(Vec<(String, String)>);

impl ShortcutMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or overwrite; an existing key keeps its position. Returns the previous context.
    pub fn insert(&mut self, name: impl Into<String>, context: impl Into<String>) -> Option<String> {
        let name = name.into();
        let context = context.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => Some(std::mem::replace(v, context)),
            None => {
                self.0.push((name, context));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    /// Shallow merge: keys from `other` win.
    pub fn extend(&mut self, other: ShortcutMap) {
        for (k, v) in other.0 {
            self.insert(k, v);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl IntoIterator for ShortcutMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ShortcutMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ShortcutMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for ShortcutMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ShortcutMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ShortcutMapVisitor;

        impl<'de> Visitor<'de> for ShortcutMapVisitor {
            type Value = ShortcutMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object of shortcut names to context strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut map = ShortcutMap::new();
                while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
                    match value {
                        serde_json::Value::String(ctx) => {
                            map.insert(key, ctx);
                        }
                        other => {
                            tracing::warn!(shortcut = %key, kind = ?other, "skipping non-string shortcut value");
                        }
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ShortcutMapVisitor)
    }
}

/// Path-addressed shortcut store. Every operation reads the file fresh.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    starter_pack_dir: Option<PathBuf>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            starter_pack_dir: None,
        }
    }

    /// Enable seeding an empty store from the starter pack in `load_or_bootstrap`.
    pub fn with_starter_pack(mut self, dir: impl Into<PathBuf>) -> Self {
        self.starter_pack_dir = Some(dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn starter_pack_dir(&self) -> Option<&Path> {
        self.starter_pack_dir.as_deref()
    }

    /// Read the persisted map. A missing or malformed file reads as empty.
    pub fn load(&self) -> ShortcutMap {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ShortcutMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read store, treating as empty");
                return ShortcutMap::new();
            }
        };
        serde_json::from_str::<ShortcutMap>(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "malformed store, treating as empty");
            ShortcutMap::new()
        })
    }

    /// Overwrite the store with the full map. Each save writes its own temp file
    /// next to the store and renames it over the target, so concurrent saves
    /// resolve to the last writer.
    pub fn save(&self, map: &ShortcutMap) -> Result<()> {
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };
        let text = serde_json::to_string_pretty(map)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in {}", parent.display()))?;
        tmp.write_all(text.as_bytes())
            .with_context(|| format!("write {}", tmp.path().display()))?;
        tmp.persist(&self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), shortcuts = map.len(), "store saved");
        Ok(())
    }

    /// `load`, but an empty store is seeded from the starter pack (and persisted)
    /// when one is configured and non-empty.
    pub fn load_or_bootstrap(&self) -> Result<ShortcutMap> {
        let map = self.load();
        if !map.is_empty() {
            return Ok(map);
        }
        let Some(dir) = &self.starter_pack_dir else {
            return Ok(map);
        };
        let seeded = starter_pack::load_starter_pack(dir);
        if seeded.is_empty() {
            return Ok(map);
        }
        self.save(&seeded)?;
        tracing::info!(path = %self.path.display(), recipes = seeded.len(), "store seeded from starter pack");
        Ok(seeded)
    }
}
