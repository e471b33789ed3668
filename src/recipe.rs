//! Recipe and manifest schemas shared by the starter pack and the repository client.

use serde::{Deserialize, Serialize};

/// A shortcut/context pair with optional descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub shortcut: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Recipe {
    pub fn new(shortcut: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            shortcut: shortcut.into(),
            context: context.into(),
            name: None,
            description: None,
        }
    }

    /// Fill metadata the recipe file left out from its manifest entry.
    pub fn with_manifest_metadata(mut self, entry: &ManifestEntry) -> Self {
        if self.name.is_none() {
            self.name = entry.name.clone();
        }
        if self.description.is_none() {
            self.description = entry.description.clone();
        }
        self
    }

    /// Case-insensitive substring match over every textual field.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        [
            Some(self.shortcut.as_str()),
            self.name.as_deref(),
            self.description.as_deref(),
            Some(self.context.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&q))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub recipes: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

// Shortcut names match ^[A-Za-z0-9_-]+$
fn is_shortcut_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Check a recipe against every rule and report all violations at once.
pub fn validate_recipe(recipe: &Recipe) -> ValidationReport {
    let mut errors = Vec::new();
    if recipe.shortcut.is_empty() {
        errors.push("shortcut is required and must be a non-empty string".to_string());
    } else if !recipe.shortcut.chars().all(is_shortcut_char) {
        errors.push(format!(
            "shortcut '{}' may only contain letters, digits, '_' and '-'",
            recipe.shortcut
        ));
    }
    if recipe.context.is_empty() {
        errors.push("context is required and must be a non-empty string".to_string());
    }
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
