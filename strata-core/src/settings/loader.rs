use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::settings::layer::LayerCategory;
use crate::settings::nested::NestedMap;
use crate::settings::resolver::LayeredResolver;
use crate::settings::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Json,
    Toml,
    Yaml,
}

impl SourceFormat {
    /// Picks a format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            None | Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some(other) => Err(Error::Config(format!(
                "unsupported settings file extension '.{other}' for '{}'",
                path.display()
            ))),
        }
    }

    pub fn parse(self, content: &str) -> Result<serde_json::Value> {
        let parsed = match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(parsed)
    }
}

/// Decodes `content` into a layer. Dotted keys are expanded into nested
/// mappings using `separator`.
pub fn parse_layer(content: &str, format: SourceFormat, separator: char) -> Result<NestedMap> {
    let parsed = format.parse(content)?;
    match Value::from(parsed) {
        Value::Mapping(raw) => NestedMap::from_raw_expanded(raw, separator),
        // An empty YAML document decodes as null.
        Value::Null => Ok(NestedMap::with_separator(separator)),
        other => Err(Error::Config(format!(
            "settings must contain a mapping at root, got {}",
            other.type_name()
        ))),
    }
}

/// Reads one settings file. A missing file yields an empty layer so that it
/// can be picked up by a later reload.
pub fn load_layer(path: &Path, separator: char) -> Result<NestedMap> {
    let format = SourceFormat::from_path(path)?;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "settings file not found; using an empty layer");
        return Ok(NestedMap::with_separator(separator));
    }

    let content = std::fs::read_to_string(path).inspect_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to read settings file");
    })?;
    tracing::debug!(path = %path.display(), ?format, "loading settings file");
    parse_layer(&content, format, separator).map_err(|err| match err {
        Error::Addressing(message) => Error::Addressing(format!("{}: {message}", path.display())),
        Error::Config(message) => Error::Config(format!("{}: {message}", path.display())),
        other => Error::Config(format!(
            "failed to parse settings '{}': {other}",
            path.display()
        )),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub path: PathBuf,
    pub category: LayerCategory,
}

/// The files backing a resolver's non-runtime layers.
///
/// Each file becomes one layer named `<category>:<path>`. Files are attached
/// in the order they were added, which is also their priority order within a
/// category.
#[derive(Debug, Clone)]
pub struct SettingsSources {
    entries: Vec<SourceEntry>,
    separator: char,
}

impl Default for SettingsSources {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSources {
    pub fn new() -> Self {
        Self::with_separator(crate::settings::path::DEFAULT_SEPARATOR)
    }

    pub fn with_separator(separator: char) -> Self {
        Self {
            entries: Vec::new(),
            separator,
        }
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, category: LayerCategory) -> Result<&SourceEntry> {
        if category == LayerCategory::Runtime {
            return Err(Error::Layer(
                "runtime settings cannot be backed by a file".to_owned(),
            ));
        }

        let path = path.into();
        let name = format!("{category}:{}", path.display());
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(Error::Layer(format!("source '{name}' is already added")));
        }

        self.entries.push(SourceEntry {
            name,
            path,
            category,
        });
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Loads every file and registers it as a layer.
    pub fn attach(&self, resolver: &mut LayeredResolver) -> Result<()> {
        for entry in &self.entries {
            let map = load_layer(&entry.path, self.separator)?;
            resolver.register(entry.name.clone(), map, entry.category)?;
        }
        Ok(())
    }

    /// Re-reads every file and swaps the matching layers. All files are
    /// parsed before any layer is touched, so a bad file leaves the resolver
    /// unchanged. Files not yet attached are registered. The runtime layer is
    /// never touched.
    pub fn reload(&self, resolver: &mut LayeredResolver) -> Result<()> {
        let mut fresh = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            fresh.push((entry, load_layer(&entry.path, self.separator)?));
        }

        for (entry, map) in fresh {
            if resolver.contains_layer(&entry.name) {
                resolver.replace(&entry.name, map)?;
            } else {
                resolver.register(entry.name.clone(), map, entry.category)?;
            }
        }
        tracing::debug!(sources = self.entries.len(), "reloaded settings sources");
        Ok(())
    }

    /// Forgets every entry and removes their layers from `resolver`.
    pub fn reset(&mut self, resolver: &mut LayeredResolver) -> Result<()> {
        for entry in self.entries.drain(..) {
            if resolver.contains_layer(&entry.name) {
                resolver.unregister(&entry.name)?;
            }
        }
        Ok(())
    }
}
