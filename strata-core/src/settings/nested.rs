use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::settings::path::{KeyPath, DEFAULT_SEPARATOR};
use crate::settings::value::{Mapping, Value};

/// How [`NestedMap::merge`] treats keys that exist on both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Incoming scalars and sequences replace existing values.
    #[default]
    Overwrite,
    /// Existing values win; incoming values only fill missing keys.
    KeepExisting,
}

/// A tree of settings addressed by separator-joined paths such as
/// `"editor.font.size"`.
///
/// The root is always a mapping. Writes require every path segment before
/// the last one to name a mapping when present; a scalar in that position is
/// an [`Error::Addressing`]. Reads treat such a path as absent, unless made
/// through [`NestedMap::get_strict`]. Empty path segments are always an
/// [`Error::Addressing`].
///
/// Mutating operations work in place. `clone()` is a deep copy.
#[derive(Debug, Clone)]
pub struct NestedMap {
    root: Value,
    separator: char,
}

impl Default for NestedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for NestedMap {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl From<Mapping> for NestedMap {
    fn from(raw: Mapping) -> Self {
        Self::from_raw(raw)
    }
}

impl NestedMap {
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    pub fn with_separator(separator: char) -> Self {
        Self {
            root: Value::empty_mapping(),
            separator,
        }
    }

    /// Wraps `raw` as-is. Keys are taken verbatim, even if they contain the
    /// separator.
    pub fn from_raw(raw: Mapping) -> Self {
        Self::from_raw_with_separator(raw, DEFAULT_SEPARATOR)
    }

    pub fn from_raw_with_separator(raw: Mapping, separator: char) -> Self {
        Self {
            root: Value::Mapping(raw),
            separator,
        }
    }

    /// Builds a map from `raw`, splitting keys that contain `separator` into
    /// nested mappings, so `{"ui.theme": "dark"}` becomes `{"ui": {"theme": "dark"}}`.
    pub fn from_raw_expanded(raw: Mapping, separator: char) -> Result<Self> {
        let mut map = Self::with_separator(separator);
        map.import(&KeyPath::root(), raw)?;
        Ok(map)
    }

    pub fn from_json(raw: serde_json::Value) -> Result<Self> {
        match Value::from(raw) {
            Value::Mapping(mapping) => Ok(Self::from_raw(mapping)),
            other => Err(Error::Config(format!(
                "settings root must be a mapping, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn parse_path(&self, path: &str) -> Result<KeyPath> {
        KeyPath::parse(path, self.separator)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.root.as_mapping().map_or(0, Mapping::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole tree as a `Value::Mapping`.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, path: &str) -> Result<Option<&Value>> {
        let key_path = self.parse_path(path)?;
        Ok(self.get_at(&key_path))
    }

    pub fn get_at(&self, path: &KeyPath) -> Option<&Value> {
        let mut cursor = &self.root;
        for key in path.segments() {
            cursor = cursor.as_mapping()?.get(key)?;
        }
        Some(cursor)
    }

    /// Like [`NestedMap::get`], but a scalar sitting where the path expects a
    /// mapping is an [`Error::Addressing`] instead of an absent value.
    pub fn get_strict(&self, path: &str) -> Result<Option<&Value>> {
        let key_path = self.parse_path(path)?;
        let mut cursor = &self.root;
        for (depth, key) in key_path.segments().iter().enumerate() {
            let Value::Mapping(mapping) = cursor else {
                return Err(scalar_in_path(&key_path, depth, cursor, self.separator));
            };
            match mapping.get(key) {
                Some(value) => cursor = value,
                None => return Ok(None),
            }
        }
        Ok(Some(cursor))
    }

    /// Returns a copy of the value at `path`, or `default` when it is absent.
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get(path)?.cloned().unwrap_or_else(|| default.into()))
    }

    pub fn contains(&self, path: &str) -> Result<bool> {
        Ok(self.get(path)?.is_some())
    }

    /// Assigns `value` at `path`, creating missing parent mappings, and
    /// returns the value it replaced. Whatever was at `path` is discarded,
    /// including a whole subtree.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let key_path = self.parse_path(path)?;
        self.set_at(&key_path, value.into())
    }

    pub fn set_at(&mut self, path: &KeyPath, value: Value) -> Result<Option<Value>> {
        let Some((last, parents)) = path.split_last() else {
            if !value.is_mapping() {
                return Err(Error::Addressing(format!(
                    "the root can only be replaced by a mapping, got {}",
                    value.type_name()
                )));
            }
            return Ok(Some(std::mem::replace(&mut self.root, value)));
        };

        let parent = self.mapping_at_or_create(path, parents.len())?;
        Ok(parent.insert(last.clone(), value))
    }

    /// Removes the value at `path` and returns it, or `None` when the path does
    /// not resolve. Parent mappings left empty are kept; see [`NestedMap::prune`].
    pub fn delete(&mut self, path: &str) -> Result<Option<Value>> {
        let key_path = self.parse_path(path)?;
        self.delete_at(&key_path)
    }

    pub fn delete_at(&mut self, path: &KeyPath) -> Result<Option<Value>> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(Some(std::mem::replace(
                &mut self.root,
                Value::empty_mapping(),
            )));
        };

        let Some(parent) = self.mapping_at(parents) else {
            return Ok(None);
        };
        Ok(parent.shift_remove(last))
    }

    /// Removes empty nested mappings at any depth and returns how many were
    /// dropped. The root itself is kept.
    pub fn prune(&mut self) -> usize {
        match &mut self.root {
            Value::Mapping(mapping) => prune_mapping(mapping),
            _ => 0,
        }
    }

    /// Deep-merges `other` into this map. Mappings present on both sides are
    /// merged key by key; any other pair is resolved by `policy`. Sequences
    /// are replaced whole, never concatenated.
    pub fn merge(&mut self, other: &NestedMap, policy: MergePolicy) {
        merge_value(&mut self.root, &other.root, policy);
    }

    /// Every leaf at or beneath `path` with its full path, in insertion order.
    /// Empty mappings have no leaves.
    pub fn items(&self, path: &str) -> Result<Vec<(String, &Value)>> {
        let key_path = self.parse_path(path)?;
        let mut items = Vec::new();
        if let Some(value) = self.get_at(&key_path) {
            collect_leaves(&key_path, value, self.separator, &mut items);
        }
        Ok(items)
    }

    pub fn keys(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .items(path)?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    pub fn flatten(&self) -> IndexMap<String, Value> {
        let mut items = Vec::new();
        collect_leaves(&KeyPath::root(), &self.root, self.separator, &mut items);
        items
            .into_iter()
            .map(|(key, value)| (key, value.clone()))
            .collect()
    }

    pub fn to_raw(&self) -> Mapping {
        self.root.as_mapping().cloned().unwrap_or_default()
    }

    pub fn into_raw(self) -> Mapping {
        match self.root {
            Value::Mapping(mapping) => mapping,
            _ => Mapping::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.root.to_json()
    }

    fn import(&mut self, prefix: &KeyPath, raw: Mapping) -> Result<()> {
        for (key, value) in raw {
            let relative = self.parse_path(&key)?;
            if relative.is_root() {
                return Err(Error::Addressing(format!(
                    "empty key under '{}'",
                    prefix.join(self.separator)
                )));
            }

            let path = prefix.concat(&relative);
            match value {
                Value::Mapping(children) => {
                    self.mapping_at_or_create(&path, path.len())?;
                    self.import(&path, children)?;
                }
                other => {
                    self.set_at(&path, other)?;
                }
            }
        }
        Ok(())
    }

    fn mapping_at(&mut self, segments: &[String]) -> Option<&mut Mapping> {
        let mut cursor = &mut self.root;
        for key in segments {
            cursor = cursor.as_mapping_mut()?.get_mut(key)?;
        }
        cursor.as_mapping_mut()
    }

    /// Walks the first `depth` segments of `path`, inserting empty mappings
    /// for missing keys.
    fn mapping_at_or_create(&mut self, path: &KeyPath, depth: usize) -> Result<&mut Mapping> {
        let separator = self.separator;
        let mut cursor = &mut self.root;
        for (index, key) in path.segments()[..depth].iter().enumerate() {
            cursor = match cursor {
                Value::Mapping(mapping) => mapping
                    .entry(key.clone())
                    .or_insert_with(Value::empty_mapping),
                other => return Err(scalar_in_path(path, index, other, separator)),
            };
        }

        match cursor {
            Value::Mapping(mapping) => Ok(mapping),
            other => Err(scalar_in_path(path, depth, other, separator)),
        }
    }
}

/// `depth` is the number of leading segments that reached `found`.
fn scalar_in_path(path: &KeyPath, depth: usize, found: &Value, separator: char) -> Error {
    let mut buffer = [0u8; 4];
    let separator_str = separator.encode_utf8(&mut buffer);
    Error::Addressing(format!(
        "cannot address '{}': '{}' holds a {}, not a mapping",
        path.segments().join(separator_str),
        path.segments()[..depth].join(separator_str),
        found.type_name()
    ))
}

pub(crate) fn merge_value(existing: &mut Value, incoming: &Value, policy: MergePolicy) {
    match (existing, incoming) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(current) => merge_value(current, value, policy),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (existing, incoming) => {
            if policy == MergePolicy::Overwrite {
                *existing = incoming.clone();
            }
        }
    }
}

fn prune_mapping(mapping: &mut Mapping) -> usize {
    let mut removed = 0;
    for value in mapping.values_mut() {
        if let Value::Mapping(child) = value {
            removed += prune_mapping(child);
        }
    }

    let before = mapping.len();
    mapping.retain(|_, value| !matches!(value, Value::Mapping(child) if child.is_empty()));
    removed + (before - mapping.len())
}

fn collect_leaves<'a>(
    prefix: &KeyPath,
    value: &'a Value,
    separator: char,
    items: &mut Vec<(String, &'a Value)>,
) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                collect_leaves(&prefix.child(key.clone()), child, separator, items);
            }
        }
        leaf => items.push((prefix.join(separator), leaf)),
    }
}
