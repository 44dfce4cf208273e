use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::settings::layer::{Layer, LayerCategory, LayerInfo, RUNTIME_LAYER};
use crate::settings::nested::{merge_value, MergePolicy, NestedMap};
use crate::settings::value::Value;

/// One layer's value for a path, as reported by [`LayeredResolver::explain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerContribution {
    pub layer: String,
    pub category: LayerCategory,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub path: String,
    pub effective: Option<serde_json::Value>,
    /// Layer that supplied `effective`.
    pub source: Option<String>,
    /// Every layer defining the path, highest priority first.
    pub contributions: Vec<LayerContribution>,
}

/// A priority-ordered stack of [`NestedMap`] layers.
///
/// Layers are ordered by [`LayerCategory`] and, within a category, by
/// registration order (later registrations win). A `runtime` layer sits on
/// top of every stack; it cannot be registered or removed and receives all
/// writes that do not name a layer.
///
/// Registered layers are held behind `Arc`. [`LayeredResolver::layer`] hands
/// out a snapshot that stays valid and unchanged across later writes or a
/// [`LayeredResolver::replace`].
#[derive(Debug, Clone, Default)]
pub struct LayeredResolver {
    layers: Vec<Layer>,
    runtime: NestedMap,
}

impl LayeredResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(runtime: NestedMap) -> Self {
        Self {
            layers: Vec::new(),
            runtime,
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        map: NestedMap,
        category: LayerCategory,
    ) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Layer("layer name cannot be empty".to_owned()));
        }
        if category == LayerCategory::Runtime {
            return Err(Error::Layer(format!(
                "cannot register '{name}' in the runtime category; it is reserved for the built-in runtime layer"
            )));
        }
        if self.contains_layer(&name) {
            return Err(Error::Layer(format!("layer '{name}' is already registered")));
        }

        let position = self
            .layers
            .iter()
            .position(|layer| layer.category > category)
            .unwrap_or(self.layers.len());
        tracing::debug!(layer = %name, %category, rank = position, "registering settings layer");
        self.layers.insert(
            position,
            Layer {
                name,
                category,
                map: Arc::new(map),
            },
        );
        Ok(())
    }

    /// Removes a registered layer and returns its contents.
    pub fn unregister(&mut self, name: &str) -> Result<Arc<NestedMap>> {
        if name == RUNTIME_LAYER {
            return Err(Error::Layer(
                "the runtime layer cannot be unregistered".to_owned(),
            ));
        }
        let index = self.index_of(name)?;
        tracing::debug!(layer = %name, "unregistering settings layer");
        Ok(self.layers.remove(index).map)
    }

    /// Swaps the contents of an existing layer, keeping its name and rank, and
    /// returns the previous contents.
    pub fn replace(&mut self, name: &str, map: NestedMap) -> Result<Arc<NestedMap>> {
        if name == RUNTIME_LAYER {
            let previous = std::mem::replace(&mut self.runtime, map);
            return Ok(Arc::new(previous));
        }
        let index = self.index_of(name)?;
        tracing::debug!(layer = %name, "replacing settings layer");
        Ok(std::mem::replace(&mut self.layers[index].map, Arc::new(map)))
    }

    pub fn layer(&self, name: &str) -> Option<Arc<NestedMap>> {
        if name == RUNTIME_LAYER {
            return Some(Arc::new(self.runtime.clone()));
        }
        self.layers
            .iter()
            .find(|layer| layer.name == name)
            .map(|layer| Arc::clone(&layer.map))
    }

    pub fn contains_layer(&self, name: &str) -> bool {
        name == RUNTIME_LAYER || self.layers.iter().any(|layer| layer.name == name)
    }

    /// Registered layers in priority order, lowest first, ending with `runtime`.
    pub fn layers(&self) -> Vec<LayerInfo> {
        self.stack()
            .enumerate()
            .map(|(rank, (name, category, _))| LayerInfo {
                name: name.to_owned(),
                category,
                rank,
            })
            .collect()
    }

    pub fn runtime(&self) -> &NestedMap {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut NestedMap {
        &mut self.runtime
    }

    /// Value from the highest-priority layer that defines `path`.
    ///
    /// The empty path is always defined by the runtime layer, so `get("")`
    /// returns the runtime tree alone. Use [`LayeredResolver::get_merged`] or
    /// [`LayeredResolver::effective`] for the whole resolved tree.
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        for (_, _, map) in self.stack().rev() {
            if let Some(value) = map.get(path)? {
                return Ok(Some(value.clone()));
            }
        }
        Ok(None)
    }

    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get(path)?.unwrap_or_else(|| default.into()))
    }

    /// Like [`LayeredResolver::get`], but when every layer defining `path`
    /// holds a mapping the mappings are deep-merged, lowest priority first.
    /// If any of them holds something else the plain override result is
    /// returned.
    pub fn get_merged(&self, path: &str) -> Result<Option<Value>> {
        let mut defined = Vec::new();
        for (_, _, map) in self.stack() {
            if let Some(value) = map.get(path)? {
                defined.push(value);
            }
        }

        let Some(highest) = defined.last() else {
            return Ok(None);
        };
        if !defined.iter().all(|value| value.is_mapping()) {
            return Ok(Some((*highest).clone()));
        }

        let mut merged = Value::empty_mapping();
        for value in defined {
            merge_value(&mut merged, value, MergePolicy::Overwrite);
        }
        Ok(Some(merged))
    }

    pub fn get_merged_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get_merged(path)?.unwrap_or_else(|| default.into()))
    }

    pub fn explain(&self, path: &str) -> Result<ResolvedValue> {
        let mut contributions = Vec::new();
        for (name, category, map) in self.stack().rev() {
            if let Some(value) = map.get(path)? {
                contributions.push(LayerContribution {
                    layer: name.to_owned(),
                    category,
                    value: value.to_json(),
                });
            }
        }

        let top = contributions.first();
        Ok(ResolvedValue {
            path: path.to_owned(),
            effective: top.map(|contribution| contribution.value.clone()),
            source: top.map(|contribution| contribution.layer.clone()),
            contributions,
        })
    }

    /// Writes to the runtime layer.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        self.runtime.set(path, value)
    }

    /// Writes to the named layer only. A layer currently shared through
    /// [`LayeredResolver::layer`] is copied first, so the snapshot is unaffected.
    pub fn set_in(
        &mut self,
        layer: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        self.layer_mut(layer)?.set(path, value)
    }

    pub fn delete(&mut self, path: &str) -> Result<Option<Value>> {
        self.runtime.delete(path)
    }

    pub fn delete_in(&mut self, layer: &str, path: &str) -> Result<Option<Value>> {
        self.layer_mut(layer)?.delete(path)
    }

    /// All layers merged into one tree, lowest priority first. The tree uses
    /// the runtime layer's separator.
    pub fn effective(&self) -> NestedMap {
        self.merge_layers(|_| true)
    }

    pub fn effective_in(&self, category: LayerCategory) -> NestedMap {
        self.merge_layers(|candidate| candidate == category)
    }

    fn merge_layers(&self, include: impl Fn(LayerCategory) -> bool) -> NestedMap {
        let mut merged = NestedMap::with_separator(self.runtime.separator());
        for (_, category, map) in self.stack() {
            if include(category) {
                merged.merge(map, MergePolicy::Overwrite);
            }
        }
        merged
    }

    fn layer_mut(&mut self, name: &str) -> Result<&mut NestedMap> {
        if name == RUNTIME_LAYER {
            return Ok(&mut self.runtime);
        }
        let index = self.index_of(name)?;
        Ok(Arc::make_mut(&mut self.layers[index].map))
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.layers
            .iter()
            .position(|layer| layer.name == name)
            .ok_or_else(|| Error::Layer(format!("layer '{name}' is not registered")))
    }

    /// Layers lowest priority first, runtime last.
    fn stack(&self) -> impl DoubleEndedIterator<Item = (&str, LayerCategory, &NestedMap)> {
        self.layers
            .iter()
            .map(|layer| (layer.name.as_str(), layer.category, layer.map.as_ref()))
            .chain(std::iter::once((
                RUNTIME_LAYER,
                LayerCategory::Runtime,
                &self.runtime,
            )))
    }
}
