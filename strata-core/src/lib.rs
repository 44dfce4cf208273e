//! Layered settings: dotted-path trees ([`NestedMap`]) stacked by priority
//! into a [`LayeredResolver`].
//!
//! ```
//! use strata_core::{LayerCategory, LayeredResolver, NestedMap, Value};
//!
//! # fn main() -> strata_core::Result<()> {
//! let mut defaults = NestedMap::new();
//! defaults.set("editor.font.size", 12)?;
//! defaults.set("features.preview", false)?;
//!
//! let mut resolver = LayeredResolver::new();
//! resolver.register("defaults", defaults, LayerCategory::Global)?;
//! resolver.set("editor.font.size", 14)?;
//!
//! assert_eq!(resolver.get("editor.font.size")?, Some(Value::from(14)));
//! assert_eq!(resolver.get_or("editor.tab_width", 4)?, Value::from(4));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{Error, Result};
pub use settings::{
    KeyPath, LayerCategory, LayerInfo, LayeredResolver, Mapping, MergePolicy, NestedMap,
    ResolvedValue, SettingsSources, SourceFormat, Value,
};
