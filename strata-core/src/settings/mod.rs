pub mod layer;
pub mod loader;
pub mod nested;
pub mod path;
pub mod resolver;
pub mod value;

pub use layer::{LayerCategory, LayerInfo, RUNTIME_LAYER};
pub use loader::{load_layer, parse_layer, SettingsSources, SourceEntry, SourceFormat};
pub use nested::{MergePolicy, NestedMap};
pub use path::{KeyPath, DEFAULT_SEPARATOR};
pub use resolver::{LayerContribution, LayeredResolver, ResolvedValue};
pub use value::{Mapping, Value};
