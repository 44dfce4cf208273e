use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::settings::nested::NestedMap;

pub const RUNTIME_LAYER: &str = "runtime";

/// Priority band of a layer. Bands are ordered lowest first; the derived
/// `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerCategory {
    Global,
    Plugin,
    User,
    Runtime,
}

impl LayerCategory {
    pub const ALL: [LayerCategory; 4] = [Self::Global, Self::Plugin, Self::User, Self::Runtime];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Plugin => "plugin",
            Self::User => "user",
            Self::Runtime => "runtime",
        }
    }
}

impl FromStr for LayerCategory {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" | "default" => Ok(Self::Global),
            "plugin" => Ok(Self::Plugin),
            "user" => Ok(Self::User),
            "runtime" => Ok(Self::Runtime),
            other => Err(Error::Layer(format!("unknown layer category '{other}'"))),
        }
    }
}

impl std::fmt::Display for LayerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Layer {
    pub(crate) name: String,
    pub(crate) category: LayerCategory,
    pub(crate) map: Arc<NestedMap>,
}

/// Read-only description of a registered layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    pub category: LayerCategory,
    /// Position in the stack; 0 is the lowest priority.
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::LayerCategory;

    #[test]
    fn categories_order_lowest_first() {
        let mut shuffled = vec![
            LayerCategory::Runtime,
            LayerCategory::Global,
            LayerCategory::User,
            LayerCategory::Plugin,
        ];
        shuffled.sort();
        assert_eq!(shuffled, LayerCategory::ALL.to_vec());
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("User".parse::<LayerCategory>().ok(), Some(LayerCategory::User));
        assert_eq!(
            "default".parse::<LayerCategory>().ok(),
            Some(LayerCategory::Global)
        );
        let error = "session"
            .parse::<LayerCategory>()
            .expect_err("unknown category");
        assert!(error.to_string().contains("unknown layer category 'session'"));
    }

    #[test]
    fn serializes_as_snake_case() {
        let rendered = serde_json::to_string(&LayerCategory::Plugin).expect("serializes");
        assert_eq!(rendered, "\"plugin\"");
    }
}
