use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EtlError;
use crate::record::Kind;

/// Output layout for one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindLayout {
    /// Record keys emitted as tab-separated columns, in order.
    pub columns: Vec<String>,
    /// Record keys resolved into directory segments, in order.
    pub partitions: Vec<String>,
}

/// Per-kind column and partition layout, read-only after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    layouts: HashMap<Kind, KindLayout>,
}

impl ColumnSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, kind: Kind, layout: KindLayout) -> Self {
        self.layouts.insert(kind, layout);
        self
    }

    /// Parse `{"access": {"columns": [...], "partitions": [...]}, ...}`.
    /// Unknown kind names are skipped with a warning.
    pub fn from_json(text: &str) -> Result<Self, EtlError> {
        let raw: HashMap<String, KindLayout> = serde_json::from_str(text)?;
        let mut schema = Self::new();
        for (name, layout) in raw {
            match name.parse::<Kind>() {
                Ok(kind) => {
                    schema.layouts.insert(kind, layout);
                }
                Err(e) => warn!(error = %e, "ignoring column schema entry"),
            }
        }
        Ok(schema)
    }

    pub fn layout(&self, kind: Kind) -> Option<&KindLayout> {
        self.layouts.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
