//! Material reference
//!
//! Read-only lookup from an ore / moon-ore type id to the materials one unit
//! of it refines into. The dataset is the `typeMaterials` export of the
//! game's static data, converted to JSON:
//!
//! ```json
//! { "45490": { "materials": [ { "materialTypeID": 16634, "quantity": 65 } ] } }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::MaterialId;

/// One entry of a type's refining breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialPortion {
    #[serde(rename = "materialTypeID")]
    pub material_type_id: MaterialId,
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMaterials {
    #[serde(default)]
    pub materials: Vec<MaterialPortion>,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialReference {
    types: HashMap<MaterialId, TypeMaterials>,
}

impl MaterialReference {
    pub fn new(types: HashMap<MaterialId, TypeMaterials>) -> Self {
        Self { types }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read material reference {:?}", path))?;
        let reference = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse material reference {:?}", path))?;
        info!("Loaded {} material breakdowns from {:?}", reference.len(), path);
        Ok(reference)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let types: HashMap<MaterialId, TypeMaterials> = serde_json::from_str(json)?;
        Ok(Self::new(types))
    }

    /// Refining breakdown of `id`, `None` when the type is unknown
    pub fn breakdown(&self, id: MaterialId) -> Option<&[MaterialPortion]> {
        self.types.get(&id).map(|t| t.materials.as_slice())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
