pub mod reference;

pub use reference::{MaterialPortion, MaterialReference, TypeMaterials};

use crate::types::MaterialId;

/// Breakdown entries at or below this id are raw minerals an automatic extractor cannot collect
pub const REFINED_GOODS_BOUNDARY: MaterialId = 100;

/// Moon ores above this id (R16 and R32) are also worth mining manually
pub const HIGH_TIER_ORE_BOUNDARY: MaterialId = 45497;

/// Fuel burned by automatic extractors; also the unit skyhook rights are valued in
pub const FUEL_MATERIAL_ID: MaterialId = 81143;
