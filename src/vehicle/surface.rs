//! Surface / Traction Model
//!
//! Closed table of wheel categories and their per-terrain friction factors.
//! A factor of 1.0 is neutral; above 1.0 amplifies grip/resistance, below
//! 1.0 reduces it. Factors are multiplied into the ground friction term of
//! the motion integrator.

use serde::{Serialize, Deserialize};

// =============================================================================
// TERRAIN CLASS
// =============================================================================

/// Terrain classification under a vehicle, supplied by the host each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TerrainClass {
    /// Paved or otherwise hard surfaces
    #[default]
    Road = 0,
    /// Dirt, grass, sand, gravel
    Dirt = 1,
    /// Snow and ice
    Snow = 2,
}

impl TerrainClass {
    /// All terrain classes in declaration order.
    pub const ALL: [TerrainClass; 3] = [TerrainClass::Road, TerrainClass::Dirt, TerrainClass::Snow];

    /// Parse the host's lowercase terrain name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "road" => Some(TerrainClass::Road),
            "dirt" => Some(TerrainClass::Dirt),
            "snow" => Some(TerrainClass::Snow),
            _ => None,
        }
    }
}

// =============================================================================
// WHEEL TYPE
// =============================================================================

/// Wheel category fitted to a vehicle. The set is fixed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum WheelType {
    #[default]
    Standard = 0,
    Sports = 1,
    Racing = 2,
    OffRoad = 3,
    Snow = 4,
    AllTerrain = 5,
    Plastic = 6,
}

/// Immutable coefficients of one wheel category.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TractionEntry {
    /// Wheel category this entry belongs to
    pub wheel: WheelType,
    /// Friction factor on road
    pub road: f32,
    /// Friction factor on dirt
    pub dirt: f32,
    /// Friction factor on snow
    pub snow: f32,
    /// Lateral grip while rolling normally
    pub base_traction: f32,
    /// Lateral grip while sliding
    pub slide_traction: f32,
}

impl TractionEntry {
    const fn new(wheel: WheelType, road: f32, dirt: f32, snow: f32, base_traction: f32, slide_traction: f32) -> Self {
        Self { wheel, road, dirt, snow, base_traction, slide_traction }
    }

    /// Friction factor for a terrain class.
    #[inline]
    pub fn friction_factor(&self, terrain: TerrainClass) -> f32 {
        match terrain {
            TerrainClass::Road => self.road,
            TerrainClass::Dirt => self.dirt,
            TerrainClass::Snow => self.snow,
        }
    }
}

/// The traction table, indexed by `WheelType as usize`.
pub static TRACTION_TABLE: [TractionEntry; 7] = [
    TractionEntry::new(WheelType::Standard, 1.1, 1.2, 2.0, 0.8, 0.2),
    TractionEntry::new(WheelType::Sports, 1.0, 1.4, 2.0, 0.9, 0.05),
    TractionEntry::new(WheelType::Racing, 0.9, 1.5, 2.0, 1.0, 0.5),
    TractionEntry::new(WheelType::OffRoad, 1.2, 0.9, 1.2, 0.8, 0.2),
    TractionEntry::new(WheelType::Snow, 1.8, 1.0, 0.7, 0.9, 0.5),
    TractionEntry::new(WheelType::AllTerrain, 1.1, 1.1, 1.1, 1.0, 1.0),
    TractionEntry::new(WheelType::Plastic, 2.0, 2.0, 2.0, 0.5, 0.01),
];

impl WheelType {
    /// All wheel categories in declaration order.
    pub const ALL: [WheelType; 7] = [
        WheelType::Standard,
        WheelType::Sports,
        WheelType::Racing,
        WheelType::OffRoad,
        WheelType::Snow,
        WheelType::AllTerrain,
        WheelType::Plastic,
    ];

    /// Table entry for this category.
    #[inline]
    pub fn entry(self) -> &'static TractionEntry {
        &TRACTION_TABLE[self as usize]
    }

    /// Friction factor for a terrain class.
    #[inline]
    pub fn friction_factor(self, terrain: TerrainClass) -> f32 {
        self.entry().friction_factor(terrain)
    }

    #[inline]
    pub fn base_traction(self) -> f32 {
        self.entry().base_traction
    }

    #[inline]
    pub fn slide_traction(self) -> f32 {
        self.entry().slide_traction
    }
}

/// Look up the coefficients for a wheel category on a terrain class.
///
/// Returns the full entry together with the terrain's friction factor.
#[inline]
pub fn lookup(wheel: WheelType, terrain: TerrainClass) -> (&'static TractionEntry, f32) {
    let entry = wheel.entry();
    (entry, entry.friction_factor(terrain))
}
