//! Voltage classes, power-plant source categories and basemap palettes
//!
//! Voltage classes used across lines, layers and toggles:
//! kV  | Role           | Line color
//! ----|----------------|-----------
//! 400 | transmission   | #d7191c
//! 220 | transmission   | #fd8d3c
//! 110 | sub-transmission | #2c7bb6
//! 22  | distribution   | #6a3d9a

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MapError;

/// Transmission voltage tier.
///
/// The integer discriminants are the nominal voltage in kV.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum VoltageClass {
    Kv400 = 400,
    Kv220 = 220,
    Kv110 = 110,
    Kv22 = 22,
}

impl VoltageClass {
    /// Highest voltage first.
    pub const ALL: [VoltageClass; 4] = [
        VoltageClass::Kv400,
        VoltageClass::Kv220,
        VoltageClass::Kv110,
        VoltageClass::Kv22,
    ];

    pub fn from_kv(kv: u32) -> Option<Self> {
        match kv {
            400 => Some(VoltageClass::Kv400),
            220 => Some(VoltageClass::Kv220),
            110 => Some(VoltageClass::Kv110),
            22 => Some(VoltageClass::Kv22),
            _ => None,
        }
    }

    pub fn kv(self) -> u32 {
        self as u32
    }

    pub fn line_color(self) -> &'static str {
        match self {
            VoltageClass::Kv400 => "#d7191c",
            VoltageClass::Kv220 => "#fd8d3c",
            VoltageClass::Kv110 => "#2c7bb6",
            VoltageClass::Kv22 => "#6a3d9a",
        }
    }

    /// Base line width in pixels at zoom 10.
    pub fn line_width(self) -> f64 {
        match self {
            VoltageClass::Kv400 => 3.0,
            VoltageClass::Kv220 => 2.5,
            VoltageClass::Kv110 => 2.0,
            VoltageClass::Kv22 => 1.2,
        }
    }

    /// Distribution-level detail is hidden until the user asks for it.
    pub fn visible_by_default(self) -> bool {
        self != VoltageClass::Kv22
    }
}

impl TryFrom<u32> for VoltageClass {
    type Error = String;

    fn try_from(kv: u32) -> Result<Self, Self::Error> {
        VoltageClass::from_kv(kv).ok_or_else(|| format!("unsupported voltage class {kv} kV"))
    }
}

impl From<VoltageClass> for u32 {
    fn from(v: VoltageClass) -> u32 {
        v.kv()
    }
}

impl fmt::Display for VoltageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kV", self.kv())
    }
}

/// Color used for substations and voltage labels keyed on a raw kV value,
/// which may fall outside the fixed classes (e.g. 35 kV yards).
pub fn voltage_color(kv: u32) -> &'static str {
    VoltageClass::from_kv(kv)
        .map(VoltageClass::line_color)
        .unwrap_or(FALLBACK_COLOR)
}

pub const FALLBACK_COLOR: &str = "#7f7f7f";

/// Power-plant source category.
///
/// The dataset carries the source as a free-form string, so anything outside
/// the known set maps to [`PlantSource::Other`] and gets the generic icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlantSource {
    Nuclear,
    Hydro,
    Gas,
    Oil,
    Coal,
    Solar,
    Wind,
    Biomass,
    Geothermal,
    Other,
}

impl PlantSource {
    pub const ALL: [PlantSource; 10] = [
        PlantSource::Nuclear,
        PlantSource::Hydro,
        PlantSource::Gas,
        PlantSource::Oil,
        PlantSource::Coal,
        PlantSource::Solar,
        PlantSource::Wind,
        PlantSource::Biomass,
        PlantSource::Geothermal,
        PlantSource::Other,
    ];

    /// Classify a raw source string. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nuclear" => PlantSource::Nuclear,
            "hydro" => PlantSource::Hydro,
            "gas" => PlantSource::Gas,
            "oil" => PlantSource::Oil,
            "coal" => PlantSource::Coal,
            "solar" => PlantSource::Solar,
            "wind" => PlantSource::Wind,
            "biomass" => PlantSource::Biomass,
            "geothermal" => PlantSource::Geothermal,
            _ => PlantSource::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlantSource::Nuclear => "nuclear",
            PlantSource::Hydro => "hydro",
            PlantSource::Gas => "gas",
            PlantSource::Oil => "oil",
            PlantSource::Coal => "coal",
            PlantSource::Solar => "solar",
            PlantSource::Wind => "wind",
            PlantSource::Biomass => "biomass",
            PlantSource::Geothermal => "geothermal",
            PlantSource::Other => "other",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            PlantSource::Nuclear => "#ffd92f",
            PlantSource::Hydro => "#1f78b4",
            PlantSource::Gas => "#ff7f00",
            PlantSource::Oil => "#6a3d3a",
            PlantSource::Coal => "#333333",
            PlantSource::Solar => "#f2c14e",
            PlantSource::Wind => "#66c2a5",
            PlantSource::Biomass => "#33a02c",
            PlantSource::Geothermal => "#b15928",
            PlantSource::Other => FALLBACK_COLOR,
        }
    }

    /// Sprite image name for the category icon.
    pub fn icon(self) -> String {
        format!("plant-{}", self.as_str())
    }
}

impl fmt::Display for PlantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basemap theme selectable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Light,
    Dark,
}

pub const THEME_NAMES: &[&str] = &["light", "dark"];

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Light => &LIGHT,
            Theme::Dark => &DARK,
        }
    }
}

impl FromStr for Theme {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(MapError::UnknownTheme(s.to_string())),
        }
    }
}

/// Colors for the base terrain and text layers of one theme.
#[derive(Debug)]
pub struct Palette {
    pub background: &'static str,
    pub landcover: &'static str,
    pub water: &'static str,
    pub road_major: &'static str,
    pub road_minor: &'static str,
    pub boundary: &'static str,
    pub text: &'static str,
    pub text_halo: &'static str,
    pub polygon_outline: &'static str,
}

static LIGHT: Palette = Palette {
    background: "#f8f4f0",
    landcover: "#e0ecd4",
    water: "#a0c8f0",
    road_major: "#ffffff",
    road_minor: "#efefef",
    boundary: "#9e9cab",
    text: "#333333",
    text_halo: "#ffffff",
    polygon_outline: "#555555",
};

static DARK: Palette = Palette {
    background: "#1b1d22",
    landcover: "#22292a",
    water: "#0f2a3f",
    road_major: "#3b3f46",
    road_minor: "#2b2e33",
    boundary: "#5c5a66",
    text: "#e6e6e6",
    text_halo: "#111111",
    polygon_outline: "#bbbbbb",
};
