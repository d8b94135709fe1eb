//! Raw grid dataset as bundled with the site.
//!
//! The document holds substations, power plants and one transmission-line
//! array per voltage class:
//!
//! ```json
//! {
//!   "substations": [ ... ],
//!   "powerPlants": [ ... ],
//!   "lines400": [ ... ], "lines220": [ ... ], "lines110": [ ... ],
//!   "lines22": [ ... ]
//! }
//! ```
//!
//! Parsing is lenient per record. A record that does not fit its shape is
//! logged and dropped; a missing or non-numeric coordinate reads as NaN and
//! is filtered out by the transformer with the geometry it belongs to.

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::colors::VoltageClass;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub lng: f64,
}

fn nan() -> f64 {
    f64::NAN
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NAN))
}

/// Keep every element that parses as `T`; log and drop the rest.
fn lenient_records<'de, D, T>(d: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed record #{}: {}", idx, e);
                None
            }
        })
        .collect())
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// GeoJSON position order: longitude first.
    pub fn position(&self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Ordered ring of coordinates outlining one physical part of an asset.
pub type SpatialRelation = Vec<Coordinate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerRole {
    Suspension,
    Tension,
    Terminal,
    Connection,
    #[serde(other)]
    Unknown,
}

impl TowerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TowerRole::Suspension => "suspension",
            TowerRole::Tension => "tension",
            TowerRole::Terminal => "terminal",
            TowerRole::Connection => "connection",
            TowerRole::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub lng: f64,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub role: Option<TowerRole>,
}

impl Tower {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    Active,
    Maintenance,
    Planned,
    #[serde(other)]
    Unknown,
}

impl LineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStatus::Active => "active",
            LineStatus::Maintenance => "maintenance",
            LineStatus::Planned => "planned",
            LineStatus::Unknown => "unknown",
        }
    }
}

/// A polyline of towers.
pub type Segment = Vec<Tower>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLine {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Declared kV. Overrides the class of the array the line was listed
    /// under when it names a supported class.
    #[serde(default)]
    pub voltage: Option<u32>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub status: Option<LineStatus>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl TransmissionLine {
    pub fn voltage_class(&self) -> Option<VoltageClass> {
        self.voltage.and_then(VoltageClass::from_kv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstationKind {
    Distribution,
    Transmission,
    Interconnection,
    #[serde(other)]
    Unknown,
}

impl SubstationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubstationKind::Distribution => "distribution",
            SubstationKind::Transmission => "transmission",
            SubstationKind::Interconnection => "interconnection",
            SubstationKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substation {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Declared levels in kV; the first one drives styling.
    #[serde(default)]
    pub voltages: Vec<u32>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<SubstationKind>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub relations: Vec<SpatialRelation>,
}

impl Substation {
    pub fn primary_voltage(&self) -> Option<u32> {
        self.voltages.first().copied()
    }

    pub fn position(&self) -> Option<Coordinate> {
        own_position(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPlant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form source category, see [`crate::colors::PlantSource`].
    #[serde(default)]
    pub source: Option<String>,
    /// Installed capacity in MW.
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub start_year: Option<i32>,
    /// Average yearly production in GWh.
    #[serde(default)]
    pub average_production: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub relations: Vec<SpatialRelation>,
}

impl PowerPlant {
    pub fn position(&self) -> Option<Coordinate> {
        own_position(self.lat, self.lng)
    }
}

fn own_position(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinate> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)).filter(Coordinate::is_finite),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDataset {
    #[serde(default, deserialize_with = "lenient_records")]
    pub substations: Vec<Substation>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub power_plants: Vec<PowerPlant>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub lines400: Vec<TransmissionLine>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub lines220: Vec<TransmissionLine>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub lines110: Vec<TransmissionLine>,
    #[serde(default, deserialize_with = "lenient_records")]
    pub lines22: Vec<TransmissionLine>,
}

impl GridDataset {
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: Self = serde_json::from_str(json)?;
        for (class, line) in dataset.lines() {
            if let Some(kv) = line.voltage.filter(|_| line.voltage_class().is_none()) {
                warn!(
                    "Line {} declares unsupported {} kV, keeping it at {}",
                    line.id, kv, class
                );
            }
        }
        Ok(dataset)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let dataset = Self::from_json(&fs::read_to_string(path)?)?;
        info!(
            "Loaded dataset {}: {} substations, {} power plants, {} lines",
            path.display(),
            dataset.substations.len(),
            dataset.power_plants.len(),
            dataset.lines().count()
        );
        Ok(dataset)
    }

    /// Every line paired with its effective voltage class.
    pub fn lines(&self) -> impl Iterator<Item = (VoltageClass, &TransmissionLine)> {
        [
            (VoltageClass::Kv400, &self.lines400),
            (VoltageClass::Kv220, &self.lines220),
            (VoltageClass::Kv110, &self.lines110),
            (VoltageClass::Kv22, &self.lines22),
        ]
        .into_iter()
        .flat_map(|(class, lines)| {
            lines
                .iter()
                .map(move |line| (line.voltage_class().unwrap_or(class), line))
        })
    }
}
