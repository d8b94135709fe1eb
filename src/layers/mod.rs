//! Style registry: every layer the map can show, as pure data.
//!
//! Layers are grouped into base terrain, power infrastructure and text labels.
//! Each declaration carries its own z-order, so the order inside a group does
//! not decide paint order.

pub mod base;
pub mod labels;
pub mod power;

use crate::colors::{Palette, PlantSource, VoltageClass};
use crate::style::LayerDef;

pub const BASEMAP_SOURCE: &str = "basemap";
pub const TOWERS_SOURCE: &str = "towers";
pub const SUBSTATIONS_SOURCE: &str = "substations";
pub const SUBSTATION_POLYGONS_SOURCE: &str = "substation-polygons";
pub const POWER_PLANTS_SOURCE: &str = "power-plants";
pub const POWER_PLANT_POLYGONS_SOURCE: &str = "power-plant-polygons";

pub const TOWERS_LAYER: &str = "towers";
pub const SUBSTATIONS_LAYER: &str = "substations";
pub const SUBSTATION_POLYGONS_FILL_LAYER: &str = "substation-polygons-fill";
pub const SUBSTATION_POLYGONS_OUTLINE_LAYER: &str = "substation-polygons-outline";
pub const POWER_PLANT_POLYGONS_FILL_LAYER: &str = "power-plant-polygons-fill";
pub const POWER_PLANT_POLYGONS_OUTLINE_LAYER: &str = "power-plant-polygons-outline";
pub const SUBSTATION_LABELS_LAYER: &str = "substation-labels";
pub const POWER_PLANT_LABELS_LAYER: &str = "power-plant-labels";

/// One geometry source per voltage class.
pub fn line_source_id(voltage: VoltageClass) -> String {
    format!("lines-{}", voltage.kv())
}

pub fn line_layer_id(voltage: VoltageClass) -> String {
    format!("lines-{}", voltage.kv())
}

/// Label layer toggled together with [`line_layer_id`].
pub fn line_label_layer_id(voltage: VoltageClass) -> String {
    format!("lines-{}-labels", voltage.kv())
}

pub fn plant_layer_id(source: PlantSource) -> String {
    format!("power-plants-{}", source.as_str())
}

/// Named group of layer declarations.
pub struct LayerGroup {
    pub name: &'static str,
    pub layers: Vec<LayerDef>,
}

/// All registry groups for one palette, in declaration order.
pub fn all_groups(palette: &Palette) -> Vec<LayerGroup> {
    vec![
        LayerGroup {
            name: "base",
            layers: base::layers(palette),
        },
        LayerGroup {
            name: "power",
            layers: power::layers(palette),
        },
        LayerGroup {
            name: "labels",
            layers: labels::layers(palette),
        },
    ]
}
