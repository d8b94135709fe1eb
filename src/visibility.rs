//! User-toggleable visibility per voltage class and plant category.
//!
//! The controller owns only booleans. Each toggle is translated directly into
//! layer visibility and filter mutations on the map, so geometry is never
//! rebuilt. Layers that do not exist right now (for instance during a style
//! swap) are skipped; [`VisibilityController::apply`] replays the full state
//! once the new style is up.

use log::{debug, warn};
use serde_json::json;
use std::collections::BTreeMap;

use crate::colors::{PlantSource, VoltageClass};
use crate::expression::Expression;
use crate::layers::{TOWERS_LAYER, line_label_layer_id, line_layer_id, plant_layer_id};
use crate::map::MapSurface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityController {
    voltages: BTreeMap<VoltageClass, bool>,
    plant_types: BTreeMap<PlantSource, bool>,
}

impl Default for VisibilityController {
    fn default() -> Self {
        Self::new()
    }
}

fn visibility_value(visible: bool) -> Expression {
    Expression::lit(if visible { "visible" } else { "none" })
}

fn set_layer_visibility<M: MapSurface>(map: &mut M, layer_id: &str, visible: bool) {
    if !map.has_layer(layer_id) {
        debug!("Layer {} not on map, skipping visibility change", layer_id);
        return;
    }
    if let Err(e) = map.set_layout_property(layer_id, "visibility", visibility_value(visible)) {
        warn!("Failed to set visibility of {}: {}", layer_id, e);
    }
}

/// Plant layers toggle both `visibility` and `icon-opacity`.
fn set_plant_layer<M: MapSurface>(map: &mut M, source: PlantSource, visible: bool) {
    let layer_id = plant_layer_id(source);
    set_layer_visibility(map, &layer_id, visible);
    if !map.has_layer(&layer_id) {
        return;
    }
    let opacity = Expression::lit(if visible { 1.0 } else { 0.0 });
    if let Err(e) = map.set_paint_property(&layer_id, "icon-opacity", opacity) {
        warn!("Failed to set opacity of {}: {}", layer_id, e);
    }
}

impl VisibilityController {
    /// Everything visible except distribution-level lines.
    pub fn new() -> Self {
        Self {
            voltages: VoltageClass::ALL
                .iter()
                .map(|v| (*v, v.visible_by_default()))
                .collect(),
            plant_types: PlantSource::ALL.iter().map(|s| (*s, true)).collect(),
        }
    }

    pub fn is_voltage_visible(&self, voltage: VoltageClass) -> bool {
        self.voltages.get(&voltage).copied().unwrap_or(false)
    }

    pub fn is_plant_type_visible(&self, source: PlantSource) -> bool {
        self.plant_types.get(&source).copied().unwrap_or(false)
    }

    pub fn visible_voltages(&self) -> Vec<VoltageClass> {
        self.voltages
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(v, _)| *v)
            .collect()
    }

    /// Towers of visible voltages only. `None` when every voltage is visible,
    /// so large tower sets are not matched against a full list.
    pub fn tower_filter(&self) -> Option<Expression> {
        if self.voltages.values().all(|visible| *visible) {
            return None;
        }
        Some(Expression::property_in(
            "voltage",
            self.visible_voltages()
                .iter()
                .map(|v| json!(v.kv()))
                .collect(),
        ))
    }

    fn update_tower_filter<M: MapSurface>(&self, map: &mut M) {
        if !map.has_layer(TOWERS_LAYER) {
            debug!("Tower layer not on map, skipping filter update");
            return;
        }
        if let Err(e) = map.set_filter(TOWERS_LAYER, self.tower_filter()) {
            warn!("Failed to update tower filter: {}", e);
        }
    }

    fn apply_voltage<M: MapSurface>(&self, map: &mut M, voltage: VoltageClass) {
        let visible = self.is_voltage_visible(voltage);
        set_layer_visibility(map, &line_layer_id(voltage), visible);
        set_layer_visibility(map, &line_label_layer_id(voltage), visible);
    }

    pub fn toggle_voltage<M: MapSurface>(
        &mut self,
        map: &mut M,
        voltage: VoltageClass,
        visible: bool,
    ) {
        self.voltages.insert(voltage, visible);
        self.apply_voltage(map, voltage);
        self.update_tower_filter(map);
    }

    pub fn toggle_all<M: MapSurface>(&mut self, map: &mut M, visible: bool) {
        for v in VoltageClass::ALL {
            self.voltages.insert(v, visible);
            self.apply_voltage(map, v);
        }
        self.update_tower_filter(map);
    }

    pub fn toggle_plant_type<M: MapSurface>(
        &mut self,
        map: &mut M,
        source: PlantSource,
        visible: bool,
    ) {
        self.plant_types.insert(source, visible);
        set_plant_layer(map, source, visible);
    }

    /// Push the whole state onto the map, e.g. after a style swap.
    pub fn apply<M: MapSurface>(&self, map: &mut M) {
        for v in VoltageClass::ALL {
            self.apply_voltage(map, v);
        }
        self.update_tower_filter(map);
        for (source, visible) in &self.plant_types {
            set_plant_layer(map, *source, *visible);
        }
    }
}
