use log::debug;
use serde_json::{Map, json};
use std::collections::BTreeMap;

use crate::colors::{PlantSource, Theme, VoltageClass};
use crate::layers::{
    self, BASEMAP_SOURCE, POWER_PLANT_POLYGONS_FILL_LAYER, POWER_PLANT_POLYGONS_SOURCE,
    POWER_PLANTS_SOURCE, SUBSTATION_POLYGONS_FILL_LAYER, SUBSTATION_POLYGONS_SOURCE,
    SUBSTATIONS_LAYER, SUBSTATIONS_SOURCE, TOWERS_SOURCE, line_layer_id, line_source_id,
    plant_layer_id,
};
use crate::style::{LayerDef, SourceDef, StyleDocument};

/// Where the basemap tiles, glyphs and sprites live.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleOptions {
    pub theme: Theme,
    pub tile_source_url: String,
}

impl StyleOptions {
    pub fn new(theme: Theme, tile_source_url: &str) -> Self {
        Self {
            theme,
            tile_source_url: tile_source_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Every geometry source the power layers read, in a fixed order.
pub fn geometry_source_ids() -> Vec<String> {
    let mut ids: Vec<String> = VoltageClass::ALL.iter().map(|v| line_source_id(*v)).collect();
    ids.extend(
        [
            TOWERS_SOURCE,
            SUBSTATIONS_SOURCE,
            SUBSTATION_POLYGONS_SOURCE,
            POWER_PLANTS_SOURCE,
            POWER_PLANT_POLYGONS_SOURCE,
        ]
        .map(String::from),
    );
    ids
}

/// Layers the pointer hit-tests against, in no particular priority.
pub fn interactive_layer_ids() -> Vec<String> {
    let mut ids = vec![
        SUBSTATIONS_LAYER.to_string(),
        SUBSTATION_POLYGONS_FILL_LAYER.to_string(),
        POWER_PLANT_POLYGONS_FILL_LAYER.to_string(),
    ];
    ids.extend(PlantSource::ALL.iter().map(|s| plant_layer_id(*s)));
    ids.extend(VoltageClass::ALL.iter().map(|v| line_layer_id(*v)));
    ids
}

/// Merge the registry groups into one ordered style document.
///
/// Geometry sources start empty and are filled through "set data" once the
/// style has loaded. The result depends only on `options`, so composing twice
/// yields identical documents.
pub fn compose_style(options: &StyleOptions) -> StyleDocument {
    let palette = options.theme.palette();

    let mut merged: Vec<LayerDef> = layers::all_groups(palette)
        .into_iter()
        .flat_map(|group| {
            debug!("Registry group '{}': {} layers", group.name, group.layers.len());
            group.layers
        })
        .collect();
    // Stable: equal z-orders keep declaration order.
    merged.sort_by_key(|layer| layer.z_order);

    let mut sources = BTreeMap::new();
    sources.insert(
        BASEMAP_SOURCE.to_string(),
        SourceDef::Vector {
            tiles: vec![format!("{}/planet/{{z}}/{{x}}/{{y}}.pbf", options.tile_source_url)],
            max_zoom: 14,
            attribution: "© OpenMapTiles © OpenStreetMap contributors".to_string(),
        },
    );
    for id in geometry_source_ids() {
        sources.insert(id, SourceDef::empty_geojson());
    }

    let mut metadata = Map::new();
    metadata.insert("gridmap:theme".into(), json!(options.theme.as_str()));

    StyleDocument {
        name: format!("gridmap-{}", options.theme.as_str()),
        sprite: format!("{}/sprites/{}", options.tile_source_url, options.theme.as_str()),
        glyphs: format!("{}/fonts/{{fontstack}}/{{range}}.pbf", options.tile_source_url),
        sources,
        layers: merged,
        metadata,
    }
}
