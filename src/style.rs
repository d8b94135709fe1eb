use geojson::{FeatureCollection, JsonObject};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::expression::Expression;

/// Renderer layer type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Background,
    Fill,
    Line,
    Circle,
    Symbol,
}

impl LayerType {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerType::Background => "background",
            LayerType::Fill => "fill",
            LayerType::Line => "line",
            LayerType::Circle => "circle",
            LayerType::Symbol => "symbol",
        }
    }
}

/// Declarative description of one style layer.
///
/// `z_order` controls paint order in the composed document independently of
/// where the layer was declared.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDef {
    pub id: String,
    pub layer_type: LayerType,
    pub z_order: i32,
    pub source: Option<String>,
    /// Layer name inside a vector tile source.
    pub source_layer: Option<String>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub filter: Option<Expression>,
    pub paint: BTreeMap<String, Expression>,
    pub layout: BTreeMap<String, Expression>,
}

impl LayerDef {
    pub fn new(id: impl Into<String>, layer_type: LayerType, z_order: i32) -> Self {
        Self {
            id: id.into(),
            layer_type,
            z_order,
            source: None,
            source_layer: None,
            min_zoom: None,
            max_zoom: None,
            filter: None,
            paint: BTreeMap::new(),
            layout: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_source_layer(mut self, source: &str, source_layer: &str) -> Self {
        self.source = Some(source.to_string());
        self.source_layer = Some(source_layer.to_string());
        self
    }

    pub fn with_zoom_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_zoom = min;
        self.max_zoom = max;
        self
    }

    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_paint(mut self, name: &str, value: impl Into<Expression>) -> Self {
        self.paint.insert(name.to_string(), value.into());
        self
    }

    pub fn with_layout(mut self, name: &str, value: impl Into<Expression>) -> Self {
        self.layout.insert(name.to_string(), value.into());
        self
    }

    /// Layers without an explicit `visibility` layout property are visible.
    pub fn is_visible(&self) -> bool {
        !matches!(
            self.layout.get("visibility"),
            Some(Expression::Literal(Value::String(v))) if v == "none"
        )
    }

    pub fn to_json(&self) -> Value {
        let mut layer = json!({
            "id": self.id,
            "type": self.layer_type.as_str(),
            "metadata": { "gridmap:z-order": self.z_order },
        });

        if let Some(source) = &self.source {
            layer["source"] = json!(source);
        }
        if let Some(source_layer) = &self.source_layer {
            layer["source-layer"] = json!(source_layer);
        }
        if let Some(min) = self.min_zoom {
            layer["minzoom"] = json!(min);
        }
        if let Some(max) = self.max_zoom {
            layer["maxzoom"] = json!(max);
        }
        if let Some(filter) = &self.filter {
            layer["filter"] = filter.to_json();
        }
        if !self.paint.is_empty() {
            layer["paint"] = properties_json(&self.paint);
        }
        if !self.layout.is_empty() {
            layer["layout"] = properties_json(&self.layout);
        }

        layer
    }
}

fn properties_json(props: &BTreeMap<String, Expression>) -> Value {
    Value::Object(
        props
            .iter()
            .map(|(name, expr)| (name.clone(), expr.to_json()))
            .collect(),
    )
}

/// A named data source referenced by layers.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDef {
    /// Remote vector tiles for the basemap.
    Vector {
        tiles: Vec<String>,
        max_zoom: u8,
        attribution: String,
    },
    /// Inline feature collection, replaced through "set data" calls.
    GeoJson { data: FeatureCollection },
}

impl SourceDef {
    pub fn empty_geojson() -> Self {
        SourceDef::GeoJson {
            data: FeatureCollection {
                bbox: None,
                features: vec![],
                foreign_members: None,
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SourceDef::Vector {
                tiles,
                max_zoom,
                attribution,
            } => json!({
                "type": "vector",
                "tiles": tiles,
                "maxzoom": max_zoom,
                "attribution": attribution,
            }),
            SourceDef::GeoJson { data } => json!({
                "type": "geojson",
                "data": Value::Object(JsonObject::from(data)),
            }),
        }
    }
}

/// The composed, ordered style handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDocument {
    pub name: String,
    pub sprite: String,
    pub glyphs: String,
    pub sources: BTreeMap<String, SourceDef>,
    pub layers: Vec<LayerDef>,
    pub metadata: Map<String, Value>,
}

impl StyleDocument {
    pub fn layer(&self, id: &str) -> Option<&LayerDef> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut LayerDef> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn to_json(&self) -> Value {
        let sources: Map<String, Value> = self
            .sources
            .iter()
            .map(|(id, source)| (id.clone(), source.to_json()))
            .collect();

        json!({
            "version": 8,
            "name": self.name,
            "metadata": self.metadata,
            "sprite": self.sprite,
            "glyphs": self.glyphs,
            "sources": sources,
            "layers": self.layers.iter().map(LayerDef::to_json).collect::<Vec<_>>(),
        })
    }

    pub fn to_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_json_carries_only_set_fields() {
        let layer = LayerDef::new("water", LayerType::Fill, 20)
            .with_source_layer("basemap", "water")
            .with_paint("fill-color", "#a0c8f0");
        let json = layer.to_json();

        assert_eq!(json["type"], "fill");
        assert_eq!(json["source-layer"], "water");
        assert_eq!(json["paint"]["fill-color"], "#a0c8f0");
        assert!(json.get("filter").is_none());
        assert!(json.get("layout").is_none());
    }

    #[test]
    fn visibility_reads_layout_property() {
        let layer = LayerDef::new("towers", LayerType::Circle, 250);
        assert!(layer.is_visible());
        assert!(!layer.with_layout("visibility", "none").is_visible());
    }

    #[test]
    fn empty_geojson_source_is_a_feature_collection() {
        let json = SourceDef::empty_geojson().to_json();
        assert_eq!(json["type"], "geojson");
        assert_eq!(json["data"]["type"], "FeatureCollection");
        assert_eq!(json["data"]["features"], json!([]));
    }
}
