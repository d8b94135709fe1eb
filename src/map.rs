//! The rendering surface boundary.
//!
//! [`MapSurface`] is the subset of a live map's API the controllers drive.
//! [`StyleMap`] implements it in memory on top of a [`StyleDocument`]; the
//! binary uses it to produce a fully attached style, and tests use it to
//! observe mutations.

use geojson::{FeatureCollection, JsonObject, Value as GeoValue};
use log::debug;
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{MapError, Result};
use crate::expression::{CompareOp, Expression};
use crate::geometry;
use crate::style::{LayerDef, SourceDef, StyleDocument};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// A feature as returned by hit-testing: where it was drawn and its property
/// bag. Raw records are never reachable from here.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub source_id: String,
    pub properties: JsonObject,
}

/// Style load progress. Every style replacement starts a new generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadState {
    pub generation: u64,
    pub loaded: bool,
}

/// "Style finished loading" notifications, observable through `watch`.
#[derive(Debug, Clone)]
pub struct LoadSignal {
    tx: Arc<watch::Sender<LoadState>>,
}

impl Default for LoadSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadState {
            generation: 0,
            loaded: false,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Start loading a new style; returns its generation.
    pub fn begin(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            state.generation += 1;
            state.loaded = false;
            generation = state.generation;
        });
        generation
    }

    /// Mark the current generation as loaded.
    pub fn complete(&self) {
        self.tx.send_modify(|state| state.loaded = true);
    }

    pub fn state(&self) -> LoadState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.tx.subscribe()
    }
}

pub trait MapSurface {
    /// Replace the whole style. Prior sources and their data are discarded and
    /// loading restarts.
    fn set_style(&mut self, style: StyleDocument);

    fn is_style_loaded(&self) -> bool;

    fn load_events(&self) -> watch::Receiver<LoadState>;

    fn has_layer(&self, layer_id: &str) -> bool;

    fn set_layout_property(&mut self, layer_id: &str, name: &str, value: Expression)
    -> Result<()>;

    fn layout_property(&self, layer_id: &str, name: &str) -> Option<Expression>;

    fn set_paint_property(&mut self, layer_id: &str, name: &str, value: Expression) -> Result<()>;

    fn set_filter(&mut self, layer_id: &str, filter: Option<Expression>) -> Result<()>;

    fn filter(&self, layer_id: &str) -> Option<Expression>;

    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection) -> Result<()>;

    /// Features drawn within `tolerance_px` of `at` on the given layers,
    /// topmost layer first.
    fn query_rendered_features(
        &self,
        at: LngLat,
        tolerance_px: f64,
        layer_ids: &[String],
    ) -> Vec<RenderedFeature>;
}

/// In-memory map surface.
pub struct StyleMap {
    style: StyleDocument,
    zoom: f64,
    signal: LoadSignal,
    instant_load: bool,
}

impl StyleMap {
    /// Starts loading `style`; call [`LoadSignal::complete`] to finish.
    pub fn new(style: StyleDocument) -> Self {
        let signal = LoadSignal::new();
        signal.begin();
        Self {
            style,
            zoom: 7.0,
            signal,
            instant_load: false,
        }
    }

    /// Every style finishes loading as soon as it is set.
    pub fn with_instant_load(mut self) -> Self {
        self.instant_load = true;
        self.signal.complete();
        self
    }

    pub fn load_signal(&self) -> LoadSignal {
        self.signal.clone()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn style(&self) -> &StyleDocument {
        &self.style
    }

    fn loaded_layer_mut(&mut self, layer_id: &str) -> Result<&mut LayerDef> {
        if !self.is_style_loaded() {
            return Err(MapError::UnknownLayer(layer_id.to_string()));
        }
        self.style
            .layer_mut(layer_id)
            .ok_or_else(|| MapError::UnknownLayer(layer_id.to_string()))
    }

    fn layer_shown(&self, layer: &LayerDef) -> bool {
        layer.is_visible()
            && layer.min_zoom.is_none_or(|min| self.zoom >= min)
            && layer.max_zoom.is_none_or(|max| self.zoom < max)
    }
}

impl MapSurface for StyleMap {
    fn set_style(&mut self, style: StyleDocument) {
        debug!("Replacing style with '{}'", style.name);
        self.style = style;
        self.signal.begin();
        if self.instant_load {
            self.signal.complete();
        }
    }

    fn is_style_loaded(&self) -> bool {
        self.signal.state().loaded
    }

    fn load_events(&self) -> watch::Receiver<LoadState> {
        self.signal.subscribe()
    }

    fn has_layer(&self, layer_id: &str) -> bool {
        self.is_style_loaded() && self.style.layer(layer_id).is_some()
    }

    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Expression,
    ) -> Result<()> {
        self.loaded_layer_mut(layer_id)?
            .layout
            .insert(name.to_string(), value);
        Ok(())
    }

    fn layout_property(&self, layer_id: &str, name: &str) -> Option<Expression> {
        self.style.layer(layer_id)?.layout.get(name).cloned()
    }

    fn set_paint_property(&mut self, layer_id: &str, name: &str, value: Expression) -> Result<()> {
        self.loaded_layer_mut(layer_id)?
            .paint
            .insert(name.to_string(), value);
        Ok(())
    }

    fn set_filter(&mut self, layer_id: &str, filter: Option<Expression>) -> Result<()> {
        self.loaded_layer_mut(layer_id)?.filter = filter;
        Ok(())
    }

    fn filter(&self, layer_id: &str) -> Option<Expression> {
        self.style.layer(layer_id)?.filter.clone()
    }

    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection) -> Result<()> {
        if !self.is_style_loaded() {
            return Err(MapError::SourceUpdate {
                source_id: source_id.to_string(),
                reason: "style is not done loading".to_string(),
            });
        }
        match self.style.sources.get_mut(source_id) {
            Some(SourceDef::GeoJson { data: current }) => {
                *current = data.clone();
                Ok(())
            }
            Some(SourceDef::Vector { .. }) => Err(MapError::SourceUpdate {
                source_id: source_id.to_string(),
                reason: "not a geojson source".to_string(),
            }),
            None => Err(MapError::UnknownSource(source_id.to_string())),
        }
    }

    fn query_rendered_features(
        &self,
        at: LngLat,
        tolerance_px: f64,
        layer_ids: &[String],
    ) -> Vec<RenderedFeature> {
        if !self.is_style_loaded() {
            return Vec::new();
        }
        // 512px tiles at the current zoom.
        let tolerance = tolerance_px * 360.0 / (512.0 * 2f64.powf(self.zoom));
        let point = [at.lng, at.lat];

        let mut layers: Vec<&LayerDef> = layer_ids
            .iter()
            .filter_map(|id| self.style.layer(id))
            .filter(|layer| self.layer_shown(layer))
            .collect();
        layers.sort_by_key(|layer| std::cmp::Reverse(layer.z_order));

        let mut hits = Vec::new();
        for layer in layers {
            let Some(source_id) = &layer.source else {
                continue;
            };
            let Some(SourceDef::GeoJson { data }) = self.style.sources.get(source_id) else {
                continue;
            };
            for feature in &data.features {
                let (Some(geom), Some(props)) = (&feature.geometry, &feature.properties) else {
                    continue;
                };
                if let Some(filter) = &layer.filter {
                    if !truthy(&evaluate(filter, props, self.zoom)) {
                        continue;
                    }
                }
                if hit(&geom.value, &point, tolerance) {
                    hits.push(RenderedFeature {
                        layer_id: layer.id.clone(),
                        source_id: source_id.clone(),
                        properties: props.clone(),
                    });
                }
            }
        }
        hits
    }
}

fn hit(value: &GeoValue, p: &[f64], tolerance: f64) -> bool {
    match value {
        GeoValue::Point(q) => geometry::point_distance(p, q) <= tolerance,
        GeoValue::MultiPoint(qs) => qs.iter().any(|q| geometry::point_distance(p, q) <= tolerance),
        GeoValue::LineString(line) => geometry::polyline_distance(p, line) <= tolerance,
        GeoValue::MultiLineString(lines) => lines
            .iter()
            .any(|line| geometry::polyline_distance(p, line) <= tolerance),
        GeoValue::Polygon(rings) => polygon_hit(rings, p, tolerance),
        GeoValue::MultiPolygon(polys) => polys.iter().any(|rings| polygon_hit(rings, p, tolerance)),
        GeoValue::GeometryCollection(geoms) => geoms.iter().any(|g| hit(&g.value, p, tolerance)),
    }
}

fn polygon_hit(rings: &[Vec<Vec<f64>>], p: &[f64], tolerance: f64) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    geometry::point_in_ring(p, outer) || geometry::polyline_distance(p, outer) <= tolerance
}

fn truthy(v: &Value) -> bool {
    matches!(v, Value::Bool(true))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Approximate evaluation of the expressions this crate emits, used by
/// [`StyleMap`] to honor layer filters while hit-testing.
pub fn evaluate(expr: &Expression, props: &JsonObject, zoom: f64) -> Value {
    match expr {
        Expression::Literal(v) => v.clone(),
        Expression::Get(key) => props.get(key).cloned().unwrap_or(Value::Null),
        Expression::Zoom => json!(zoom),
        Expression::Interpolate { input, stops } => {
            let Some(x) = evaluate(input, props, zoom).as_f64() else {
                return Value::Null;
            };
            let outputs: Vec<(f64, Value)> = stops
                .iter()
                .map(|(stop, out)| (*stop, evaluate(out, props, zoom)))
                .collect();
            match outputs.iter().position(|(stop, _)| x < *stop) {
                Some(0) => outputs[0].1.clone(),
                None => outputs.last().map(|(_, v)| v.clone()).unwrap_or(Value::Null),
                Some(i) => {
                    let (x0, y0) = &outputs[i - 1];
                    let (x1, y1) = &outputs[i];
                    match (y0.as_f64(), y1.as_f64()) {
                        (Some(a), Some(b)) => json!(a + (b - a) * (x - x0) / (x1 - x0)),
                        _ => y0.clone(),
                    }
                }
            }
        }
        Expression::Case { branches, fallback } => branches
            .iter()
            .find(|(cond, _)| truthy(&evaluate(cond, props, zoom)))
            .map(|(_, out)| evaluate(out, props, zoom))
            .unwrap_or_else(|| evaluate(fallback, props, zoom)),
        Expression::Match {
            input,
            arms,
            fallback,
        } => {
            let v = evaluate(input, props, zoom);
            arms.iter()
                .find(|(label, _)| match label {
                    Value::Array(labels) => labels.iter().any(|l| values_equal(l, &v)),
                    label => values_equal(label, &v),
                })
                .map(|(_, out)| evaluate(out, props, zoom))
                .unwrap_or_else(|| evaluate(fallback, props, zoom))
        }
        Expression::Coalesce(items) => items
            .iter()
            .map(|item| evaluate(item, props, zoom))
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null),
        Expression::Compare { op, left, right } => {
            let (l, r) = (evaluate(left, props, zoom), evaluate(right, props, zoom));
            let result = match op {
                CompareOp::Eq => values_equal(&l, &r),
                CompareOp::Ne => !values_equal(&l, &r),
                CompareOp::Lt => compare_values(&l, &r) == Some(Ordering::Less),
                CompareOp::Le => matches!(
                    compare_values(&l, &r),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                CompareOp::Gt => compare_values(&l, &r) == Some(Ordering::Greater),
                CompareOp::Ge => matches!(
                    compare_values(&l, &r),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
            };
            Value::Bool(result)
        }
        Expression::In { needle, haystack } => {
            let v = evaluate(needle, props, zoom);
            Value::Bool(haystack.iter().any(|h| values_equal(h, &v)))
        }
        Expression::All(items) => {
            Value::Bool(items.iter().all(|i| truthy(&evaluate(i, props, zoom))))
        }
        Expression::Any(items) => {
            Value::Bool(items.iter().any(|i| truthy(&evaluate(i, props, zoom))))
        }
        Expression::Call(op, args) => match (op.as_str(), args.as_slice()) {
            ("-", [only]) => evaluate(only, props, zoom)
                .as_f64()
                .map(|x| json!(-x))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
    }
}
