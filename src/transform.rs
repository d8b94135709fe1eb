//! Geodata transformer: raw grid records to renderable feature collections.
//!
//! Every function here is pure. Records without usable geometry are logged and
//! contribute nothing; they never abort the transform.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoValue};
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::colors::{PlantSource, VoltageClass};
use crate::dataset::{Coordinate, GridDataset, PowerPlant, Substation, TransmissionLine};
use crate::geometry::{self, Bounds};
use crate::layers::{
    POWER_PLANT_POLYGONS_SOURCE, POWER_PLANTS_SOURCE, SUBSTATION_POLYGONS_SOURCE,
    SUBSTATIONS_SOURCE, TOWERS_SOURCE, line_source_id,
};

pub const KIND_SUBSTATION: &str = "substation";
pub const KIND_POWER_PLANT: &str = "power-plant";
pub const KIND_LINE: &str = "line";
pub const KIND_TOWER: &str = "tower";

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature(value: GeoValue, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Missing values are left out of the property bag rather than set to null.
fn put<T: Into<Value>>(props: &mut JsonObject, key: &str, value: Option<T>) {
    if let Some(v) = value {
        props.insert(key.to_string(), v.into());
    }
}

/// Point and area representations of one asset kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsAndPolygons {
    pub points: FeatureCollection,
    pub polygons: FeatureCollection,
}

/// Point position for an asset: centroid of its first non-empty relation,
/// else its own coordinates.
fn asset_position(relations: &[Vec<Coordinate>], own: Option<Coordinate>) -> Option<Coordinate> {
    relations
        .iter()
        .find_map(|r| geometry::centroid(r))
        .or(own)
}

fn polygon_features(
    relations: &[Vec<Coordinate>],
    props: &JsonObject,
    asset_id: &str,
) -> Vec<Feature> {
    relations
        .iter()
        .enumerate()
        .filter_map(|(idx, relation)| match geometry::closed_ring(relation) {
            Some(ring) => {
                let mut props = props.clone();
                props.insert("relation".into(), json!(idx));
                Some(feature(GeoValue::Polygon(vec![ring]), props))
            }
            None => {
                debug!(
                    "{} relation {} has {} points, rendering as point only",
                    asset_id,
                    idx,
                    relation.len()
                );
                None
            }
        })
        .collect()
}

pub fn substation_properties(s: &Substation) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("kind".into(), json!(KIND_SUBSTATION));
    props.insert("id".into(), json!(s.id));
    put(&mut props, "name", s.name.clone());
    put(&mut props, "voltage", s.primary_voltage());
    if !s.voltages.is_empty() {
        let joined: Vec<String> = s.voltages.iter().map(u32::to_string).collect();
        props.insert("voltages".into(), json!(joined.join("/")));
    }
    put(&mut props, "operator", s.operator.clone());
    put(&mut props, "type", s.kind.map(|k| k.as_str()));
    props
}

pub fn transform_substations(substations: &[Substation]) -> PointsAndPolygons {
    let mut points = Vec::with_capacity(substations.len());
    let mut polygons = Vec::new();
    let mut skipped = 0;

    for s in substations {
        let Some(position) = asset_position(&s.relations, s.position()) else {
            warn!("Substation {} has no usable geometry, skipping", s.id);
            skipped += 1;
            continue;
        };
        let props = substation_properties(s);
        polygons.extend(polygon_features(&s.relations, &props, &s.id));
        points.push(feature(GeoValue::Point(position.position()), props));
    }

    if skipped > 0 {
        warn!("Substations: {} rendered, {} skipped", points.len(), skipped);
    }

    PointsAndPolygons {
        points: collection(points),
        polygons: collection(polygons),
    }
}

pub fn plant_properties(p: &PowerPlant) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("kind".into(), json!(KIND_POWER_PLANT));
    props.insert("id".into(), json!(p.id));
    put(&mut props, "name", p.name.clone());
    put(&mut props, "source", p.source.clone());
    let category = PlantSource::classify(p.source.as_deref().unwrap_or_default());
    if category == PlantSource::Other {
        debug!(
            "Power plant {} has unrecognized source {:?}, using generic icon",
            p.id, p.source
        );
    }
    props.insert("category".into(), json!(category.as_str()));
    put(&mut props, "capacity", p.capacity);
    put(&mut props, "operator", p.operator.clone());
    put(&mut props, "method", p.method.clone());
    put(&mut props, "start_year", p.start_year);
    put(&mut props, "average_production", p.average_production);
    props
}

pub fn transform_power_plants(plants: &[PowerPlant]) -> PointsAndPolygons {
    let mut points = Vec::with_capacity(plants.len());
    let mut polygons = Vec::new();
    let mut skipped = 0;

    for p in plants {
        let Some(position) = asset_position(&p.relations, p.position()) else {
            warn!("Power plant {} has no usable geometry, skipping", p.id);
            skipped += 1;
            continue;
        };
        let props = plant_properties(p);
        polygons.extend(polygon_features(&p.relations, &props, &p.id));
        points.push(feature(GeoValue::Point(position.position()), props));
    }

    if skipped > 0 {
        warn!("Power plants: {} rendered, {} skipped", points.len(), skipped);
    }

    PointsAndPolygons {
        points: collection(points),
        polygons: collection(polygons),
    }
}

/// Line features partitioned by voltage, plus all towers of renderable
/// segments tagged with their parent voltage.
#[derive(Debug, Clone, PartialEq)]
pub struct LineCollections {
    pub by_voltage: BTreeMap<VoltageClass, FeatureCollection>,
    pub towers: FeatureCollection,
}

fn line_properties(voltage: VoltageClass, line: &TransmissionLine) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("kind".into(), json!(KIND_LINE));
    props.insert("id".into(), json!(line.id));
    put(&mut props, "name", line.name.clone());
    props.insert("voltage".into(), json!(voltage.kv()));
    put(&mut props, "operator", line.operator.clone());
    put(&mut props, "status", line.status.map(|s| s.as_str()));
    props
}

/// Segments with fewer than two towers are dropped together with their
/// towers, so no tower renders without a connecting line.
pub fn transform_lines<'a>(
    lines: impl IntoIterator<Item = (VoltageClass, &'a TransmissionLine)>,
) -> LineCollections {
    let mut by_voltage: BTreeMap<VoltageClass, Vec<Feature>> =
        VoltageClass::ALL.iter().map(|v| (*v, Vec::new())).collect();
    let mut towers = Vec::new();
    let mut dropped = 0;

    for (voltage, line) in lines {
        let base = line_properties(voltage, line);
        for (seg_idx, segment) in line.segments.iter().enumerate() {
            let coords: Vec<Vec<f64>> = segment
                .iter()
                .map(|t| t.coordinate())
                .filter(Coordinate::is_finite)
                .map(|c| c.position())
                .collect();
            if coords.len() < 2 {
                debug!(
                    "Line {} segment {} has {} towers, dropping",
                    line.id,
                    seg_idx,
                    coords.len()
                );
                dropped += 1;
                continue;
            }

            let mut props = base.clone();
            props.insert("segment".into(), json!(seg_idx));
            by_voltage
                .entry(voltage)
                .or_default()
                .push(feature(GeoValue::LineString(coords), props));

            for (idx, tower) in segment.iter().enumerate() {
                if !tower.coordinate().is_finite() {
                    continue;
                }
                let mut props = JsonObject::new();
                props.insert("kind".into(), json!(KIND_TOWER));
                put(&mut props, "id", tower.id.clone());
                props.insert("voltage".into(), json!(voltage.kv()));
                props.insert("line_id".into(), json!(line.id));
                put(&mut props, "line_name", line.name.clone());
                props.insert("segment".into(), json!(seg_idx));
                props.insert("index".into(), json!(idx));
                put(&mut props, "role", tower.role.map(|r| r.as_str()));
                put(&mut props, "height", tower.height);
                towers.push(feature(GeoValue::Point(tower.coordinate().position()), props));
            }
        }
    }

    if dropped > 0 {
        debug!("Dropped {} degenerate line segments", dropped);
    }

    LineCollections {
        by_voltage: by_voltage
            .into_iter()
            .map(|(v, features)| (v, collection(features)))
            .collect(),
        towers: collection(towers),
    }
}

/// Every geometry source of the map, derived from one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySet {
    pub lines: LineCollections,
    pub substations: PointsAndPolygons,
    pub power_plants: PointsAndPolygons,
}

impl GeometrySet {
    pub fn empty() -> Self {
        transform_dataset(&GridDataset::default())
    }

    /// `(source id, collection)` pairs matching the compositor's sources.
    pub fn sources(&self) -> Vec<(String, &FeatureCollection)> {
        let mut sources: Vec<(String, &FeatureCollection)> = self
            .lines
            .by_voltage
            .iter()
            .map(|(v, fc)| (line_source_id(*v), fc))
            .collect();
        sources.push((TOWERS_SOURCE.to_string(), &self.lines.towers));
        sources.push((SUBSTATIONS_SOURCE.to_string(), &self.substations.points));
        sources.push((
            SUBSTATION_POLYGONS_SOURCE.to_string(),
            &self.substations.polygons,
        ));
        sources.push((POWER_PLANTS_SOURCE.to_string(), &self.power_plants.points));
        sources.push((
            POWER_PLANT_POLYGONS_SOURCE.to_string(),
            &self.power_plants.polygons,
        ));
        sources
    }

    pub fn feature_count(&self) -> usize {
        self.sources().iter().map(|(_, fc)| fc.features.len()).sum()
    }

    /// Extent of every position in every source.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        let mut visit = |p: &[f64]| {
            bounds = Some(match bounds {
                Some(mut b) => {
                    b.extend(p);
                    b
                }
                None => Bounds::of_position(p),
            });
        };
        for (_, fc) in self.sources() {
            for geom in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
                match &geom.value {
                    GeoValue::Point(p) => visit(p),
                    GeoValue::LineString(line) => line.iter().for_each(|p| visit(p)),
                    GeoValue::Polygon(rings) => rings.iter().flatten().for_each(|p| visit(p)),
                    _ => {}
                }
            }
        }
        bounds
    }
}

pub fn transform_dataset(dataset: &GridDataset) -> GeometrySet {
    let set = GeometrySet {
        lines: transform_lines(dataset.lines()),
        substations: transform_substations(&dataset.substations),
        power_plants: transform_power_plants(&dataset.power_plants),
    };
    for (id, fc) in set.sources() {
        debug!("Source {}: {} features", id, fc.features.len());
    }
    info!("Transformed dataset into {} features", set.feature_count());
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Tower;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng)
    }

    fn tower(lat: f64, lng: f64) -> Tower {
        Tower {
            id: None,
            lat,
            lng,
            height: None,
            role: None,
        }
    }

    fn substation(id: &str, relations: Vec<Vec<Coordinate>>) -> Substation {
        Substation {
            id: id.into(),
            name: Some(format!("TS {id}")),
            voltages: vec![220, 110],
            operator: Some("HOPS".into()),
            kind: None,
            lat: None,
            lng: None,
            relations,
        }
    }

    fn line(id: &str, segments: Vec<Vec<Tower>>) -> TransmissionLine {
        TransmissionLine {
            id: id.into(),
            name: None,
            voltage: None,
            operator: None,
            status: None,
            segments,
        }
    }

    fn geometry_of(f: &Feature) -> &GeoValue {
        &f.geometry.as_ref().unwrap().value
    }

    #[test]
    fn one_point_per_substation_with_geometry() {
        let square = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0), c(1.0, 0.0)];
        let out = transform_substations(&[
            substation("a", vec![square.clone(), square]),
            substation("b", vec![vec![c(2.0, 2.0)]]),
            substation("c", vec![]),
            substation("d", vec![vec![]]),
        ]);

        assert_eq!(out.points.features.len(), 2);
        assert_eq!(out.polygons.features.len(), 2);
        assert_eq!(geometry_of(&out.points.features[0]), &GeoValue::Point(vec![0.5, 0.5]));
        assert_eq!(geometry_of(&out.points.features[1]), &GeoValue::Point(vec![2.0, 2.0]));
    }

    #[test]
    fn every_polygon_ring_is_closed() {
        let out = transform_substations(&[substation(
            "a",
            vec![
                vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)],
                vec![c(5.0, 5.0), c(5.0, 6.0), c(6.0, 6.0), c(5.0, 5.0)],
            ],
        )]);
        for f in &out.polygons.features {
            let GeoValue::Polygon(rings) = geometry_of(f) else {
                panic!("expected polygon");
            };
            assert_eq!(rings[0].first(), rings[0].last());
        }
    }

    #[test]
    fn own_position_is_used_without_relations() {
        let mut s = substation("a", vec![]);
        s.lat = Some(45.8);
        s.lng = Some(15.9);
        let out = transform_substations(&[s]);
        assert_eq!(
            geometry_of(&out.points.features[0]),
            &GeoValue::Point(vec![15.9, 45.8])
        );
        assert!(out.polygons.features.is_empty());
    }

    #[test]
    fn substation_properties_feed_the_popup() {
        let out = transform_substations(&[substation("a", vec![vec![c(1.0, 1.0)]])]);
        let props = out.points.features[0].properties.as_ref().unwrap();
        assert_eq!(props["kind"], KIND_SUBSTATION);
        assert_eq!(props["name"], "TS a");
        assert_eq!(props["voltage"], 220);
        assert_eq!(props["voltages"], "220/110");
        assert_eq!(props["operator"], "HOPS");
        assert!(!props.contains_key("type"));
    }

    #[test]
    fn segments_land_in_exactly_one_voltage_collection() {
        let a = line("a", vec![vec![tower(0.0, 0.0), tower(0.0, 1.0)]]);
        let b = line(
            "b",
            vec![
                vec![tower(1.0, 0.0), tower(1.0, 1.0), tower(1.0, 2.0)],
                vec![tower(2.0, 0.0), tower(2.0, 1.0)],
            ],
        );
        let out = transform_lines([(VoltageClass::Kv400, &a), (VoltageClass::Kv110, &b)]);

        assert_eq!(out.by_voltage.len(), VoltageClass::ALL.len());
        assert_eq!(out.by_voltage[&VoltageClass::Kv400].features.len(), 1);
        assert_eq!(out.by_voltage[&VoltageClass::Kv110].features.len(), 2);
        assert!(out.by_voltage[&VoltageClass::Kv220].features.is_empty());
        assert!(out.by_voltage[&VoltageClass::Kv22].features.is_empty());
        assert_eq!(out.towers.features.len(), 7);

        let props = out.by_voltage[&VoltageClass::Kv110].features[1]
            .properties
            .as_ref()
            .unwrap();
        assert_eq!(props["segment"], 1);
        assert_eq!(props["voltage"], 110);
    }

    #[test]
    fn degenerate_segment_yields_no_line_and_no_orphan_tower() {
        let lonely = line("x", vec![vec![tower(3.0, 3.0)]]);
        let out = transform_lines([(VoltageClass::Kv220, &lonely)]);
        assert!(out.by_voltage.values().all(|fc| fc.features.is_empty()));
        assert!(out.towers.features.is_empty());
    }

    #[test]
    fn towers_carry_parent_back_reference() {
        let mut l = line("l7", vec![vec![tower(0.0, 0.0), tower(0.0, 1.0)]]);
        l.name = Some("Melina - Tumbri".into());
        let out = transform_lines([(VoltageClass::Kv400, &l)]);
        let props = out.towers.features[1].properties.as_ref().unwrap();
        assert_eq!(props["line_id"], "l7");
        assert_eq!(props["line_name"], "Melina - Tumbri");
        assert_eq!(props["voltage"], 400);
        assert_eq!(props["index"], 1);
    }

    #[test]
    fn plants_get_category_and_fallback() {
        let plant = |id: &str, source: Option<&str>| PowerPlant {
            id: id.into(),
            name: None,
            source: source.map(String::from),
            capacity: Some(12.0),
            operator: None,
            method: None,
            start_year: None,
            average_production: None,
            lat: Some(45.0),
            lng: Some(16.0),
            relations: vec![],
        };
        let out = transform_power_plants(&[
            plant("p1", Some("Hydro")),
            plant("p2", Some("tidal")),
            plant("p3", None),
        ]);
        let categories: Vec<&Value> = out
            .points
            .features
            .iter()
            .map(|f| &f.properties.as_ref().unwrap()["category"])
            .collect();
        assert_eq!(categories, vec!["hydro", "other", "other"]);
    }

    #[test]
    fn geometry_set_exposes_every_source_once() {
        let set = GeometrySet::empty();
        let ids: Vec<String> = set.sources().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, crate::compositor::geometry_source_ids());
        assert_eq!(set.feature_count(), 0);
        assert_eq!(set.bounds(), None);
    }
}
