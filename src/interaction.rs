//! Click routing: pick one feature out of overlapping hits and build its
//! detail view.
//!
//! Priority is strict and first match wins: substations, then power plants,
//! then transmission lines. Point assets are small and sit on top of thick
//! line geometry, so they must not lose clicks to the lines beneath them.

use log::debug;

use crate::compositor::interactive_layer_ids;
use crate::layers::{
    POWER_PLANT_POLYGONS_SOURCE, POWER_PLANTS_SOURCE, SUBSTATION_POLYGONS_SOURCE,
    SUBSTATIONS_SOURCE,
};
use crate::logos::LogoTable;
use crate::map::{LngLat, MapSurface, RenderedFeature};
use crate::popup::{DetailView, LineDetail, PlantDetail, SubstationDetail};
use crate::util::prop_text;

/// Default pointer tolerance in pixels.
pub const CLICK_TOLERANCE_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FeatureKind {
    Substation,
    PowerPlant,
    Line,
}

impl FeatureKind {
    /// Classify by the source the feature was drawn from.
    pub fn of(feature: &RenderedFeature) -> Option<Self> {
        match feature.source_id.as_str() {
            SUBSTATIONS_SOURCE | SUBSTATION_POLYGONS_SOURCE => Some(FeatureKind::Substation),
            POWER_PLANTS_SOURCE | POWER_PLANT_POLYGONS_SOURCE => Some(FeatureKind::PowerPlant),
            s if s.starts_with("lines-") => Some(FeatureKind::Line),
            _ => None,
        }
    }
}

pub struct InteractionRouter {
    logos: LogoTable,
    layer_ids: Vec<String>,
    tolerance_px: f64,
}

impl InteractionRouter {
    pub fn new(logos: LogoTable) -> Self {
        Self {
            logos,
            layer_ids: interactive_layer_ids(),
            tolerance_px: CLICK_TOLERANCE_PX,
        }
    }

    pub fn with_tolerance(mut self, tolerance_px: f64) -> Self {
        self.tolerance_px = tolerance_px;
        self
    }

    pub fn logos(&self) -> &LogoTable {
        &self.logos
    }

    /// Pick the highest-priority hit; within one kind the first hit (topmost)
    /// wins.
    pub fn route(&self, hits: &[RenderedFeature]) -> Option<DetailView> {
        let (kind, feature) = [FeatureKind::Substation, FeatureKind::PowerPlant, FeatureKind::Line]
            .into_iter()
            .find_map(|kind| {
                hits.iter()
                    .find(|f| FeatureKind::of(f) == Some(kind))
                    .map(|f| (kind, f))
            })?;

        debug!(
            "Routing click to {:?} from layer {} ({} hits)",
            kind,
            feature.layer_id,
            hits.len()
        );

        let props = &feature.properties;
        let view = match kind {
            FeatureKind::Substation => {
                let logos = self.logos.resolve(prop_text(props, "operator").as_deref());
                DetailView::Substation(SubstationDetail::from_properties(props, logos))
            }
            FeatureKind::PowerPlant => {
                let logos = self.logos.resolve(prop_text(props, "operator").as_deref());
                DetailView::PowerPlant(PlantDetail::from_properties(props, logos))
            }
            FeatureKind::Line => DetailView::Line(LineDetail::from_properties(props)),
        };
        Some(view)
    }

    /// Hit-test the map at `at` and route the result.
    pub fn handle_click<M: MapSurface>(&self, map: &M, at: LngLat) -> Option<DetailView> {
        let hits = map.query_rendered_features(at, self.tolerance_px, &self.layer_ids);
        self.route(&hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::VoltageClass;
    use crate::layers::{SUBSTATIONS_LAYER, line_layer_id, line_source_id};
    use crate::popup::UNKNOWN;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    fn rendered(layer: &str, source: &str, props: Value) -> RenderedFeature {
        RenderedFeature {
            layer_id: layer.to_string(),
            source_id: source.to_string(),
            properties: props.as_object().cloned().unwrap(),
        }
    }

    fn router() -> InteractionRouter {
        let mut logos = BTreeMap::new();
        logos.insert("HOPS".to_string(), "logos/hops.svg".to_string());
        logos.insert("HEP".to_string(), "logos/hep.svg".to_string());
        InteractionRouter::new(LogoTable::new(logos))
    }

    fn line_hit() -> RenderedFeature {
        let v = VoltageClass::Kv400;
        rendered(
            &line_layer_id(v),
            &line_source_id(v),
            json!({"kind": "line", "name": "DV 400 kV", "voltage": 400}),
        )
    }

    #[test]
    fn substation_beats_line_regardless_of_order() {
        let hits = vec![
            line_hit(),
            rendered(
                SUBSTATIONS_LAYER,
                SUBSTATIONS_SOURCE,
                json!({"name": "TS Ernestinovo", "operator": "HOPS", "voltage": 400}),
            ),
        ];
        match router().route(&hits) {
            Some(DetailView::Substation(d)) => {
                assert_eq!(d.name, "TS Ernestinovo");
                assert_eq!(d.logos.len(), 1);
            }
            other => panic!("expected substation view, got {other:?}"),
        }
    }

    #[test]
    fn plant_beats_line_but_not_substation() {
        let plant = rendered(
            "power-plants-hydro",
            POWER_PLANTS_SOURCE,
            json!({"name": "HE Dubrava", "operator": "HEP/GEN energija"}),
        );
        match router().route(&[line_hit(), plant.clone()]) {
            Some(DetailView::PowerPlant(d)) => {
                assert_eq!(d.name, "HE Dubrava");
                assert_eq!(d.logos.len(), 1);
            }
            other => panic!("expected plant view, got {other:?}"),
        }

        let polygon = rendered(
            "substation-polygons-fill",
            SUBSTATION_POLYGONS_SOURCE,
            json!({"name": "TS Tumbri"}),
        );
        assert!(matches!(
            router().route(&[plant, polygon]),
            Some(DetailView::Substation(_))
        ));
    }

    #[test]
    fn line_only_hit_emits_line_view() {
        match router().route(&[line_hit()]) {
            Some(DetailView::Line(d)) => {
                assert_eq!(d.voltage, "400 kV");
                assert_eq!(d.operator, UNKNOWN);
            }
            other => panic!("expected line view, got {other:?}"),
        }
    }

    #[test]
    fn no_hits_no_action() {
        assert_eq!(router().route(&[]), None);
        let tower = rendered("towers", "towers", json!({"kind": "tower"}));
        assert_eq!(router().route(&[tower]), None);
    }

    #[test]
    fn unknown_operator_renders_placeholder() {
        let hit = rendered(
            SUBSTATIONS_LAYER,
            SUBSTATIONS_SOURCE,
            json!({"name": "TS X", "operator": "UnknownCo"}),
        );
        match router().route(&[hit]) {
            Some(DetailView::Substation(d)) => {
                assert!(d.logos.is_empty());
                assert_eq!(d.operator, "UnknownCo");
            }
            other => panic!("expected substation view, got {other:?}"),
        }
    }
}
