use crate::colors::{Palette, VoltageClass};
use crate::expression::Expression;
use crate::layers::power::voltage_color_expression;
use crate::layers::{
    BASEMAP_SOURCE, POWER_PLANT_LABELS_LAYER, POWER_PLANTS_SOURCE, SUBSTATION_LABELS_LAYER,
    SUBSTATIONS_SOURCE, line_label_layer_id, line_source_id,
};
use crate::style::{LayerDef, LayerType};

/// Zoom-dependent label density.
///
/// A label shows when its value exceeds `always_above`, or when the zoom has
/// reached a tier's minimum and the value exceeds that tier's threshold, or
/// once the zoom is past `show_all_above_zoom`.
#[derive(Debug)]
pub struct LabelTiers {
    pub property: &'static str,
    pub always_above: f64,
    /// `(min_zoom, value_above)`, thresholds descending as zoom increases.
    pub tiers: &'static [(f64, f64)],
    pub show_all_above_zoom: f64,
}

/// Plant labels keyed on installed capacity (MW).
pub const PLANT_LABEL_TIERS: LabelTiers = LabelTiers {
    property: "capacity",
    always_above: 1000.0,
    tiers: &[
        (5.0, 750.0),
        (6.0, 500.0),
        (7.0, 250.0),
        (8.0, 100.0),
        (9.0, 50.0),
        (10.0, 10.0),
    ],
    show_all_above_zoom: 11.0,
};

/// Substation labels keyed on primary voltage (kV).
pub const SUBSTATION_LABEL_TIERS: LabelTiers = LabelTiers {
    property: "voltage",
    always_above: 220.0,
    tiers: &[(7.0, 110.0), (9.0, 22.0)],
    show_all_above_zoom: 11.0,
};

impl LabelTiers {
    pub fn is_visible(&self, value: Option<f64>, zoom: f64) -> bool {
        if zoom > self.show_all_above_zoom {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        value > self.always_above
            || self
                .tiers
                .iter()
                .any(|&(min_zoom, above)| zoom >= min_zoom && value > above)
    }

    /// Same rule as [`LabelTiers::is_visible`], as a renderer filter.
    pub fn filter(&self) -> Expression {
        let value = || {
            Expression::Coalesce(vec![Expression::get(self.property), Expression::lit(-1)])
        };
        let mut any = vec![Expression::gt(value(), Expression::lit(self.always_above))];
        for &(min_zoom, above) in self.tiers {
            any.push(Expression::All(vec![
                Expression::ge(Expression::Zoom, Expression::lit(min_zoom)),
                Expression::gt(value(), Expression::lit(above)),
            ]));
        }
        any.push(Expression::gt(
            Expression::Zoom,
            Expression::lit(self.show_all_above_zoom),
        ));
        Expression::Any(any)
    }
}

fn text_paint(layer: LayerDef, palette: &Palette) -> LayerDef {
    layer
        .with_paint("text-halo-color", palette.text_halo)
        .with_paint("text-halo-width", 1.5)
}

fn line_label_layer(voltage: VoltageClass, palette: &Palette) -> LayerDef {
    let z = match voltage {
        VoltageClass::Kv22 => 300,
        VoltageClass::Kv110 => 301,
        VoltageClass::Kv220 => 302,
        VoltageClass::Kv400 => 303,
    };
    let layer = LayerDef::new(line_label_layer_id(voltage), LayerType::Symbol, z)
        .with_source(&line_source_id(voltage))
        .with_zoom_range(Some(9.0), None)
        .with_layout("symbol-placement", "line")
        .with_layout(
            "text-field",
            Expression::Coalesce(vec![Expression::get("name"), Expression::lit("")]),
        )
        .with_layout("text-font", Expression::lit(serde_json::json!(["Open Sans Regular"])))
        .with_layout("text-size", 11.0)
        .with_paint("text-color", voltage.line_color());
    text_paint(layer, palette)
}

/// Text labels, always above the infrastructure they describe.
pub fn layers(palette: &Palette) -> Vec<LayerDef> {
    let mut layers = vec![
        text_paint(
            LayerDef::new(POWER_PLANT_LABELS_LAYER, LayerType::Symbol, 330)
                .with_source(POWER_PLANTS_SOURCE)
                .with_filter(PLANT_LABEL_TIERS.filter())
                .with_layout(
                    "text-field",
                    Expression::Coalesce(vec![Expression::get("name"), Expression::lit("")]),
                )
                .with_layout("text-font", Expression::lit(serde_json::json!(["Open Sans Bold"])))
                .with_layout("text-size", 12.0)
                .with_layout("text-anchor", "top")
                .with_layout("text-offset", Expression::lit(serde_json::json!([0.0, 1.0])))
                .with_paint("text-color", palette.text),
            palette,
        ),
        text_paint(
            LayerDef::new(SUBSTATION_LABELS_LAYER, LayerType::Symbol, 320)
                .with_source(SUBSTATIONS_SOURCE)
                .with_filter(SUBSTATION_LABEL_TIERS.filter())
                .with_layout(
                    "text-field",
                    Expression::Coalesce(vec![Expression::get("name"), Expression::lit("")]),
                )
                .with_layout("text-font", Expression::lit(serde_json::json!(["Open Sans Regular"])))
                .with_layout("text-size", 11.0)
                .with_layout("text-anchor", "bottom")
                .with_layout("text-offset", Expression::lit(serde_json::json!([0.0, -0.8])))
                .with_paint("text-color", voltage_color_expression()),
            palette,
        ),
        text_paint(
            LayerDef::new("place-labels", LayerType::Symbol, 340)
                .with_source_layer(BASEMAP_SOURCE, "place")
                .with_layout("text-field", Expression::get("name"))
                .with_layout("text-font", Expression::lit(serde_json::json!(["Open Sans Regular"])))
                .with_layout("text-size", 12.0)
                .with_paint("text-color", palette.text),
            palette,
        ),
    ];
    layers.extend(VoltageClass::ALL.iter().map(|v| line_label_layer(*v, palette)));
    layers
}
