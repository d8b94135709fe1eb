use serde_json::{Value, json};

use crate::colors::{FALLBACK_COLOR, Palette, PlantSource, VoltageClass};
use crate::expression::Expression;
use crate::layers::{
    POWER_PLANT_POLYGONS_FILL_LAYER, POWER_PLANT_POLYGONS_OUTLINE_LAYER,
    POWER_PLANT_POLYGONS_SOURCE, POWER_PLANTS_SOURCE, SUBSTATION_POLYGONS_FILL_LAYER,
    SUBSTATION_POLYGONS_OUTLINE_LAYER, SUBSTATION_POLYGONS_SOURCE, SUBSTATIONS_LAYER,
    SUBSTATIONS_SOURCE, TOWERS_LAYER, TOWERS_SOURCE, line_layer_id, line_source_id,
    plant_layer_id,
};
use crate::style::{LayerDef, LayerType};

/// Lines of higher voltage paint over lower ones.
fn line_z_order(voltage: VoltageClass) -> i32 {
    match voltage {
        VoltageClass::Kv22 => 110,
        VoltageClass::Kv110 => 120,
        VoltageClass::Kv220 => 130,
        VoltageClass::Kv400 => 140,
    }
}

/// Color keyed on the `voltage` property, with a grey fallback for
/// non-standard levels.
pub fn voltage_color_expression() -> Expression {
    Expression::match_property(
        "voltage",
        VoltageClass::ALL
            .iter()
            .map(|v| (json!(v.kv()), Expression::lit(v.line_color())))
            .collect(),
        Expression::lit(FALLBACK_COLOR),
    )
}

fn plant_color_expression() -> Expression {
    Expression::match_property(
        "category",
        PlantSource::ALL
            .iter()
            .filter(|s| **s != PlantSource::Other)
            .map(|s| (Value::from(s.as_str()), Expression::lit(s.color())))
            .collect(),
        Expression::lit(FALLBACK_COLOR),
    )
}

fn line_layer(voltage: VoltageClass) -> LayerDef {
    let width = voltage.line_width();
    LayerDef::new(line_layer_id(voltage), LayerType::Line, line_z_order(voltage))
        .with_source(&line_source_id(voltage))
        .with_layout("line-cap", "round")
        .with_layout("line-join", "round")
        .with_paint("line-color", voltage.line_color())
        .with_paint(
            "line-width",
            Expression::interpolate_zoom(vec![
                (5.0, Expression::lit(width * 0.5)),
                (10.0, Expression::lit(width)),
                (14.0, Expression::lit(width * 2.0)),
            ]),
        )
        .with_paint(
            "line-opacity",
            Expression::match_property(
                "status",
                vec![
                    (json!("maintenance"), Expression::lit(0.6)),
                    (json!("planned"), Expression::lit(0.4)),
                ],
                Expression::lit(1.0),
            ),
        )
}

/// Substation marker radius grows with zoom and primary voltage.
fn substation_radius() -> Expression {
    let by_voltage = |small: f64, large: f64| Expression::Case {
        branches: vec![
            (
                Expression::ge(
                    Expression::Coalesce(vec![Expression::get("voltage"), Expression::lit(0)]),
                    Expression::lit(400),
                ),
                Expression::lit(large),
            ),
            (
                Expression::ge(
                    Expression::Coalesce(vec![Expression::get("voltage"), Expression::lit(0)]),
                    Expression::lit(220),
                ),
                Expression::lit((small + large) / 2.0),
            ),
        ],
        fallback: Box::new(Expression::lit(small)),
    };
    Expression::interpolate_zoom(vec![(5.0, by_voltage(2.0, 4.0)), (12.0, by_voltage(5.0, 9.0))])
}

/// Plant icon scale grows with zoom and installed capacity.
fn plant_icon_size() -> Expression {
    let by_capacity = |min: f64, max: f64| Expression::Interpolate {
        input: Box::new(Expression::Coalesce(vec![
            Expression::get("capacity"),
            Expression::lit(0),
        ])),
        stops: vec![(0.0, Expression::lit(min)), (1000.0, Expression::lit(max))],
    };
    Expression::interpolate_zoom(vec![
        (5.0, by_capacity(0.3, 0.7)),
        (12.0, by_capacity(0.6, 1.2)),
    ])
}

fn plant_layer(source: PlantSource) -> LayerDef {
    LayerDef::new(plant_layer_id(source), LayerType::Symbol, 170)
        .with_source(POWER_PLANTS_SOURCE)
        .with_filter(Expression::eq(
            Expression::get("category"),
            Expression::lit(source.as_str()),
        ))
        .with_layout("icon-image", Expression::lit(source.icon()))
        .with_layout("icon-size", plant_icon_size())
        .with_layout("icon-allow-overlap", Expression::lit(true))
        .with_layout(
            "symbol-sort-key",
            Expression::call(
                "-",
                vec![Expression::Coalesce(vec![
                    Expression::get("capacity"),
                    Expression::lit(0),
                ])],
            ),
        )
        .with_paint("icon-opacity", 1.0)
}

/// Power infrastructure: lines, towers, substations and plants.
pub fn layers(palette: &Palette) -> Vec<LayerDef> {
    let mut layers: Vec<LayerDef> = VoltageClass::ALL.iter().map(|v| line_layer(*v)).collect();

    layers.push(
        LayerDef::new(TOWERS_LAYER, LayerType::Circle, 150)
            .with_source(TOWERS_SOURCE)
            .with_zoom_range(Some(11.0), None)
            .with_paint("circle-color", voltage_color_expression())
            .with_paint(
                "circle-radius",
                Expression::interpolate_zoom(vec![
                    (11.0, Expression::lit(1.5)),
                    (16.0, Expression::lit(4.0)),
                ]),
            )
            .with_paint("circle-stroke-color", palette.polygon_outline)
            .with_paint("circle-stroke-width", 0.5),
    );

    layers.push(
        LayerDef::new(SUBSTATION_POLYGONS_FILL_LAYER, LayerType::Fill, 100)
            .with_source(SUBSTATION_POLYGONS_SOURCE)
            .with_zoom_range(Some(10.0), None)
            .with_paint("fill-color", voltage_color_expression())
            .with_paint("fill-opacity", 0.35),
    );
    layers.push(
        LayerDef::new(SUBSTATION_POLYGONS_OUTLINE_LAYER, LayerType::Line, 101)
            .with_source(SUBSTATION_POLYGONS_SOURCE)
            .with_zoom_range(Some(10.0), None)
            .with_paint("line-color", palette.polygon_outline)
            .with_paint("line-width", 1.0),
    );
    layers.push(
        LayerDef::new(POWER_PLANT_POLYGONS_FILL_LAYER, LayerType::Fill, 102)
            .with_source(POWER_PLANT_POLYGONS_SOURCE)
            .with_zoom_range(Some(9.0), None)
            .with_paint("fill-color", plant_color_expression())
            .with_paint("fill-opacity", 0.3),
    );
    layers.push(
        LayerDef::new(POWER_PLANT_POLYGONS_OUTLINE_LAYER, LayerType::Line, 103)
            .with_source(POWER_PLANT_POLYGONS_SOURCE)
            .with_zoom_range(Some(9.0), None)
            .with_paint("line-color", plant_color_expression())
            .with_paint("line-width", 1.0),
    );

    layers.push(
        LayerDef::new(SUBSTATIONS_LAYER, LayerType::Circle, 160)
            .with_source(SUBSTATIONS_SOURCE)
            .with_paint("circle-color", voltage_color_expression())
            .with_paint("circle-radius", substation_radius())
            .with_paint("circle-stroke-color", palette.polygon_outline)
            .with_paint("circle-stroke-width", 1.0),
    );

    layers.extend(PlantSource::ALL.iter().map(|s| plant_layer(*s)));
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::Theme;

    #[test]
    fn line_layers_read_their_own_voltage_source() {
        let layers = layers(Theme::Light.palette());
        for v in VoltageClass::ALL {
            let layer = layers.iter().find(|l| l.id == line_layer_id(v)).unwrap();
            assert_eq!(layer.source.as_deref(), Some(line_source_id(v).as_str()));
            assert!(layer.filter.is_none());
        }
    }

    #[test]
    fn higher_voltage_lines_paint_later() {
        assert!(line_z_order(VoltageClass::Kv400) > line_z_order(VoltageClass::Kv220));
        assert!(line_z_order(VoltageClass::Kv220) > line_z_order(VoltageClass::Kv110));
        assert!(line_z_order(VoltageClass::Kv110) > line_z_order(VoltageClass::Kv22));
    }

    #[test]
    fn plant_layers_are_scoped_to_one_category() {
        let layers = layers(Theme::Light.palette());
        let hydro = layers
            .iter()
            .find(|l| l.id == plant_layer_id(PlantSource::Hydro))
            .unwrap();
        assert_eq!(
            hydro.filter.as_ref().map(Expression::to_json),
            Some(json!(["==", ["get", "category"], "hydro"]))
        );
        assert_eq!(hydro.layout["icon-image"].to_json(), json!("plant-hydro"));
    }

    #[test]
    fn voltage_color_falls_back_to_grey() {
        let json = voltage_color_expression().to_json();
        let arr = json.as_array().unwrap();
        assert_eq!(arr.last().unwrap(), FALLBACK_COLOR);
    }
}
