use serde_json::json;

use crate::colors::Palette;
use crate::expression::{CompareOp, Expression};
use crate::layers::BASEMAP_SOURCE;
use crate::style::{LayerDef, LayerType};

/// Base terrain drawn from the vector basemap (OpenMapTiles schema).
pub fn layers(palette: &Palette) -> Vec<LayerDef> {
    vec![
        LayerDef::new("background", LayerType::Background, 0)
            .with_paint("background-color", palette.background),
        LayerDef::new("landcover", LayerType::Fill, 10)
            .with_source_layer(BASEMAP_SOURCE, "landcover")
            .with_paint("fill-color", palette.landcover)
            .with_paint("fill-opacity", 0.6),
        LayerDef::new("water", LayerType::Fill, 20)
            .with_source_layer(BASEMAP_SOURCE, "water")
            .with_paint("fill-color", palette.water),
        LayerDef::new("waterway", LayerType::Line, 21)
            .with_source_layer(BASEMAP_SOURCE, "waterway")
            .with_zoom_range(Some(8.0), None)
            .with_paint("line-color", palette.water)
            .with_paint(
                "line-width",
                Expression::interpolate_zoom(vec![
                    (8.0, Expression::lit(0.5)),
                    (14.0, Expression::lit(2.0)),
                ]),
            ),
        LayerDef::new("roads-minor", LayerType::Line, 30)
            .with_source_layer(BASEMAP_SOURCE, "transportation")
            .with_zoom_range(Some(10.0), None)
            .with_filter(Expression::property_in(
                "class",
                vec![json!("minor"), json!("service"), json!("tertiary")],
            ))
            .with_paint("line-color", palette.road_minor)
            .with_paint("line-width", 0.8),
        LayerDef::new("roads-major", LayerType::Line, 31)
            .with_source_layer(BASEMAP_SOURCE, "transportation")
            .with_zoom_range(Some(6.0), None)
            .with_filter(Expression::property_in(
                "class",
                vec![json!("motorway"), json!("trunk"), json!("primary")],
            ))
            .with_paint("line-color", palette.road_major)
            .with_paint(
                "line-width",
                Expression::interpolate_zoom(vec![
                    (6.0, Expression::lit(0.6)),
                    (14.0, Expression::lit(3.0)),
                ]),
            ),
        LayerDef::new("boundaries", LayerType::Line, 40)
            .with_source_layer(BASEMAP_SOURCE, "boundary")
            .with_filter(Expression::compare(
                CompareOp::Le,
                Expression::get("admin_level"),
                Expression::lit(2),
            ))
            .with_paint("line-color", palette.boundary)
            .with_paint("line-width", 1.2)
            .with_paint("line-dasharray", Expression::lit(json!([3.0, 2.0]))),
    ]
}
