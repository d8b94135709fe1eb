//! Fixed-field detail views built from a rendered feature's property bag.
//!
//! Missing fields read as the literal [`UNKNOWN`]; this string is shown to
//! users as-is.

use geojson::JsonObject;
use serde::Serialize;

use crate::logos::Logo;
use crate::util::prop_text;

pub const UNKNOWN: &str = "Unknown";

fn text(props: &JsonObject, key: &str) -> String {
    prop_text(props, key).unwrap_or_else(|| UNKNOWN.to_string())
}

fn with_unit(props: &JsonObject, key: &str, unit: &str) -> String {
    prop_text(props, key)
        .map(|v| format!("{v} {unit}"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstationDetail {
    pub name: String,
    pub voltage: String,
    pub operator: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Empty means the placeholder is shown.
    pub logos: Vec<Logo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantDetail {
    pub name: String,
    pub operator: String,
    pub source: String,
    pub method: String,
    pub power: String,
    pub average_production: String,
    pub start_year: String,
    pub logos: Vec<Logo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDetail {
    pub name: String,
    pub voltage: String,
    pub operator: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DetailView {
    Substation(SubstationDetail),
    PowerPlant(PlantDetail),
    Line(LineDetail),
}

impl SubstationDetail {
    pub fn from_properties(props: &JsonObject, logos: Vec<Logo>) -> Self {
        // All declared levels when known, else the primary one.
        let voltage = prop_text(props, "voltages")
            .or_else(|| prop_text(props, "voltage"))
            .map(|v| format!("{v} kV"))
            .unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            name: text(props, "name"),
            voltage,
            operator: text(props, "operator"),
            kind: text(props, "type"),
            logos,
        }
    }
}

impl PlantDetail {
    pub fn from_properties(props: &JsonObject, logos: Vec<Logo>) -> Self {
        Self {
            name: text(props, "name"),
            operator: text(props, "operator"),
            source: text(props, "source"),
            method: text(props, "method"),
            power: with_unit(props, "capacity", "MW"),
            average_production: with_unit(props, "average_production", "GWh"),
            start_year: text(props, "start_year"),
            logos,
        }
    }
}

impl LineDetail {
    pub fn from_properties(props: &JsonObject) -> Self {
        Self {
            name: text(props, "name"),
            voltage: with_unit(props, "voltage", "kV"),
            operator: text(props, "operator"),
            status: text(props, "status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: serde_json::Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_fields_read_unknown() {
        let detail = PlantDetail::from_properties(&props(json!({"name": "HE Zakučac"})), vec![]);
        assert_eq!(detail.name, "HE Zakučac");
        assert_eq!(detail.operator, UNKNOWN);
        assert_eq!(detail.power, UNKNOWN);
        assert_eq!(detail.start_year, UNKNOWN);
        assert_eq!(detail.average_production, UNKNOWN);
    }

    #[test]
    fn plant_values_carry_units() {
        let detail = PlantDetail::from_properties(
            &props(json!({"capacity": 576.0, "average_production": 1475.5, "start_year": 1962})),
            vec![],
        );
        assert_eq!(detail.power, "576 MW");
        assert_eq!(detail.average_production, "1475.5 GWh");
        assert_eq!(detail.start_year, "1962");
    }

    #[test]
    fn substation_prefers_all_declared_levels() {
        let detail = SubstationDetail::from_properties(
            &props(json!({"voltage": 400, "voltages": "400/220/110", "type": "transmission"})),
            vec![],
        );
        assert_eq!(detail.voltage, "400/220/110 kV");
        assert_eq!(detail.kind, "transmission");
        assert_eq!(detail.name, UNKNOWN);
    }

    #[test]
    fn line_detail_formats_voltage() {
        let detail =
            LineDetail::from_properties(&props(json!({"voltage": 220, "status": "active"})));
        assert_eq!(detail.voltage, "220 kV");
        assert_eq!(detail.status, "active");
        assert_eq!(detail.operator, UNKNOWN);
    }

    #[test]
    fn detail_view_serializes_with_tag() {
        let view = DetailView::Line(LineDetail::from_properties(&props(json!({}))));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["view"], "line");
        assert_eq!(json["name"], UNKNOWN);
    }
}
