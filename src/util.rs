use geojson::JsonObject;
use serde_json::Value;
use std::path::Path;

/// Display text for a property, rendering numbers without a trailing `.0`.
/// Empty strings and nulls count as missing.
pub fn prop_text(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 => Some(format!("{f:.0}")),
            (None, Some(f)) => Some(f.to_string()),
            _ => None,
        },
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Dataset name from a file path, e.g. `grid.2024.json` -> `grid`
pub fn dataset_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|name| name.to_str())
        .map(|name| name.split('.').next().unwrap_or(name).to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_render_without_trailing_zero() {
        let props = json!({"a": 1200.0, "b": 12.5, "c": 400, "d": "", "e": null})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(prop_text(&props, "a").as_deref(), Some("1200"));
        assert_eq!(prop_text(&props, "b").as_deref(), Some("12.5"));
        assert_eq!(prop_text(&props, "c").as_deref(), Some("400"));
        assert_eq!(prop_text(&props, "d"), None);
        assert_eq!(prop_text(&props, "e"), None);
        assert_eq!(prop_text(&props, "missing"), None);
    }

    #[test]
    fn dataset_name_strips_extensions() {
        assert_eq!(dataset_name_from_path(Path::new("/data/grid.2024.json")), "grid");
    }
}
