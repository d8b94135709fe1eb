use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridmap::controller::{ControllerConfig, ErrorCallback, MapController, Mounted};
use gridmap::expression::Expression;
use gridmap::layers::{TOWERS_LAYER, line_layer_id, plant_layer_id};
use gridmap::map::{LngLat, MapSurface, StyleMap};
use gridmap::popup::DetailView;
use gridmap::{GridDataset, MapError, PlantSource, StyleOptions, Theme, VoltageClass};

fn fixture() -> GridDataset {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/grid.json");
    GridDataset::from_path(&path).unwrap()
}

fn config() -> ControllerConfig {
    let options = StyleOptions::new(Theme::Light, "https://tiles.example.org/");
    let mut config = ControllerConfig::new(options);
    config.retry_interval = Duration::from_millis(5);
    config
}

fn recorder() -> (Arc<Mutex<Vec<String>>>, ErrorCallback) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    (
        messages,
        Box::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string())),
    )
}

fn mount(dataset: &GridDataset, on_error: ErrorCallback) -> MapController<StyleMap> {
    match MapController::mount(config(), dataset, |style| Ok(StyleMap::new(style)), on_error) {
        Mounted::Ready(controller) => controller,
        Mounted::Failed { message } => panic!("mount failed: {message}"),
    }
}

fn complete_later(map: &StyleMap) {
    let signal = map.load_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.complete();
    });
}

fn visibility(map: &StyleMap, layer: &str) -> Option<Expression> {
    map.layout_property(layer, "visibility")
}

#[test]
fn fixture_transforms_to_expected_sources() {
    let dataset = fixture();
    // The unparseable 220 kV entry is dropped; the mislabeled one is kept.
    assert_eq!(dataset.lines220.len(), 1);
    assert_eq!(dataset.substations.len(), 4);
    let geometry = gridmap::transform_dataset(&dataset);

    assert_eq!(geometry.substations.points.features.len(), 2);
    assert_eq!(geometry.substations.polygons.features.len(), 1);
    assert_eq!(geometry.power_plants.points.features.len(), 3);
    assert_eq!(geometry.power_plants.polygons.features.len(), 1);

    let lines = &geometry.lines.by_voltage;
    assert_eq!(lines[&VoltageClass::Kv400].features.len(), 1);
    assert_eq!(lines[&VoltageClass::Kv220].features.len(), 0);
    assert_eq!(lines[&VoltageClass::Kv110].features.len(), 1);
    assert_eq!(lines[&VoltageClass::Kv22].features.len(), 1);
    // The lone tower of the degenerate 400 kV segment is dropped.
    assert_eq!(geometry.lines.towers.features.len(), 7);

    let bounds = geometry.bounds().unwrap().to_array();
    assert_eq!(bounds[0], 13.84);
    assert_eq!(bounds[3], 46.5);
}

#[tokio::test]
async fn session_attaches_routes_and_survives_style_swap() {
    let dataset = fixture();
    let (errors, on_error) = recorder();
    let mut ctl = mount(&dataset, on_error);

    complete_later(ctl.map());
    ctl.attach_when_ready().await.unwrap();
    assert!(ctl.is_ready());

    // Distribution lines start hidden and their towers are filtered out.
    let none = Some(Expression::lit("none"));
    assert_eq!(visibility(ctl.map(), &line_layer_id(VoltageClass::Kv22)), none);
    assert!(ctl.map().filter(TOWERS_LAYER).is_some());

    // Substation sits on the start of the 400 kV line and wins the click.
    match ctl.handle_click(LngLat::new(16.105, 45.805)) {
        Some(DetailView::Substation(d)) => {
            assert_eq!(d.name, "TS Žerjavinec");
            assert_eq!(d.voltage, "400/220/110 kV");
            assert_eq!(d.logos.len(), 1);
        }
        other => panic!("expected substation, got {other:?}"),
    }

    // Joint operators resolve to both logos.
    match ctl.handle_click(LngLat::new(13.84, 45.12)) {
        Some(DetailView::PowerPlant(d)) => {
            assert_eq!(d.power, "9.5 MW");
            assert_eq!(d.logos.len(), 2);
        }
        other => panic!("expected power plant, got {other:?}"),
    }

    let midpoint = LngLat::new(16.2525, 45.9525);
    assert!(matches!(ctl.handle_click(midpoint), Some(DetailView::Line(_))));

    ctl.toggle_voltage(400, false);
    assert_eq!(ctl.handle_click(midpoint), None);

    ctl.toggle_power_plant_type("geothermal-binary", false);
    assert_eq!(visibility(ctl.map(), &plant_layer_id(PlantSource::Other)), none);

    complete_later(ctl.map());
    ctl.change_style("dark").await.unwrap();

    assert_eq!(ctl.map().style().name, "gridmap-dark");
    assert_eq!(visibility(ctl.map(), &line_layer_id(VoltageClass::Kv400)), none);
    assert_eq!(visibility(ctl.map(), &plant_layer_id(PlantSource::Other)), none);
    assert_eq!(ctl.handle_click(midpoint), None);
    assert!(matches!(
        ctl.handle_click(LngLat::new(16.105, 45.805)),
        Some(DetailView::Substation(_))
    ));
    assert!(errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disposed_session_never_touches_new_style() {
    let dataset = fixture();
    let (_errors, on_error) = recorder();
    let mut ctl = mount(&dataset, on_error);
    let handle = ctl.dispose_handle();

    let signal = ctl.map().load_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.dispose();
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.complete();
    });

    let result = ctl.attach_when_ready().await;
    assert!(matches!(result, Err(MapError::Disposed)));
    assert!(!ctl.is_ready());
    assert_eq!(ctl.geometry().feature_count(), 17);

    let map = ctl.dispose();
    let json = map.style().to_json();
    assert_eq!(json["sources"]["substations"]["data"]["features"], serde_json::json!([]));
}

#[tokio::test]
async fn replacing_dataset_reattaches() {
    let mut ctl = mount(&GridDataset::default(), Box::new(|_: &str| {}));
    ctl.map().load_signal().complete();
    ctl.attach_when_ready().await.unwrap();
    assert_eq!(ctl.handle_click(LngLat::new(16.105, 45.805)), None);

    ctl.set_dataset(&fixture()).await.unwrap();
    assert!(ctl.handle_click(LngLat::new(16.105, 45.805)).is_some());
}

#[test]
fn failed_init_shows_fallback() {
    let (errors, on_error) = recorder();
    let mounted = MapController::<StyleMap>::mount(
        config(),
        &fixture(),
        |_| Err(MapError::InitFailed("no rendering context".into())),
        on_error,
    );
    assert!(matches!(mounted, Mounted::Failed { .. }));
    assert_eq!(errors.lock().unwrap().len(), 1);
}
