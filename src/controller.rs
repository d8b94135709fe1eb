//! Owner of the live map and everything the host can ask of it.
//!
//! All mutation goes through `&mut self`, which serializes it on the host's
//! event loop. The one ordering rule enforced here is that geometry is only
//! attached after the current style reports it finished loading.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::colors::{PlantSource, Theme, VoltageClass};
use crate::compositor::{StyleOptions, compose_style};
use crate::dataset::GridDataset;
use crate::error::{MapError, Result};
use crate::interaction::{CLICK_TOLERANCE_PX, InteractionRouter};
use crate::logos::LogoTable;
use crate::map::{LngLat, MapSurface};
use crate::popup::DetailView;
use crate::style::StyleDocument;
use crate::transform::{GeometrySet, transform_dataset};
use crate::visibility::VisibilityController;

/// Shown in place of the map when it cannot be created.
pub const FALLBACK_MESSAGE: &str = "The grid map could not be displayed.";

/// Host-owned sink for errors that affect the whole map surface.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub style: StyleOptions,
    /// Poll interval while waiting for a style to load.
    pub retry_interval: Duration,
    pub click_tolerance_px: f64,
    pub logos: LogoTable,
}

impl ControllerConfig {
    pub fn new(style: StyleOptions) -> Self {
        Self {
            style,
            retry_interval: Duration::from_millis(100),
            click_tolerance_px: CLICK_TOLERANCE_PX,
            logos: LogoTable::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    /// The style is still loading; try again after the load signal.
    Deferred,
}

/// Cancels pending work of a controller from outside its borrow.
#[derive(Debug, Clone)]
pub struct DisposeHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl DisposeHandle {
    pub fn dispose(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_disposed(&self) -> bool {
        *self.tx.borrow()
    }
}

pub enum Mounted<M: MapSurface> {
    Ready(MapController<M>),
    /// Render `message` instead of the map canvas.
    Failed { message: String },
}

pub struct MapController<M: MapSurface> {
    map: M,
    config: ControllerConfig,
    geometry: GeometrySet,
    visibility: VisibilityController,
    router: InteractionRouter,
    attached: bool,
    disposed: DisposeHandle,
    on_error: ErrorCallback,
}

impl<M: MapSurface> MapController<M> {
    /// Compose the initial style and create the map with `init`. A failing
    /// `init` is reported through `on_error` and yields the fallback state.
    pub fn mount<F>(
        config: ControllerConfig,
        dataset: &GridDataset,
        init: F,
        mut on_error: ErrorCallback,
    ) -> Mounted<M>
    where
        F: FnOnce(StyleDocument) -> Result<M>,
    {
        match init(compose_style(&config.style)) {
            Ok(map) => Mounted::Ready(Self::new(map, config, dataset, on_error)),
            Err(e) => {
                error!("Failed to initialize map: {}", e);
                on_error(&e.to_string());
                Mounted::Failed {
                    message: FALLBACK_MESSAGE.to_string(),
                }
            }
        }
    }

    /// Wrap a map that already has (or is loading) a composed style.
    pub fn new(
        map: M,
        config: ControllerConfig,
        dataset: &GridDataset,
        on_error: ErrorCallback,
    ) -> Self {
        let router = InteractionRouter::new(config.logos.clone())
            .with_tolerance(config.click_tolerance_px);
        let (tx, _rx) = watch::channel(false);
        Self {
            map,
            geometry: transform_dataset(dataset),
            visibility: VisibilityController::new(),
            router,
            config,
            attached: false,
            disposed: DisposeHandle { tx: Arc::new(tx) },
            on_error,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn geometry(&self) -> &GeometrySet {
        &self.geometry
    }

    pub fn visibility(&self) -> &VisibilityController {
        &self.visibility
    }

    pub fn theme(&self) -> Theme {
        self.config.style.theme
    }

    pub fn dispose_handle(&self) -> DisposeHandle {
        self.disposed.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    /// Style loaded and geometry attached.
    pub fn is_ready(&self) -> bool {
        !self.is_disposed() && self.attached && self.map.is_style_loaded()
    }

    fn report(&mut self, e: &MapError) {
        error!("Map error: {}", e);
        (self.on_error)(&e.to_string());
    }

    /// Push every geometry source and the visibility state onto the map, or
    /// defer when the style has not finished loading.
    pub fn try_attach(&mut self) -> Result<AttachOutcome> {
        if self.is_disposed() {
            return Err(MapError::Disposed);
        }
        if !self.map.is_style_loaded() {
            debug!("Style still loading, deferring geometry attachment");
            return Ok(AttachOutcome::Deferred);
        }

        let result = self
            .geometry
            .sources()
            .into_iter()
            .try_for_each(|(id, data)| self.map.set_source_data(&id, data));
        if let Err(e) = result {
            self.report(&e);
            return Err(e);
        }

        self.visibility.apply(&mut self.map);
        self.attached = true;
        info!(
            "Attached {} features to '{}' style",
            self.geometry.feature_count(),
            self.theme().as_str()
        );
        Ok(AttachOutcome::Attached)
    }

    /// Attach geometry once the current style has loaded.
    ///
    /// Waits on the load signal, re-checking every `retry_interval`. Resolves
    /// with [`MapError::Disposed`] without touching the map if the controller
    /// is disposed first.
    pub async fn attach_when_ready(&mut self) -> Result<()> {
        let mut load_rx = self.map.load_events();
        let mut disposed_rx = self.disposed.tx.subscribe();

        loop {
            if self.try_attach()? == AttachOutcome::Attached {
                return Ok(());
            }
            tokio::select! {
                changed = load_rx.changed() => {
                    if changed.is_err() {
                        return Err(MapError::LoadSignalClosed);
                    }
                }
                _ = tokio::time::sleep(self.config.retry_interval) => {
                    debug!("Style load poll");
                }
                _ = disposed_rx.wait_for(|disposed| *disposed) => {
                    debug!("Disposed while waiting for style load");
                    return Err(MapError::Disposed);
                }
            }
        }
    }

    /// Swap the basemap theme. The new style discards all geometry, which is
    /// re-attached together with the current toggle state once it loads.
    pub async fn change_style(&mut self, theme_id: &str) -> Result<()> {
        if self.is_disposed() {
            return Err(MapError::Disposed);
        }
        let theme: Theme = theme_id.parse()?;
        info!("Changing style to '{}'", theme.as_str());

        self.config.style.theme = theme;
        self.attached = false;
        self.map.set_style(compose_style(&self.config.style));
        self.attach_when_ready().await
    }

    /// Replace the dataset and re-attach its geometry.
    pub async fn set_dataset(&mut self, dataset: &GridDataset) -> Result<()> {
        self.geometry = transform_dataset(dataset);
        self.attach_when_ready().await
    }

    pub fn toggle_voltage(&mut self, kv: u32, visible: bool) {
        if self.is_disposed() {
            return;
        }
        match VoltageClass::from_kv(kv) {
            Some(voltage) => self.visibility.toggle_voltage(&mut self.map, voltage, visible),
            None => warn!("No line layer for {} kV, ignoring toggle", kv),
        }
    }

    pub fn toggle_all_lines(&mut self, visible: bool) {
        if self.is_disposed() {
            return;
        }
        self.visibility.toggle_all(&mut self.map, visible);
    }

    /// Unrecognized categories share the generic icon layer.
    pub fn toggle_power_plant_type(&mut self, source: &str, visible: bool) {
        if self.is_disposed() {
            return;
        }
        let category = PlantSource::classify(source);
        self.visibility
            .toggle_plant_type(&mut self.map, category, visible);
    }

    pub fn handle_click(&self, at: LngLat) -> Option<DetailView> {
        if !self.is_ready() {
            return None;
        }
        self.router.handle_click(&self.map, at)
    }

    /// Tear down: any pending attachment resolves as disposed.
    pub fn dispose(self) -> M {
        self.disposed.dispose();
        info!("Map controller disposed");
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::layers::{SUBSTATIONS_SOURCE, TOWERS_SOURCE, line_layer_id};
    use crate::map::StyleMap;
    use crate::style::SourceDef;
    use std::sync::Mutex;
    use tokio::time::sleep;

    fn dataset() -> GridDataset {
        GridDataset::from_json(
            r#"{
                "substations": [{"id": "s1", "name": "TS Žerjavinec", "voltages": [400],
                                 "operator": "HOPS", "lat": 45.8, "lng": 16.1}],
                "powerPlants": [{"id": "p1", "name": "HE Varaždin", "source": "hydro",
                                 "capacity": 94, "lat": 46.3, "lng": 16.4}],
                "lines400": [{"id": "l1", "name": "Žerjavinec - Heviz",
                              "segments": [[{"lat": 45.8, "lng": 16.1},
                                            {"lat": 46.5, "lng": 16.8}]]}]
            }"#,
        )
        .unwrap()
    }

    fn config() -> ControllerConfig {
        let mut config = ControllerConfig::new(StyleOptions::new(Theme::Light, "http://tiles"));
        config.retry_interval = Duration::from_millis(5);
        config
    }

    fn silent() -> ErrorCallback {
        Box::new(|_: &str| {})
    }

    fn controller() -> MapController<StyleMap> {
        let map = StyleMap::new(compose_style(&config().style));
        MapController::new(map, config(), &dataset(), silent())
    }

    fn source_len(map: &StyleMap, id: &str) -> usize {
        match map.style().sources.get(id) {
            Some(SourceDef::GeoJson { data }) => data.features.len(),
            _ => 0,
        }
    }

    #[tokio::test]
    async fn attachment_waits_for_load_signal() {
        let mut ctl = controller();
        assert_eq!(ctl.try_attach().unwrap(), AttachOutcome::Deferred);
        assert!(!ctl.is_ready());

        let signal = ctl.map().load_signal();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            signal.complete();
        });

        ctl.attach_when_ready().await.unwrap();
        assert!(ctl.is_ready());
        assert_eq!(source_len(ctl.map(), SUBSTATIONS_SOURCE), 1);
    }

    #[tokio::test]
    async fn style_swap_reattaches_geometry_and_toggles() {
        let mut ctl = controller();
        ctl.map().load_signal().complete();
        ctl.attach_when_ready().await.unwrap();
        ctl.toggle_voltage(400, false);

        let signal = ctl.map().load_signal();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            signal.complete();
        });
        ctl.change_style("dark").await.unwrap();

        assert_eq!(ctl.theme(), Theme::Dark);
        assert_eq!(ctl.map().style().name, "gridmap-dark");
        assert_eq!(source_len(ctl.map(), SUBSTATIONS_SOURCE), 1);
        assert_eq!(
            ctl.map()
                .layout_property(&line_layer_id(VoltageClass::Kv400), "visibility"),
            Some(Expression::lit("none"))
        );
        assert!(ctl.is_ready());
    }

    #[tokio::test]
    async fn dispose_cancels_pending_attachment() {
        let mut ctl = controller();
        let handle = ctl.dispose_handle();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            handle.dispose();
        });

        let result = ctl.change_style("dark").await;
        assert!(matches!(result, Err(MapError::Disposed)));
        assert_eq!(source_len(ctl.map(), SUBSTATIONS_SOURCE), 0);

        // A late load signal must not attach anything.
        ctl.map().load_signal().complete();
        assert!(matches!(ctl.try_attach(), Err(MapError::Disposed)));
        assert_eq!(source_len(ctl.map(), SUBSTATIONS_SOURCE), 0);
    }

    #[tokio::test]
    async fn unknown_theme_leaves_map_untouched() {
        let mut ctl = controller();
        ctl.map().load_signal().complete();
        ctl.attach_when_ready().await.unwrap();

        let result = ctl.change_style("sepia").await;
        assert!(matches!(result, Err(MapError::UnknownTheme(_))));
        assert!(ctl.is_ready());
        assert_eq!(ctl.map().style().name, "gridmap-light");
    }

    #[tokio::test]
    async fn failed_source_update_is_reported_and_returned() {
        let mut style = compose_style(&config().style);
        style.sources.remove(TOWERS_SOURCE);
        let map = StyleMap::new(style).with_instant_load();

        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let mut ctl = MapController::new(
            map,
            config(),
            &dataset(),
            Box::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string())),
        );

        let result = ctl.attach_when_ready().await;
        assert!(matches!(
            result,
            Err(MapError::UnknownSource(ref id)) if id == TOWERS_SOURCE
        ));
        assert!(!ctl.is_ready());

        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains(TOWERS_SOURCE));
    }

    #[test]
    fn init_failure_reports_once_and_falls_back() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let mounted = MapController::<StyleMap>::mount(
            config(),
            &dataset(),
            |_style| Err(MapError::InitFailed("WebGL context unavailable".into())),
            Box::new(move |msg: &str| sink.lock().unwrap().push(msg.to_string())),
        );

        match mounted {
            Mounted::Failed { message } => assert_eq!(message, FALLBACK_MESSAGE),
            Mounted::Ready(_) => panic!("expected fallback"),
        }
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("WebGL"));
    }

    #[tokio::test]
    async fn clicks_are_ignored_until_ready() {
        let mut ctl = controller();
        let at = LngLat::new(16.1, 45.8);
        assert_eq!(ctl.handle_click(at), None);

        ctl.map().load_signal().complete();
        ctl.attach_when_ready().await.unwrap();
        assert!(matches!(ctl.handle_click(at), Some(DetailView::Substation(_))));
    }

    #[test]
    fn unsupported_voltage_toggle_is_ignored() {
        let mut ctl = controller();
        let before = ctl.visibility().clone();
        ctl.toggle_voltage(35, false);
        assert_eq!(ctl.visibility(), &before);
    }
}
