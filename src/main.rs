use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde_json::json;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use gridmap::controller::{ControllerConfig, MapController, Mounted};
use gridmap::logos::LogoTable;
use gridmap::map::{LngLat, StyleMap};
use gridmap::transform::transform_dataset;
use gridmap::{GridDataset, StyleOptions, Theme, compose_style, sprite, util};

#[derive(Parser, Debug)]
#[command(about = "Build power grid map styles and sources")]
struct Args {
    /// Grid dataset JSON (substations, powerPlants, lines400/220/110/22)
    #[arg(long, env = "GRIDMAP_DATASET")]
    dataset: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the style JSON with empty power sources to this path and exit
    #[arg(long)]
    style_output: Option<PathBuf>,

    /// Write one GeoJSON file per power source into this directory
    #[arg(long, requires = "dataset")]
    geojson_dir: Option<PathBuf>,

    /// Write the style JSON with all geometry attached to this path
    #[arg(long, requires = "dataset")]
    bundle_output: Option<PathBuf>,

    /// Generate themed plant icon SVGs into this directory and exit
    #[arg(long)]
    sprites_output: Option<PathBuf>,

    /// Basemap theme: light or dark
    #[arg(long, default_value = "light")]
    theme: String,

    /// Base URL serving basemap tiles, glyphs and sprites
    #[arg(long, env = "GRIDMAP_TILE_URL", default_value = "http://localhost:3000")]
    tile_source_url: String,

    /// JSON table of operator name to logo asset; defaults to the built-in table
    #[arg(long)]
    logo_table: Option<PathBuf>,

    /// Hide lines of this voltage in the bundle (repeatable)
    #[arg(long)]
    hide_voltage: Vec<u32>,

    /// Hide plants of this category in the bundle (repeatable)
    #[arg(long)]
    hide_plant_type: Vec<String>,

    /// Zoom level used for click inspection
    #[arg(long, default_value_t = 7.0)]
    zoom: f64,

    /// Inspect the bundle at "lng,lat" and print the detail view
    #[arg(long, value_parser = parse_lng_lat)]
    click: Option<LngLat>,
}

fn parse_lng_lat(s: &str) -> Result<LngLat, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lng,lat', got '{s}'"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    Ok(LngLat::new(lng, lat))
}

fn write_geojson(dataset: &GridDataset, dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    let geometry = transform_dataset(dataset);
    let sources = geometry.sources();

    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("=>-"),
    );
    pb.set_message("Writing sources");

    for (id, fc) in sources {
        let path = dir.join(format!("{id}.geojson"));
        fs::write(&path, serde_json::to_string(fc)?)?;
        pb.inc(1);
    }
    pb.finish_with_message("Done writing sources");
    info!("Wrote {} features to {:?}", geometry.feature_count(), dir);
    Ok(())
}

async fn write_bundle(
    args: &Args,
    dataset_path: &Path,
    dataset: &GridDataset,
    options: StyleOptions,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut config = ControllerConfig::new(options);
    if let Some(path) = &args.logo_table {
        config.logos = LogoTable::from_path(path)?;
    }

    let mounted = MapController::mount(
        config,
        dataset,
        |style| Ok(StyleMap::new(style).with_instant_load()),
        Box::new(|msg: &str| error!("Map error: {}", msg)),
    );
    let mut controller = match mounted {
        Mounted::Ready(controller) => controller,
        Mounted::Failed { message } => return Err(message.into()),
    };
    controller.attach_when_ready().await?;
    controller.map_mut().set_zoom(args.zoom);

    for kv in &args.hide_voltage {
        controller.toggle_voltage(*kv, false);
    }
    for source in &args.hide_plant_type {
        controller.toggle_power_plant_type(source, false);
    }

    if let Some(at) = args.click {
        match controller.handle_click(at) {
            Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
            None => warn!("Nothing to inspect at {},{}", at.lng, at.lat),
        }
    }

    let mut style = controller.map().style().clone();
    style.metadata.insert(
        "gridmap:dataset".into(),
        json!(util::dataset_name_from_path(dataset_path)),
    );
    if let Some(bounds) = controller.geometry().bounds() {
        style
            .metadata
            .insert("gridmap:bounds".into(), json!(bounds.to_array()));
    }
    fs::write(output, style.to_string_pretty()?)?;
    info!("Wrote style bundle to {:?}", output);

    controller.dispose();
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if let Some(sprites_output) = &args.sprites_output {
        let count = sprite::generate_plant_icons(sprites_output)?;
        info!("Generated {} plant icons in {:?}", count, sprites_output);
        return Ok(());
    }

    let theme: Theme = args.theme.parse()?;
    let options = StyleOptions::new(theme, &args.tile_source_url);

    if let Some(style_path) = &args.style_output {
        fs::write(style_path, compose_style(&options).to_string_pretty()?)?;
        info!("Wrote style JSON to {:?}", style_path);
        return Ok(());
    }

    let Some(dataset_path) = &args.dataset else {
        return Err("one of --dataset, --style-output or --sprites-output is required".into());
    };
    let dataset = GridDataset::from_path(dataset_path)?;

    if let Some(dir) = &args.geojson_dir {
        write_geojson(&dataset, dir)?;
    }
    if let Some(output) = &args.bundle_output {
        write_bundle(&args, dataset_path, &dataset, options, output).await?;
    }
    if args.geojson_dir.is_none() && args.bundle_output.is_none() {
        let geometry = transform_dataset(&dataset);
        info!(
            "Dataset {:?} yields {} features; pass --geojson-dir or --bundle-output to write them",
            dataset_path,
            geometry.feature_count()
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
