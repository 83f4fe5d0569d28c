use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foundation::math::Mercator;
use layers::{BasemapConfig, Compositor, StencilMask, extent};
use streaming::{HttpTileFetcher, fetch_geojson};
use tiling::{RowOrder, TileRange, WmtsLayer};

const DEFAULT_GEOJSON_URL: &str =
    "https://geo.datav.aliyun.com/areas_v3/bound/geojson?code=530000_full_district";

#[derive(Parser, Debug)]
#[command(author, version, about = "Stencil-masked base-map tile compositor")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tile range covering a bbox at a zoom level
    Plan {
        /// Bounding box: minLon,minLat,maxLon,maxLat
        #[arg(long)]
        bbox: String,

        /// Pyramid zoom level
        #[arg(long, default_value_t = 9)]
        zoom: u8,

        /// Address rows bottom-up (TMS) instead of top-down (XYZ)
        #[arg(long)]
        tms: bool,
    },

    /// Fetch boundaries and tiles, report the settled composite
    Compose(ComposeArgs),
}

#[derive(clap::Args, Debug)]
struct ComposeArgs {
    /// Boundary feature collection endpoint
    #[arg(long, default_value = DEFAULT_GEOJSON_URL)]
    geojson_url: String,

    /// WMTS provider token (falls back to the TDT_TOKEN environment
    /// variable; without one the WMTS layers are omitted)
    #[arg(long)]
    token: Option<String>,

    /// Base layer name (tdt-img / tdt-cva / tdt-ter, legacy aliases accepted)
    #[arg(long, default_value = "tdt-img")]
    layer: String,

    /// Pyramid zoom level
    #[arg(long, default_value_t = 9)]
    zoom: u8,

    /// Enable the annotation overlay layer
    #[arg(long)]
    labels: bool,

    /// Template tile URL ({z}/{x}/{y}) for an alternate base source
    #[arg(long)]
    template: Option<String>,

    /// Template tile URL for an overlay source
    #[arg(long)]
    overlay_template: Option<String>,

    /// Template sources address rows bottom-up (TMS)
    #[arg(long)]
    tms: bool,

    /// Write a JSON quad manifest here
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct QuadManifestEntry {
    layer: &'static str,
    z: u8,
    x: u32,
    y: u32,
    center: [f64; 2],
    size: [f64; 2],
    depth: f64,
    opacity: f32,
    bytes: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Plan { bbox, zoom, tms } => plan(&bbox, zoom, tms),
        Command::Compose(compose_args) => compose(compose_args).await,
    }
}

fn plan(bbox: &str, zoom: u8, tms: bool) -> Result<(), Box<dyn std::error::Error>> {
    let [lon_min, lat_min, lon_max, lat_max] = parse_bbox(bbox)?;
    let order = if tms {
        RowOrder::TmsBottomLeft
    } else {
        RowOrder::XyzTopLeft
    };

    match TileRange::covering(lon_min, lat_min, lon_max, lat_max, zoom, order) {
        Some(range) => {
            println!(
                "z{}\tx {}..={}\ty {}..={}\t{} tiles",
                range.zoom(),
                range.min.x,
                range.max.x,
                range.min.y,
                range.max.y,
                range.count()
            );
        }
        None => println!("degenerate bbox, no tiles"),
    }
    Ok(())
}

async fn compose(args: ComposeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base_layer = WmtsLayer::parse(&args.layer)
        .ok_or_else(|| format!("unknown WMTS layer name: {}", args.layer))?;
    let token = args
        .token
        .or_else(|| env::var("TDT_TOKEN").ok())
        .filter(|t| !t.is_empty());
    if token.is_none() {
        info!("no provider token; WMTS layers will be omitted");
    }

    let client = reqwest::Client::new();
    info!("fetching boundaries from {}", args.geojson_url);
    let doc = fetch_geojson(&client, &args.geojson_url).await?;
    let features = formats::parse_feature_collection(&doc)?;
    info!("loaded {} boundary features", features.len());

    let projection = Mercator::default();
    let bounds = extent::aggregate_bounds(&features, &projection);
    let mask = StencilMask::build(&features, &projection);
    info!(
        "stencil mask ready: {} shapes, {} triangles",
        mask.shapes.len(),
        mask.triangles().len() / 3
    );

    let config = BasemapConfig {
        token,
        base_layer,
        zoom: args.zoom,
        label_layer: args.labels.then_some(WmtsLayer::Annotation),
        label_enabled: args.labels,
        template: args.template,
        overlay_template: args.overlay_template,
        template_zoom: args.zoom,
        tms_rows: args.tms,
        ..Default::default()
    };

    let fetcher = HttpTileFetcher::with_client(client);
    let mut compositor = Compositor::new();
    let basemap = compositor
        .compose(&config, &projection, bounds, None, &fetcher)
        .await;

    if basemap.layers.is_empty() {
        info!("nothing to compose: no token and no template configured");
        return Ok(());
    }
    for layer in &basemap.layers {
        info!(
            "{}: {} placed, {} skipped of {}",
            layer.name, layer.stats.placed, layer.stats.skipped, layer.stats.enumerated
        );
    }

    if let Some(path) = args.out {
        let manifest: Vec<QuadManifestEntry> = basemap
            .layers
            .iter()
            .flat_map(|layer| {
                layer.quads.iter().map(|quad| QuadManifestEntry {
                    layer: layer.name,
                    z: quad.coord.z,
                    x: quad.coord.x,
                    y: quad.coord.y,
                    center: quad.center,
                    size: quad.size,
                    depth: quad.material.depth_offset,
                    opacity: quad.material.opacity,
                    bytes: quad.image.len(),
                })
            })
            .collect();
        tokio::fs::write(&path, serde_json::to_vec_pretty(&manifest)?).await?;
        info!("wrote {} quads to {}", manifest.len(), path.display());
    }

    Ok(())
}

fn parse_bbox(bbox: &str) -> Result<[f64; 4], Box<dyn std::error::Error>> {
    let parts: Vec<_> = bbox.split(',').collect();
    if parts.len() != 4 {
        return Err("bbox must be minLon,minLat,maxLon,maxLat".into());
    }
    let min_lon: f64 = parts[0].trim().parse()?;
    let min_lat: f64 = parts[1].trim().parse()?;
    let max_lon: f64 = parts[2].trim().parse()?;
    let max_lat: f64 = parts[3].trim().parse()?;
    Ok([min_lon, min_lat, max_lon, max_lat])
}
