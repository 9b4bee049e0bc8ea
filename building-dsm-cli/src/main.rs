use anyhow::{Context, Result};
use building_dsm::config::{
    FieldNames, HistogramConfig, DEFAULT_GEOGRAPHIC_CRS, DEFAULT_OVERPASS_URL,
    DEFAULT_PROJECTED_CRS, FEET_TO_METERS,
};
use building_dsm::{DsmConfig, DsmPipeline};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Boundary file holding the named extent (KML or any OGR format)
    #[arg(long, value_name = "FILE", default_value = "input_data/geneva_extent.kml")]
    boundary: PathBuf,

    /// Value of the name field selecting the extent feature
    #[arg(long, default_value = "geneva_larger")]
    extent_name: String,

    /// Bare-earth elevation raster
    #[arg(long, value_name = "FILE", default_value = "input_data/geneva_dem.tif")]
    dem: PathBuf,

    /// Municipal building footprints
    #[arg(
        long,
        value_name = "FILE",
        default_value = "input_data/ontario_buildings/oc_BuildingFootprints.shp"
    )]
    footprints: PathBuf,

    /// Output DSM GeoTIFF
    #[arg(short, long, value_name = "FILE", default_value = "geneva_dsm.tif")]
    output: PathBuf,

    /// Directory for diagnostic figures
    #[arg(long, value_name = "DIR", default_value = "figures")]
    figures: PathBuf,

    /// Footprint attribute holding the height
    #[arg(long, default_value = "HEIGHT")]
    height_field: String,

    /// Footprint attribute holding the property class
    #[arg(long, default_value = "Prop_Class")]
    category_field: String,

    /// Boundary attribute holding the extent name
    #[arg(long, default_value = "Name")]
    name_field: String,

    /// Factor converting footprint heights to meters
    #[arg(long, default_value_t = FEET_TO_METERS)]
    height_unit_factor: f64,

    /// Projected CRS for centroids and distances
    #[arg(long, default_value = DEFAULT_PROJECTED_CRS)]
    projected_crs: String,

    /// Geographic CRS of the Overpass API
    #[arg(long, default_value = DEFAULT_GEOGRAPHIC_CRS)]
    geographic_crs: String,

    /// Overpass API endpoint
    #[arg(long, default_value = DEFAULT_OVERPASS_URL)]
    overpass_url: String,

    /// Skip OpenStreetMap footprints
    #[arg(long)]
    no_osm: bool,

    /// Radius of the OpenStreetMap query around the extent centroid (m)
    #[arg(long, default_value_t = 10_000.0)]
    query_radius: f64,

    /// Search distance when matching OpenStreetMap to municipal footprints (m)
    #[arg(long, default_value_t = 300.0)]
    match_distance: f64,

    /// Upper bound of the height histogram (m)
    #[arg(long, default_value_t = 30.0)]
    histogram_max: f64,

    /// Number of histogram bins
    #[arg(long, default_value_t = 15)]
    histogram_bins: usize,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,
}

impl Args {
    fn into_config(self) -> DsmConfig {
        DsmConfig {
            boundary_path: self.boundary,
            extent_name: self.extent_name,
            dem_path: self.dem,
            footprints_path: self.footprints,
            output_path: self.output,
            figures_dir: self.figures,
            fields: FieldNames {
                height: self.height_field,
                category: self.category_field,
                extent_name: self.name_field,
            },
            height_unit_factor: self.height_unit_factor,
            projected_crs: self.projected_crs,
            geographic_crs: self.geographic_crs,
            overpass_url: (!self.no_osm).then_some(self.overpass_url),
            query_radius_m: self.query_radius,
            match_distance_m: self.match_distance,
            histogram: HistogramConfig {
                max_height: self.histogram_max,
                bins: self.histogram_bins,
            },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    let config = args.into_config();
    info!("Building DSM for extent {:?}", config.extent_name);

    let pipeline = DsmPipeline::new(config).context("Failed to set up pipeline")?;
    let summary = pipeline.run()?;

    info!(
        "{} buildings ({} from OpenStreetMap), {} burned into {:?}",
        summary.buildings,
        summary.added_from_supplementary,
        summary.burned,
        pipeline.config().output_path
    );
    if summary.still_missing > 0 {
        warn!("{} buildings were left out of the DSM", summary.still_missing);
    }

    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}
