use std::path::PathBuf;

/// Projected CRS used for centroids and metric distances (NAD83 / UTM zone 18N).
pub const DEFAULT_PROJECTED_CRS: &str = "EPSG:26918";
/// Geographic CRS of the Overpass API.
pub const DEFAULT_GEOGRAPHIC_CRS: &str = "EPSG:4326";
pub const FEET_TO_METERS: f64 = 0.3048;
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Attribute names of the footprint and boundary layers.
#[derive(Debug, Clone)]
pub struct FieldNames {
    pub height: String,
    pub category: String,
    pub extent_name: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            height: "HEIGHT".to_string(),
            category: "Prop_Class".to_string(),
            extent_name: "Name".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistogramConfig {
    pub max_height: f64,
    pub bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            max_height: 30.0,
            bins: 15,
        }
    }
}

/// Every path and constant a run needs.
#[derive(Debug, Clone)]
pub struct DsmConfig {
    pub boundary_path: PathBuf,
    pub extent_name: String,
    pub dem_path: PathBuf,
    pub footprints_path: PathBuf,
    pub output_path: PathBuf,
    pub figures_dir: PathBuf,

    pub fields: FieldNames,
    pub height_unit_factor: f64,

    pub projected_crs: String,
    pub geographic_crs: String,

    /// `None` skips the supplementary footprint source entirely.
    pub overpass_url: Option<String>,
    pub query_radius_m: f64,
    pub match_distance_m: f64,

    pub histogram: HistogramConfig,
}

impl Default for DsmConfig {
    fn default() -> Self {
        Self {
            boundary_path: PathBuf::from("input_data/geneva_extent.kml"),
            extent_name: "geneva_larger".to_string(),
            dem_path: PathBuf::from("input_data/geneva_dem.tif"),
            footprints_path: PathBuf::from(
                "input_data/ontario_buildings/oc_BuildingFootprints.shp",
            ),
            output_path: PathBuf::from("geneva_dsm.tif"),
            figures_dir: PathBuf::from("figures"),
            fields: FieldNames::default(),
            height_unit_factor: FEET_TO_METERS,
            projected_crs: DEFAULT_PROJECTED_CRS.to_string(),
            geographic_crs: DEFAULT_GEOGRAPHIC_CRS.to_string(),
            overpass_url: Some(DEFAULT_OVERPASS_URL.to_string()),
            query_radius_m: 10_000.0,
            match_distance_m: 300.0,
            histogram: HistogramConfig::default(),
        }
    }
}
