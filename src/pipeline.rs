use anyhow::{Context, Result};
use geo::{Centroid, Polygon};
use std::fs;
use tracing::{info, warn};

use crate::config::DsmConfig;
use crate::crs::Reprojector;
use crate::dem::load_cropped_dem;
use crate::diagnostics::{write_footprint_map, write_height_histogram, write_raster_thumbnail};
use crate::error::DsmError;
use crate::extent::load_extent;
use crate::footprints::load_footprints;
use crate::imputation::{
    count_missing, select_missing_footprints, CategoryMean, ImputationPlan, ImputationReport,
    NearestNeighbor,
};
use crate::model::{Building, ElevationGrid, Extent};
use crate::osm::{OverpassClient, SupplementarySource};
use crate::rasterize::{rasterize_buildings, RasterizeOutcome};
use crate::writer::GeoTiffWriter;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub buildings: usize,
    pub added_from_supplementary: usize,
    pub reports: Vec<ImputationReport>,
    pub still_missing: usize,
    pub burned: usize,
}

pub struct DsmPipeline {
    config: DsmConfig,
    supplementary: Option<Box<dyn SupplementarySource>>,
}

impl DsmPipeline {
    /// Uses the Overpass API as supplementary source unless the config disables it.
    pub fn new(config: DsmConfig) -> crate::error::Result<Self> {
        let supplementary = match &config.overpass_url {
            Some(url) => Some(Box::new(OverpassClient::new(url)?) as Box<dyn SupplementarySource>),
            None => None,
        };
        Ok(Self::with_source(config, supplementary))
    }

    pub fn with_source(
        config: DsmConfig,
        supplementary: Option<Box<dyn SupplementarySource>>,
    ) -> Self {
        Self {
            config,
            supplementary,
        }
    }

    pub fn config(&self) -> &DsmConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunSummary> {
        let cfg = &self.config;
        fs::create_dir_all(&cfg.figures_dir)
            .with_context(|| format!("Failed to create {:?}", cfg.figures_dir))?;

        info!("Loading inputs...");
        let extent = load_extent(&cfg.boundary_path, &cfg.fields.extent_name, &cfg.extent_name)
            .context("Failed to load extent")?;
        let dem = load_cropped_dem(&cfg.dem_path, &extent).context("Failed to load DEM")?;
        write_raster_thumbnail(&dem, &cfg.figures_dir.join("dem_thumbnail.png"))?;

        let mut buildings = load_footprints(
            &cfg.footprints_path,
            &cfg.fields,
            cfg.height_unit_factor,
            &extent,
        )
        .context("Failed to load building footprints")?;
        let supplementary = self.fetch_supplementary(&extent)?;

        info!("Imputing building data...");
        info!("{} buildings lack height data", count_missing(&buildings));
        let to_metric = Reprojector::new(&extent.crs_wkt, &cfg.projected_crs)?;

        let metric = to_metric.polygons(&footprints(&buildings))?;
        let mut reports =
            ImputationPlan::new(vec![Box::new(CategoryMean)]).run(&mut buildings, &metric)?;
        write_height_histogram(
            &buildings,
            &cfg.histogram,
            &cfg.figures_dir.join("hist_building_height.png"),
        )?;

        let added = merge_supplementary(
            &mut buildings,
            supplementary,
            &to_metric,
            cfg.match_distance_m,
        )?;
        write_footprint_map(
            &extent.envelope(),
            &buildings,
            &cfg.figures_dir.join("building_footprints.png"),
        )?;

        let metric = to_metric.polygons(&footprints(&buildings))?;
        reports.extend(
            ImputationPlan::new(vec![Box::new(NearestNeighbor)]).run(&mut buildings, &metric)?,
        );
        let still_missing = count_missing(&buildings);

        info!("Making DSM...");
        let outcome = build_dsm(&dem, &extent, &buildings)?;
        write_raster_thumbnail(&outcome.dsm, &cfg.figures_dir.join("dsm_thumbnail.png"))?;

        info!("Saving DSM...");
        GeoTiffWriter::new()
            .write(&outcome.dsm, &cfg.output_path)
            .with_context(|| format!("Failed to write {:?}", cfg.output_path))?;

        Ok(RunSummary {
            buildings: buildings.len(),
            added_from_supplementary: added,
            reports,
            still_missing,
            burned: outcome.burned,
        })
    }

    /// Supplementary polygons around the extent centroid, in the extent CRS and within it.
    fn fetch_supplementary(&self, extent: &Extent) -> crate::error::Result<Vec<Polygon<f64>>> {
        let Some(source) = &self.supplementary else {
            info!("Supplementary footprint source disabled");
            return Ok(Vec::new());
        };
        let cfg = &self.config;

        // the centroid is only meaningful in a projected CRS
        let projected =
            Reprojector::new(&extent.crs_wkt, &cfg.projected_crs)?.polygon(&extent.polygon)?;
        let centroid = projected
            .centroid()
            .ok_or_else(|| DsmError::UnsupportedGeometry("extent has no centroid".to_string()))?;
        let center = Reprojector::new(&cfg.projected_crs, &cfg.geographic_crs)?.point(centroid)?;

        let polygons = source.fetch(center.y(), center.x(), cfg.query_radius_m)?;

        let to_extent = Reprojector::new(&cfg.geographic_crs, &extent.crs_wkt)?;
        let mut kept = Vec::with_capacity(polygons.len());
        for polygon in &polygons {
            let polygon = to_extent.polygon(polygon)?;
            if extent.contains(&polygon) {
                kept.push(polygon);
            }
        }
        info!("Loaded {} supplementary buildings inside extent", kept.len());
        Ok(kept)
    }
}

fn footprints(buildings: &[Building]) -> Vec<Polygon<f64>> {
    buildings.iter().map(|b| b.footprint.clone()).collect()
}

/// Appends supplementary footprints with no coincident primary footprint.
///
/// `supplementary` is in the same CRS as the buildings; `to_metric` moves both
/// into the projected CRS where distances are compared.
pub fn merge_supplementary(
    buildings: &mut Vec<Building>,
    supplementary: Vec<Polygon<f64>>,
    to_metric: &Reprojector,
    match_distance: f64,
) -> crate::error::Result<usize> {
    if supplementary.is_empty() {
        return Ok(0);
    }
    let primary = to_metric.polygons(&footprints(buildings))?;
    let candidates = to_metric.polygons(&supplementary)?;

    let selected = select_missing_footprints(&candidates, &primary, match_distance);
    let added = selected.len();

    let mut supplementary: Vec<Option<Polygon<f64>>> =
        supplementary.into_iter().map(Some).collect();
    for i in selected {
        if let Some(footprint) = supplementary[i].take() {
            buildings.push(Building::supplementary(footprint));
        }
    }

    info!("Added {} buildings from OpenStreetMap", added);
    Ok(added)
}

/// Reprojects footprints into the DEM's CRS and burns them.
pub fn build_dsm(
    dem: &ElevationGrid,
    extent: &Extent,
    buildings: &[Building],
) -> crate::error::Result<RasterizeOutcome> {
    let to_dem = if dem.crs_wkt.is_empty() {
        warn!("DEM has no coordinate system; assuming footprints share it");
        Reprojector::identity()
    } else {
        Reprojector::new(&extent.crs_wkt, &dem.crs_wkt)?
    };

    let mut in_dem_crs = buildings.to_vec();
    for building in in_dem_crs.iter_mut() {
        building.footprint = to_dem.polygon(&building.footprint)?;
    }
    Ok(rasterize_buildings(dem, &in_dem_crs))
}
