use gdal::Dataset;
use std::path::Path;
use tracing::info;

use crate::crs::Reprojector;
use crate::error::{DsmError, Result};
use crate::model::{ElevationGrid, Extent};

/// Reads band 1 of a north-up raster as `f32`.
pub fn load_dem(path: &Path) -> Result<ElevationGrid> {
    let dataset = Dataset::open(path)?;
    let geo_transform = dataset.geo_transform()?;
    let (cols, rows) = dataset.raster_size();

    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value().map(|v| v as f32);
    let buffer = band.read_as::<f32>((0, 0), (cols, rows), (cols, rows), None)?;
    let (_, values) = buffer.into_shape_and_vec();

    let grid = ElevationGrid {
        rows,
        cols,
        geo_transform,
        values,
        no_data,
        crs_wkt: dataset.projection(),
    };
    if !grid.is_north_up() {
        return Err(DsmError::RotatedRaster(grid.geo_transform));
    }

    info!("Loaded DEM {:?}: {} x {} cells", path, cols, rows);
    Ok(grid)
}

/// Reads the DEM and crops it to the extent envelope, expressed in the raster's CRS.
pub fn load_cropped_dem(path: &Path, extent: &Extent) -> Result<ElevationGrid> {
    let dem = load_dem(path)?;

    let reprojector = if dem.crs_wkt.is_empty() {
        Reprojector::identity()
    } else {
        Reprojector::new(&extent.crs_wkt, &dem.crs_wkt)?
    };
    let envelope = reprojector.rect(&extent.envelope())?;

    let cropped = dem.crop_to(&envelope)?;
    info!(
        "Cropped DEM to extent: {} x {} cells",
        cropped.cols, cropped.rows
    );
    Ok(cropped)
}
