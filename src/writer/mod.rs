use anyhow::{Context, Result};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use std::path::Path;

use crate::model::ElevationGrid;

const NODATA_VALUE: f64 = -9999.0;

#[derive(Default)]
pub struct GeoTiffWriter {}

impl GeoTiffWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, grid: &ElevationGrid, output_path: &Path) -> Result<()> {
        let driver =
            DriverManager::get_driver_by_name("GTiff").context("Failed to get GTiff driver")?;

        let (rows, cols) = grid.shape();
        let mut dataset = driver
            .create_with_band_type::<f32, _>(output_path, cols, rows, 1)
            .context("Failed to create dataset")?;

        self.set_geo_metadata(&mut dataset, grid)?;

        let mut band = dataset.rasterband(1).context("Failed to get raster band")?;

        // reuse the DEM's no-data marker
        let no_data = grid.no_data.map(f64::from).unwrap_or(NODATA_VALUE);
        band.set_no_data_value(Some(no_data))
            .context("Failed to set no data value")?;

        let values = match grid.no_data {
            Some(_) => grid.values.clone(),
            None => grid
                .values
                .iter()
                .map(|&v| if v.is_nan() { NODATA_VALUE as f32 } else { v })
                .collect(),
        };

        // GDAL expects row-major order
        let mut buffer = Buffer::new((cols, rows), values);
        band.write((0, 0), (cols, rows), &mut buffer)
            .context("Failed to write raster data")?;

        tracing::info!("Written DSM GeoTIFF: {:?} ({} x {})", output_path, cols, rows);
        Ok(())
    }

    fn set_geo_metadata(&self, dataset: &mut Dataset, grid: &ElevationGrid) -> Result<()> {
        dataset
            .set_geo_transform(&grid.geo_transform)
            .context("Failed to set geo transform")?;

        if grid.crs_wkt.is_empty() {
            tracing::warn!("DSM has no coordinate system; writing without projection");
        } else {
            let srs = SpatialRef::from_wkt(&grid.crs_wkt)
                .context("Failed to parse DEM coordinate system")?;
            let wkt = srs
                .to_wkt()
                .context("Failed to convert SpatialRef to WKT")?;
            dataset
                .set_projection(&wkt)
                .context("Failed to set projection")?;
        }

        dataset
            .set_metadata_item("PRODUCT", "DSM", "")
            .context("Failed to set product metadata")?;

        Ok(())
    }
}
