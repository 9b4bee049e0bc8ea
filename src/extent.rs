use gdal::vector::LayerAccess;
use gdal::Dataset;
use std::path::Path;
use tracing::{debug, info};

use crate::config::DEFAULT_GEOGRAPHIC_CRS;
use crate::error::{DsmError, Result};
use crate::model::Extent;

/// Loads the feature called `name` from a boundary file and reduces it to its envelope.
///
/// Every layer is searched; features with any other name are ignored. Layers
/// without a spatial reference (plain KML) are taken to be WGS 84.
pub fn load_extent(path: &Path, name_field: &str, name: &str) -> Result<Extent> {
    let dataset = Dataset::open(path)?;

    for mut layer in dataset.layers() {
        let crs_wkt = match layer.spatial_ref() {
            Some(srs) => srs.to_wkt()?,
            None => crate::crs::spatial_ref(DEFAULT_GEOGRAPHIC_CRS)?.to_wkt()?,
        };
        debug!("Searching layer '{}' for extent '{}'", layer.name(), name);

        for feature in layer.features() {
            let Ok(idx) = feature.field_index(name_field) else {
                continue;
            };
            if feature.field_as_string(idx)?.as_deref() != Some(name) {
                continue;
            }
            let Some(geometry) = feature.geometry() else {
                continue;
            };

            let extent = Extent::from_geometry(&geometry.to_geo()?, crs_wkt)?;
            let env = extent.envelope();
            info!(
                "Loaded extent '{}': ({:.5}, {:.5}) - ({:.5}, {:.5})",
                name,
                env.min().x,
                env.min().y,
                env.max().x,
                env.max().y
            );
            return Ok(extent);
        }
    }

    Err(DsmError::ExtentNotFound {
        name: name.to_string(),
        path: path.display().to_string(),
    })
}
