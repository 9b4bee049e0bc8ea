use gdal::vector::LayerAccess;
use gdal::Dataset;
use std::path::Path;
use tracing::{debug, info};

use crate::config::FieldNames;
use crate::crs::Reprojector;
use crate::error::{DsmError, Result};
use crate::model::{polygons_of, Building, Extent};

pub fn feet_to_meters(feet: f64, factor: f64) -> f64 {
    feet * factor
}

/// Loads municipal building footprints that fall within the extent.
///
/// Footprints are reprojected into the extent CRS. Multipolygon features
/// contribute one building per member polygon, each carrying the feature's
/// height and category.
pub fn load_footprints(
    path: &Path,
    fields: &FieldNames,
    unit_factor: f64,
    extent: &Extent,
) -> Result<Vec<Building>> {
    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;

    let reprojector = match layer.spatial_ref() {
        Some(srs) => Reprojector::new(&srs.to_wkt()?, &extent.crs_wkt)?,
        None => Reprojector::identity(),
    };

    let mut buildings = Vec::new();
    let mut outside = 0usize;

    for feature in layer.features() {
        let Some(geometry) = feature.geometry() else {
            continue;
        };

        let height_idx = feature
            .field_index(&fields.height)
            .map_err(|_| DsmError::MissingField(fields.height.clone()))?;
        let category_idx = feature
            .field_index(&fields.category)
            .map_err(|_| DsmError::MissingField(fields.category.clone()))?;

        let raw_height = feature.field_as_double(height_idx)?;
        let category = feature
            .field_as_string(category_idx)?
            .filter(|c| !c.trim().is_empty());

        for polygon in polygons_of(geometry.to_geo()?) {
            let footprint = reprojector.polygon(&polygon)?;
            if !extent.contains(&footprint) {
                outside += 1;
                continue;
            }
            buildings.push(Building::municipal(
                footprint,
                raw_height,
                category.clone(),
                unit_factor,
            ));
        }
    }

    debug!("Dropped {} footprints outside the extent", outside);
    info!("Loaded {} buildings in study extent", buildings.len());
    Ok(buildings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_to_meters_is_exact_product() {
        for feet in [1.0, 12.5, 33.0, 250.0] {
            assert_eq!(feet_to_meters(feet, 0.3048), feet * 0.3048);
        }
        assert!((feet_to_meters(10.0, 0.3048) - 3.048).abs() < 1e-12);
    }
}
