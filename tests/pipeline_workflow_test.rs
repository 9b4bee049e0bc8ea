use building_dsm::{
    DsmConfig, DsmError, DsmPipeline, ElevationGrid, GeoTiffWriter, SupplementarySource,
};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use geo::{polygon, Polygon};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BOUNDARY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "Name": "elsewhere" },
      "geometry": { "type": "Polygon", "coordinates": [[[-80.0, 40.0], [-79.9, 40.0], [-79.9, 40.1], [-80.0, 40.1], [-80.0, 40.0]]] }
    },
    {
      "type": "Feature",
      "properties": { "Name": "test_extent" },
      "geometry": { "type": "Polygon", "coordinates": [[[-77.0, 42.86], [-76.99, 42.86], [-76.99, 42.87], [-77.0, 42.87], [-77.0, 42.86]]] }
    }
  ]
}"#;

// one known height (5 m in feet), one without height covering cell (8, 7),
// one outside the extent
const FOOTPRINTS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "HEIGHT": 16.404199475065617, "Prop_Class": "210" },
      "geometry": { "type": "Polygon", "coordinates": [[[-76.996, 42.864], [-76.994, 42.864], [-76.994, 42.866], [-76.996, 42.866], [-76.996, 42.864]]] }
    },
    {
      "type": "Feature",
      "properties": { "HEIGHT": null, "Prop_Class": "" },
      "geometry": { "type": "Polygon", "coordinates": [[[-76.993, 42.861], [-76.992, 42.861], [-76.992, 42.862], [-76.993, 42.862], [-76.993, 42.861]]] }
    },
    {
      "type": "Feature",
      "properties": { "HEIGHT": 30.0, "Prop_Class": "210" },
      "geometry": { "type": "Polygon", "coordinates": [[[-76.5, 42.5], [-76.4, 42.5], [-76.4, 42.6], [-76.5, 42.6], [-76.5, 42.5]]] }
    }
  ]
}"#;

struct StubSource {
    polygons: Vec<Polygon<f64>>,
}

impl SupplementarySource for StubSource {
    fn fetch(&self, lat: f64, lon: f64, radius_m: f64) -> building_dsm::Result<Vec<Polygon<f64>>> {
        // centroid of the test extent
        assert!((lat - 42.865).abs() < 1e-4, "lat {lat}");
        assert!((lon + 76.995).abs() < 1e-4, "lon {lon}");
        assert_eq!(radius_m, 10_000.0);
        Ok(self.polygons.clone())
    }
}

fn drivers_available() -> bool {
    DriverManager::get_driver_by_name("GTiff").is_ok()
        && DriverManager::get_driver_by_name("GeoJSON").is_ok()
        && SpatialRef::from_epsg(26918).is_ok()
}

/// 10 x 10 cells of 0.001 degrees at 100 m elevation covering the test extent.
fn write_dem(path: &Path) {
    let grid = ElevationGrid {
        rows: 10,
        cols: 10,
        geo_transform: [-77.0, 0.001, 0.0, 42.87, 0.0, -0.001],
        values: vec![100.0; 100],
        no_data: Some(-9999.0),
        crs_wkt: SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap(),
    };
    GeoTiffWriter::new().write(&grid, path).unwrap();
}

fn test_config(dir: &Path) -> DsmConfig {
    let boundary_path = dir.join("boundary.geojson");
    let footprints_path = dir.join("footprints.geojson");
    let dem_path = dir.join("dem.tif");
    fs::write(&boundary_path, BOUNDARY).unwrap();
    fs::write(&footprints_path, FOOTPRINTS).unwrap();
    write_dem(&dem_path);

    DsmConfig {
        boundary_path,
        extent_name: "test_extent".to_string(),
        dem_path,
        footprints_path,
        output_path: dir.join("dsm.tif"),
        figures_dir: dir.join("figures"),
        overpass_url: None,
        ..DsmConfig::default()
    }
}

fn read_values(path: &Path) -> Vec<f32> {
    let dataset = Dataset::open(path).unwrap();
    assert_eq!(dataset.raster_size(), (10, 10));
    let band = dataset.rasterband(1).unwrap();
    let buffer = band.read_as::<f32>((0, 0), (10, 10), (10, 10), None).unwrap();
    let (_, values) = buffer.into_shape_and_vec();
    values
}

#[test]
fn test_full_pipeline_with_supplementary_footprints() {
    if !drivers_available() {
        eprintln!("Skipping test: GTiff/GeoJSON driver or PROJ database not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let output_path = config.output_path.clone();
    let figures_dir = config.figures_dir.clone();

    let source = StubSource {
        polygons: vec![
            // same outline as the municipal footprint with a height
            polygon![
                (x: -76.996, y: 42.864),
                (x: -76.994, y: 42.864),
                (x: -76.994, y: 42.866),
                (x: -76.996, y: 42.866),
            ],
            // rows 1-2, cols 1-2
            polygon![
                (x: -76.999, y: 42.867),
                (x: -76.997, y: 42.867),
                (x: -76.997, y: 42.869),
                (x: -76.999, y: 42.869),
            ],
            // outside the extent
            polygon![
                (x: -75.0, y: 42.0),
                (x: -74.99, y: 42.0),
                (x: -74.99, y: 42.01),
                (x: -75.0, y: 42.01),
            ],
        ],
    };

    let pipeline = DsmPipeline::with_source(config, Some(Box::new(source)));
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.buildings, 3);
    assert_eq!(summary.added_from_supplementary, 1);
    assert_eq!(summary.still_missing, 0);
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.reports[0].imputed, 0);
    assert_eq!(summary.reports[1].imputed, 2);

    let values = read_values(&output_path);
    let raised: Vec<usize> = (0..100).filter(|&i| values[i] > 100.5).collect();
    // the footprint without height takes 5 m from its nearest neighbor and covers cell 87
    assert_eq!(raised, vec![11, 12, 21, 22, 44, 45, 54, 55, 87]);
    for i in raised {
        assert!((values[i] - 105.0).abs() < 1e-3, "cell {i}: {}", values[i]);
    }
    assert_eq!(values.iter().filter(|&&v| v == 100.0).count(), 91);

    for figure in [
        "dem_thumbnail.png",
        "dsm_thumbnail.png",
        "hist_building_height.png",
        "building_footprints.png",
    ] {
        assert!(figures_dir.join(figure).exists(), "missing {figure}");
    }
}

#[test]
fn test_pipeline_without_supplementary_source() {
    if !drivers_available() {
        eprintln!("Skipping test: GTiff/GeoJSON driver or PROJ database not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let output_path = config.output_path.clone();

    let summary = DsmPipeline::new(config).unwrap().run().unwrap();

    assert_eq!(summary.buildings, 2);
    assert_eq!(summary.added_from_supplementary, 0);
    assert_eq!(summary.still_missing, 0);

    let values = read_values(&output_path);
    let raised: Vec<usize> = (0..100).filter(|&i| values[i] > 100.5).collect();
    assert_eq!(raised, vec![44, 45, 54, 55, 87]);
    assert!((values[87] - 105.0).abs() < 1e-3);
}

#[test]
fn test_unknown_extent_name_fails() {
    if !drivers_available() {
        eprintln!("Skipping test: GTiff/GeoJSON driver or PROJ database not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path());
    config.extent_name = "nowhere".to_string();
    let output_path = config.output_path.clone();

    let err = DsmPipeline::with_source(config, None).run().unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DsmError>(),
        Some(DsmError::ExtentNotFound { name, .. }) if name == "nowhere"
    ));
    assert!(!output_path.exists());
}
