use thiserror::Error;

#[derive(Error, Debug)]
pub enum DsmError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No feature named '{name}' in {path}")]
    ExtentNotFound { name: String, path: String },

    #[error("Extent does not cover any cell center of the raster")]
    EmptyWindow,

    #[error("Field '{0}' not found in layer")]
    MissingField(String),

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Overpass API returned status {0}")]
    OverpassStatus(u16),

    #[error("{footprints} metric footprints given for {buildings} buildings")]
    FootprintCountMismatch { buildings: usize, footprints: usize },

    #[error("Rotated rasters are not supported (geo-transform {0:?})")]
    RotatedRaster([f64; 6]),
}

pub type Result<T> = std::result::Result<T, DsmError>;
