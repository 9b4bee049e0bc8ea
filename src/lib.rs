pub mod colormap;
pub mod config;
pub mod crs;
pub mod dem;
pub mod diagnostics;
pub mod error;
pub mod extent;
pub mod footprints;
pub mod imputation;
pub mod model;
pub mod osm;
pub mod pipeline;
pub mod rasterize;
pub mod spatial;
pub mod writer;

#[cfg(test)]
mod test_util;

pub use config::DsmConfig;
pub use error::{DsmError, Result};
pub use imputation::{ImputationPlan, ImputationStrategy};
pub use model::{Building, ElevationGrid, Extent, FootprintSource};
pub use osm::{OverpassClient, SupplementarySource};
pub use pipeline::{DsmPipeline, RunSummary};
pub use writer::GeoTiffWriter;
