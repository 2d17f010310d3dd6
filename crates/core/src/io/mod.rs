//! I/O for reading and writing the pipeline's inputs and outputs
//!
//! - GeoTIFF rasters through the `tiff` crate (geotransform and GDAL nodata tags)
//! - GeoJSON flood polygons through `geojson`

mod geojson;
mod geotiff;

pub use geojson::{parse_flood_polygon, read_flood_polygon};
pub use geotiff::{read_geotiff, write_geotiff, GeoTiffOptions};
