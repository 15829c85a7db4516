//! Plot rendering adapters

pub mod raster;

pub use raster::RasterPlotRenderer;
