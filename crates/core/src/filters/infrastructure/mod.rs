pub mod asset_loader;
pub mod raster_surface;
