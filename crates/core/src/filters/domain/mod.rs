pub mod drawing_surface;
pub mod filter_assets;
pub mod filter_drawing;
pub mod filter_id;
pub mod filter_registry;
