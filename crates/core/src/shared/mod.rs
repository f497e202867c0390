pub mod constants;
pub mod face_geometry;
pub mod frame;
pub mod video_metadata;
