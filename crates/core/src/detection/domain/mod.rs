pub mod detection_executor;
pub mod detection_result;
pub mod detection_scheduler;
pub mod face_geometry_source;
pub mod geometry_cache;
