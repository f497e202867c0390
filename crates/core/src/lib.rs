pub mod detection;
pub mod filters;
pub mod pipeline;
pub mod shared;
pub mod video;
