pub mod frame_sink;
pub mod video_source;
