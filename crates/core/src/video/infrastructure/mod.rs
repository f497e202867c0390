pub mod channel_frame_sink;
pub mod ffmpeg_video_source;
pub mod png_sequence_sink;
pub mod still_image_source;
