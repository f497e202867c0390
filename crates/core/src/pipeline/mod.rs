pub mod compositor;
pub mod frame_clock;
pub mod infrastructure;
pub mod pipeline_config;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod pipeline_state;
