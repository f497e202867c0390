pub mod interval_frame_clock;
