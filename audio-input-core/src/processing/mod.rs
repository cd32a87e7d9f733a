pub mod converter;
pub mod frame_batch;
pub mod input_buffer;
pub mod packet_feeder;
pub mod ring_buffer;
pub mod sample;
pub mod timer;
pub mod wav_format;
