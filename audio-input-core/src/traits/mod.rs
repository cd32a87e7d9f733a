pub mod byte_sink;
pub mod format_converter;
pub mod input_delegate;
pub mod input_device;
