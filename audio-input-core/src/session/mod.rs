pub mod audio_input;
pub mod dispatcher;
pub mod stream;
