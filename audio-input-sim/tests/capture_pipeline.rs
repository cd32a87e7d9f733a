use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use audio_input_core::processing::sample::decode_sample;
use audio_input_core::storage::metadata::read_metadata;
use audio_input_core::{
    AudioInput, EventDispatcher, InputConfiguration, InputDelegate, InputError, InputEvent, InputState,
    SampleFormat, StreamFormat, WavFileSink, WriteSink,
};
use audio_input_sim::{ManualDevice, SignalSource};
use parking_lot::Mutex;

fn cd_stereo() -> StreamFormat {
    StreamFormat::new(44100, 2, SampleFormat::I16)
}

fn config(buffer_size: usize) -> InputConfiguration {
    InputConfiguration {
        buffer_size,
        notify_interval_ms: 0,
        ..InputConfiguration::default()
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn pull_mode_returns_frames_in_order() {
    let data = pattern(11520);
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::pcm(data.clone()));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));

    let mut stream = input.start().unwrap();
    assert_eq!(input.period_size(), 3840);
    assert_eq!(trigger.period_frames(), 960);

    for _ in 0..3 {
        trigger.tick(960);
    }
    assert_eq!(input.bytes_ready(), 11520);

    let mut out = vec![0u8; 11520];
    assert_eq!(stream.read_bytes(&mut out), 11520);
    assert_eq!(out, data);
    assert_eq!(input.bytes_ready(), 0);
}

#[test]
fn pull_mode_reads_whole_periods_only() {
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::pcm(pattern(7680)));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    let mut stream = input.start().unwrap();
    trigger.tick_period();

    let mut out = vec![0u8; 3000];
    assert_eq!(stream.read_bytes(&mut out), 0);

    trigger.tick_period();
    let mut out = vec![0u8; 5000];
    assert_eq!(stream.read_bytes(&mut out), 3840);
    assert_eq!(&out[..3840], &pattern(7680)[..3840]);
}

#[test]
fn pull_mode_signals_ready_read() {
    let device = ManualDevice::new(cd_stereo());
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    let events = input.events();
    let _stream = input.start().unwrap();

    trigger.tick_period();
    assert!(events.try_iter().any(|e| e == InputEvent::ReadyRead));
}

#[test]
fn stream_reads_to_end_after_stop() {
    let data = pattern(7680);
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::pcm(data.clone()));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    let mut stream = input.start().unwrap();

    trigger.tick_period();
    trigger.tick_period();
    input.stop();

    let mut all = Vec::new();
    assert_eq!(stream.read_to_end(&mut all).unwrap(), 7680);
    assert_eq!(all, data);
}

#[test]
fn stream_copies_through_io() {
    let data = pattern(11520);
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::pcm(data.clone()));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    let mut stream = input.start().unwrap();
    for _ in 0..3 {
        trigger.tick_period();
    }
    input.stop();

    let mut copied = Vec::new();
    assert_eq!(io::copy(&mut stream, &mut copied).unwrap(), 11520);
    assert_eq!(copied, data);
}

#[test]
fn live_stream_would_block_when_empty() {
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::pcm(pattern(7680)));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    let mut stream = input.start().unwrap();

    let mut buf = vec![0u8; 3840];
    assert_eq!(stream.read(&mut buf).unwrap_err().kind(), io::ErrorKind::WouldBlock);

    trigger.tick_period();
    let mut small = [0u8; 100];
    assert_eq!(stream.read(&mut small).unwrap(), 100);
    assert_eq!(&small[..], &pattern(100)[..]);
    assert_eq!(stream.bytes_ready(), 3740);
    input.stop();
}

#[test]
fn push_mode_flushes_everything_on_stop() {
    let data = pattern(11520);
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::pcm(data.clone()));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    let events = input.events();

    let sink = Arc::new(Mutex::new(WriteSink::new(Vec::new())));
    assert!(input.start_with_sink(Box::new(Arc::clone(&sink))));
    for _ in 0..3 {
        trigger.tick_period();
    }
    input.stop();

    assert_eq!(sink.lock().get_ref(), &data);
    assert_eq!(input.bytes_ready(), 0);
    assert!(!events.try_iter().any(|e| e == InputEvent::ReadyRead));
}

#[test]
fn push_mode_flushes_periodically() {
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::constant(0.25));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));

    let sink = Arc::new(Mutex::new(WriteSink::new(Vec::new())));
    assert!(input.start_with_sink(Box::new(Arc::clone(&sink))));
    trigger.tick_period();
    trigger.tick_period();

    let deadline = Instant::now() + Duration::from_secs(2);
    while sink.lock().get_ref().len() < 7680 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(sink.lock().get_ref().len(), 7680);
    assert_eq!(input.state(), InputState::Active);
    input.stop();
}

#[test]
fn push_mode_records_wav_file() {
    let dir = std::env::temp_dir().join(format!("audio_input_sim_{}", uuid::Uuid::new_v4()));
    let path = dir.join("capture.wav");
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::sine(440.0, 0.5));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));

    let wav = Arc::new(Mutex::new(WavFileSink::create(&path, cd_stereo()).unwrap()));
    assert!(input.start_with_sink(Box::new(Arc::clone(&wav))));
    for _ in 0..4 {
        trigger.tick_period();
    }
    input.stop();

    let summary = wav.lock().finalize().unwrap();
    assert_eq!(summary.data_bytes, 4 * 3840);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 44 + 4 * 3840);
    let metadata = read_metadata(&path).unwrap();
    assert_eq!(metadata.checksum, summary.checksum);
    assert_eq!(metadata.format, cd_stereo());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn converts_device_format_to_requested_format() {
    let device_format = StreamFormat::new(48000, 2, SampleFormat::F32);
    let requested = StreamFormat::new(48000, 1, SampleFormat::I16);
    let device = ManualDevice::new(device_format).with_source(SignalSource::constant(0.5));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, requested, config(960));

    let mut stream = input.start().unwrap();
    assert_eq!(input.device_format(), Some(device_format));
    assert_eq!(trigger.configured_format(), Some(device_format));
    assert_eq!(input.period_size(), 960);

    trigger.tick_period();
    let mut out = vec![0u8; 960];
    assert_eq!(stream.read_bytes(&mut out), 960);
    for sample in out.chunks(2) {
        assert_eq!(i16::from_le_bytes([sample[0], sample[1]]), 16384);
    }
}

#[test]
fn volume_scales_captured_samples() {
    let device = ManualDevice::new(cd_stereo()).with_source(SignalSource::constant(0.5));
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    input.set_volume(0.5);

    let mut stream = input.start().unwrap();
    trigger.tick_period();
    let mut out = vec![0u8; 3840];
    assert_eq!(stream.read_bytes(&mut out), 3840);
    for sample in out.chunks(2) {
        approx::assert_relative_eq!(decode_sample(SampleFormat::I16, sample), 0.25);
    }
}

#[test]
fn notify_reports_processed_time() {
    let device = ManualDevice::new(cd_stereo());
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));
    input.set_notify_interval(20);
    let events = input.events();

    let _stream = input.start().unwrap();
    trigger.tick_period();
    let expected = 960 * 1_000_000 / 44100;

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut seen = None;
    while Instant::now() < deadline {
        if let Ok(InputEvent::Notify { processed_usecs, .. }) = events.recv_timeout(Duration::from_millis(50)) {
            if processed_usecs > 0 {
                seen = Some(processed_usecs);
                break;
            }
        }
    }
    assert_eq!(seen, Some(expected));
    input.stop();
}

#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<(InputState, InputError)>>,
}

impl InputDelegate for Recorder {
    fn on_state_changed(&self, state: InputState, error: InputError) {
        self.states.lock().push((state, error));
    }
}

#[test]
fn dispatcher_delivers_state_changes_to_delegate() {
    let device = ManualDevice::new(cd_stereo());
    let trigger = device.trigger();
    let mut input = AudioInput::new(device, cd_stereo(), config(3840));

    let recorder = Arc::new(Recorder::default());
    let mut dispatcher = EventDispatcher::spawn(input.events(), recorder.clone()).unwrap();

    let _stream = input.start().unwrap();
    trigger.tick_period();
    input.stop();

    let deadline = Instant::now() + Duration::from_secs(2);
    while recorder.states.lock().len() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    dispatcher.stop();

    assert_eq!(
        *recorder.states.lock(),
        vec![
            (InputState::Idle, InputError::NoError),
            (InputState::Active, InputError::NoError),
            (InputState::Stopped, InputError::NoError),
        ]
    );
}
