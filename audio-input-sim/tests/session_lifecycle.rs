use std::sync::Arc;

use audio_input_core::{
    AudioInput, InputConfiguration, InputError, InputEvent, InputState, SampleFormat, StreamFormat, WriteSink,
};
use audio_input_sim::{ManualDevice, ManualTrigger, SignalSource};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;

fn format() -> StreamFormat {
    StreamFormat::new(44100, 2, SampleFormat::I16)
}

fn config() -> InputConfiguration {
    InputConfiguration {
        buffer_size: 3840,
        notify_interval_ms: 0,
        halt_timeout_ms: 500,
        ..InputConfiguration::default()
    }
}

fn session(device: ManualDevice) -> (AudioInput<ManualDevice>, ManualTrigger) {
    let trigger = device.trigger();
    (AudioInput::new(device, format(), config()), trigger)
}

fn state_changes(events: &Receiver<InputEvent>) -> Vec<(InputState, InputError)> {
    events
        .try_iter()
        .filter_map(|e| match e {
            InputEvent::StateChanged { state, error } => Some((state, error)),
            _ => None,
        })
        .collect()
}

#[test]
fn start_goes_idle_then_active_on_first_frames() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let events = input.events();

    assert!(input.start().is_some());
    assert_eq!(input.state(), InputState::Idle);
    assert_eq!(input.error(), InputError::NoError);
    assert!(trigger.is_running());

    trigger.tick_period();
    assert_eq!(input.state(), InputState::Active);
    assert_eq!(
        state_changes(&events),
        vec![
            (InputState::Idle, InputError::NoError),
            (InputState::Active, InputError::NoError),
        ]
    );
}

#[test]
fn stop_halts_device_and_clears_error() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let _stream = input.start().unwrap();
    for _ in 0..5 {
        trigger.tick_period();
    }
    assert_eq!(input.error(), InputError::UnderrunError);

    input.stop();
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.error(), InputError::NoError);
    assert!(!trigger.is_running());
    assert_eq!(trigger.tick_period(), None);

    // Stopping twice is a no-op.
    input.stop();
    assert_eq!(input.state(), InputState::Stopped);
}

#[test]
fn stop_before_first_frames() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let events = input.events();
    let _stream = input.start().unwrap();
    assert_eq!(input.state(), InputState::Idle);

    input.stop();
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.error(), InputError::NoError);
    assert!(!trigger.is_running());
    assert_eq!(
        state_changes(&events),
        vec![
            (InputState::Idle, InputError::NoError),
            (InputState::Stopped, InputError::NoError),
        ]
    );
}

#[test]
fn stop_while_suspended_flushes_the_sink() {
    let data: Vec<u8> = (0..7680).map(|i| (i % 251) as u8).collect();
    let (mut input, trigger) = session(ManualDevice::new(format()).with_source(SignalSource::pcm(data.clone())));
    let sink = Arc::new(Mutex::new(WriteSink::new(Vec::new())));
    assert!(input.start_with_sink(Box::new(Arc::clone(&sink))));
    trigger.tick_period();
    trigger.tick_period();

    input.suspend();
    assert_eq!(input.state(), InputState::Suspended);
    input.stop();

    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.error(), InputError::NoError);
    assert_eq!(sink.lock().get_ref(), &data);
    assert_eq!(input.bytes_ready(), 0);
    assert!(!trigger.is_running());
}

#[test]
fn unread_events_do_not_crowd_out_stop() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let events = input.events();
    let mut stream = input.start().unwrap();
    let mut out = vec![0u8; input.period_size()];

    for _ in 0..80 {
        trigger.tick_period();
        assert_eq!(stream.read_bytes(&mut out), out.len());
    }
    input.stop();

    let changes = state_changes(&events);
    assert_eq!(changes.last(), Some(&(InputState::Stopped, InputError::NoError)));
    assert!(changes.contains(&(InputState::Active, InputError::NoError)));
}

#[test]
fn full_buffer_drops_to_idle_with_underrun() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let events = input.events();
    let mut stream = input.start().unwrap();
    let period = input.period_size();

    for _ in 0..4 {
        trigger.tick_period();
    }
    assert_eq!(input.bytes_ready(), 4 * period);
    assert_eq!(input.state(), InputState::Active);

    trigger.tick_period();
    assert_eq!(input.state(), InputState::Idle);
    assert_eq!(input.error(), InputError::UnderrunError);
    assert!(state_changes(&events).contains(&(InputState::Idle, InputError::UnderrunError)));

    let mut out = vec![0u8; period];
    assert_eq!(stream.read_bytes(&mut out), period);
    trigger.tick_period();
    assert_eq!(input.state(), InputState::Active);
}

#[test]
fn suspend_and_resume() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let _stream = input.start().unwrap();
    trigger.tick_period();

    input.suspend();
    assert_eq!(input.state(), InputState::Suspended);
    assert!(!trigger.is_running());
    let buffered = input.bytes_ready();

    input.suspend();
    assert_eq!(input.state(), InputState::Suspended);
    assert_eq!(trigger.tick_period(), None);
    assert_eq!(input.bytes_ready(), buffered);

    input.resume();
    assert_eq!(input.state(), InputState::Active);
    assert!(trigger.is_running());
    trigger.tick_period();
    assert_eq!(input.bytes_ready(), buffered + input.period_size());

    // Resume outside Suspended does nothing.
    input.resume();
    assert_eq!(input.state(), InputState::Active);
}

#[test]
fn suspend_from_stopped_is_noop() {
    let (mut input, _trigger) = session(ManualDevice::new(format()));
    input.suspend();
    assert_eq!(input.state(), InputState::Stopped);
}

#[test]
fn device_error_stops_with_io_error() {
    let device = ManualDevice::new(format()).with_source(SignalSource::silence().fail_after(1));
    let (mut input, trigger) = session(device);
    let events = input.events();
    let _stream = input.start().unwrap();

    trigger.tick_period();
    assert_eq!(input.state(), InputState::Active);

    trigger.tick_period();
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.error(), InputError::IoError);
    assert!(!trigger.is_running());
    assert_eq!(
        state_changes(&events).last(),
        Some(&(InputState::Stopped, InputError::IoError))
    );
}

#[test]
fn error_while_idle_is_ignored() {
    let device = ManualDevice::new(format()).with_source(SignalSource::silence().fail_after(0));
    let (mut input, trigger) = session(device);
    let _stream = input.start().unwrap();

    trigger.tick_period();
    assert_eq!(input.state(), InputState::Idle);
    assert_eq!(input.error(), InputError::NoError);
}

#[test]
fn failed_device_start_reports_open_error() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    trigger.set_fail_start(true);

    assert!(input.start().is_none());
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.error(), InputError::OpenError);
}

#[test]
fn failed_resume_reports_io_error() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let _stream = input.start().unwrap();
    input.suspend();

    trigger.set_fail_start(true);
    input.resume();
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.error(), InputError::IoError);
}

#[test]
fn unsupported_format_fails_start() {
    let device = ManualDevice::new(format()).with_supported_formats(vec![StreamFormat::new(
        48000,
        1,
        SampleFormat::F32,
    )]);
    let (mut input, _trigger) = session(device);

    assert!(input.start().is_none());
    assert_eq!(input.error(), InputError::OpenError);
    assert!(!input.is_open());
}

#[test]
fn output_device_cannot_open() {
    let (mut input, _trigger) = session(ManualDevice::new(format()).output());
    assert_eq!(input.error(), InputError::OpenError);
    assert!(!input.open());
    assert!(input.start().is_none());
}

#[test]
fn reset_discards_buffered_data() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let _stream = input.start().unwrap();
    trigger.tick_period();
    assert!(input.bytes_ready() > 0);

    input.reset();
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(input.bytes_ready(), 0);
}

#[test]
fn restart_clears_previous_data() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let _first = input.start().unwrap();
    trigger.tick_period();
    input.stop();
    assert!(input.bytes_ready() > 0);

    let _second = input.start().unwrap();
    assert_eq!(input.bytes_ready(), 0);
    assert_eq!(input.processed_usecs(), 0);
}

#[test]
fn processed_and_elapsed_time() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    assert_eq!(input.elapsed_usecs(), 0);

    let _stream = input.start().unwrap();
    let frames = trigger.period_frames() as u64;
    for _ in 0..3 {
        trigger.tick_period();
    }
    assert_eq!(input.processed_usecs(), 3 * frames * 1_000_000 / 44100);
    assert_eq!(input.elapsed_usecs(), 3 * (frames * 1_000_000 / 44100));

    input.stop();
    assert_eq!(input.elapsed_usecs(), 0);
    assert_eq!(input.processed_usecs(), 3 * frames * 1_000_000 / 44100);
}

#[test]
fn close_releases_the_device() {
    let (mut input, trigger) = session(ManualDevice::new(format()));
    let _stream = input.start().unwrap();
    assert!(trigger.configured_format().is_some());

    input.close();
    assert!(!input.is_open());
    assert_eq!(input.state(), InputState::Stopped);
    assert_eq!(trigger.configured_format(), None);
}
