// Integration test: Transport, tick and voices together
//
// Time is driven by a manual clock; audio goes to the in-memory backend.

use jupiter::fragment::FragmentId;
use jupiter::{
    Canvas, ManualClock, MemoryBackend, RecordingSurface, SampleBuffer, SceneRenderer,
    SequencerConfig, Session,
};
use std::thread;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn setup(backend: &MemoryBackend) -> Session<ManualClock> {
    Session::with_clock(
        SequencerConfig::default(),
        Arc::new(backend.clone()),
        ManualClock::new(),
    )
    .unwrap()
}

/// Every sample holds the whole second it belongs to
fn ramp(seconds: f64, rate: u32) -> Arc<SampleBuffer> {
    let frames = (seconds * rate as f64) as usize;
    let samples = (0..frames).map(|i| (i / rate as usize) as i16).collect();
    Arc::new(SampleBuffer::from_samples(samples, rate, 1).with_name("RAMP"))
}

/// Block until the `index`-th sink has received audio
fn wait_for_output(backend: &MemoryBackend, index: usize) {
    let deadline = Instant::now() + WAIT;
    while backend.written(index).is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn run_until(session: &mut Session<ManualClock>, until: f64, step: f64) -> Vec<FragmentId> {
    let mut triggered = Vec::new();
    loop {
        let report = session.tick();
        triggered.extend(report.triggered);
        match report.elapsed {
            Some(elapsed) if elapsed < until => session.clock().advance_secs(step),
            _ => break,
        }
    }
    triggered
}

#[test]
fn test_fragments_trigger_in_start_order() {
    let backend = MemoryBackend::new();
    let mut session = setup(&backend);
    let late = session.add_buffer(ramp(0.5, 1000));
    let early = session.add_buffer(ramp(0.5, 1000));
    session.move_fragment(late, 3.0).unwrap();
    session.move_fragment(early, 2.0).unwrap();

    session.toggle_play();
    let triggered = run_until(&mut session, 4.0, 0.25);

    let first_early = triggered.iter().position(|&id| id == early).unwrap();
    let first_late = triggered.iter().position(|&id| id == late).unwrap();
    assert!(first_early < first_late);

    session.shutdown();
    assert!(session.wait_for_voices(WAIT));
}

#[test]
fn test_voice_self_exhausts_after_interval() {
    let backend = MemoryBackend::paced(Duration::from_millis(1));
    let mut session = setup(&backend);
    let id = session.add_buffer(ramp(1.0, 1000));

    session.toggle_play();
    session.clock().advance_secs(1.0);
    assert_eq!(session.tick().triggered, vec![id]);
    assert!(session.fragment(id).unwrap().is_playing());

    // Past the end: nothing stops the voice, it runs out by itself
    session.clock().advance_secs(5.0);
    assert!(session.tick().triggered.is_empty());
    assert!(session.fragment(id).unwrap().voice().wait_until_stopped(WAIT));
    assert_eq!(backend.written(0).len(), 1000);
    assert!(session.is_playing());
}

#[test]
fn test_stop_then_restart_from_cursor() {
    let backend = MemoryBackend::paced(Duration::from_millis(2));
    let mut session = setup(&backend);
    let id = session.add_buffer(ramp(10.0, 1000));

    session.toggle_play();
    session.clock().advance_secs(2.0);
    session.tick();
    wait_for_output(&backend, 0);
    session.toggle_play();
    assert!(session.wait_for_voices(WAIT));
    assert!(!session.fragment(id).unwrap().is_playing());

    let cursor_x = session.geometry().time_to_x(6.0);
    session.set_cursor_x(cursor_x);
    session.toggle_play();
    assert_eq!(session.tick().triggered, vec![id]);

    wait_for_output(&backend, 1);
    session.shutdown();
    assert!(session.wait_for_voices(WAIT));

    // First run started one second in, the second one five seconds in
    assert_eq!(backend.written(0).first(), Some(&1));
    assert_eq!(backend.written(1).first(), Some(&5));
    assert_eq!(backend.open_count(), 2);
}

#[test]
fn test_deleting_playing_fragment() {
    let backend = MemoryBackend::paced(Duration::from_millis(2));
    let mut session = setup(&backend);
    let id = session.add_buffer(ramp(10.0, 1000));

    session.toggle_play();
    session.clock().advance_secs(1.5);
    session.tick();
    assert!(session.fragment(id).unwrap().is_playing());

    session.select_all();
    session.delete_selected();
    assert!(session.fragment(id).is_none());
    assert!(session.fragments().is_empty());

    session.clock().advance_secs(1.0);
    assert!(session.tick().triggered.is_empty());
}

#[test]
fn test_realtime_output_plays_each_buffer_once() {
    let backend = MemoryBackend::realtime();
    let mut session = Session::new(SequencerConfig::default(), Arc::new(backend.clone())).unwrap();
    let id = session.add_buffer(ramp(0.3, 8000));
    session.move_fragment(id, 0.0).unwrap();
    let end = session.fragment(id).unwrap().end_time();

    session.toggle_play();
    let deadline = Instant::now() + WAIT;
    loop {
        let elapsed = session.tick().elapsed.unwrap_or_default();
        if (elapsed >= end && session.all_voices_idle()) || Instant::now() >= deadline {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    session.shutdown();
    assert!(session.wait_for_voices(WAIT));

    // The voice keeps pace with the transport, so it is never retriggered
    assert_eq!(backend.open_count(), 1);
    let written = backend.written(0);
    assert!(written.len() <= 2400);
    assert_eq!(written.last(), Some(&0));
}

#[test]
fn test_render_tracks_session_changes() {
    let backend = MemoryBackend::new();
    let mut session = setup(&backend);
    let mut renderer = SceneRenderer::new();
    let mut surface = RecordingSurface::new();
    let canvas = Canvas::new(1024.0, 768.0);

    session.add_buffer(ramp(1.0, 1000));
    renderer.render(&mut session, canvas, &mut surface);
    let first = surface.operation_count();
    assert!(first > 0);

    session.zoom_in();
    renderer.render(&mut session, canvas, &mut surface);
    assert!(surface.operation_count() > first);
}
