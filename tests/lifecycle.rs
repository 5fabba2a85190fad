//! End-to-end lifecycle scenarios against the simulated host: cold and warm
//! starts, window and input-queue handoffs, save/restore ownership transfer,
//! command ordering and graceful shutdown.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use native_activity_embedder::sim::{SimHost, SimInputEvent, SimInputQueue, SimWindow};
use native_activity_embedder::{Activity, ActivityState, App, Command};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Standard app-thread loop: block, dispatch, exit once destruction is
/// requested.
fn run_until_destroyed(app: &mut App<SimHost>) {
    loop {
        let event = app.poll(None);
        app.dispatch(event);
        if app.destroy_requested() {
            return;
        }
    }
}

/// An app main that records every command its hook receives.
fn recording_main(
    commands: Arc<Mutex<Vec<Command>>>,
) -> impl FnOnce(App<SimHost>) + Send + 'static {
    move |mut app: App<SimHost>| {
        app.on_app_cmd = Some(Box::new(move |_app, command| {
            commands.lock().push(command);
        }));
        run_until_destroyed(&mut app);
    }
}

/// Spin until `predicate` holds or the deadline passes.
fn wait_for(mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn cold_start_loads_configuration_without_saved_state() {
    let host = SimHost::new();
    let (tx, rx) = mpsc::channel();
    let activity = Activity::create(host, None, move |mut app| {
        tx.send((app.config().clone(), app.saved_state())).unwrap();
        run_until_destroyed(&mut app);
    })
    .unwrap();

    let (config, saved) = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(config.language, "en");
    assert_eq!(config.sdk_version, 34);
    assert!(saved.is_none());

    activity.on_destroy();
}

#[test]
fn warm_start_observes_restored_bytes_before_the_loop() {
    let host = SimHost::new();
    let (tx, rx) = mpsc::channel();
    let activity = Activity::create(host, Some(&[0x01, 0x02, 0x03]), move |mut app| {
        tx.send(app.saved_state()).unwrap();
        run_until_destroyed(&mut app);
    })
    .unwrap();

    assert_eq!(
        rx.recv_timeout(RECV_TIMEOUT).unwrap(),
        Some(vec![0x01, 0x02, 0x03])
    );

    activity.on_destroy();
}

#[test]
fn empty_saved_state_is_treated_as_absent() {
    let host = SimHost::new();
    let (tx, rx) = mpsc::channel();
    let activity = Activity::create(host, Some(&[]), move |mut app| {
        tx.send(app.saved_state()).unwrap();
        run_until_destroyed(&mut app);
    })
    .unwrap();

    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), None);
    activity.on_destroy();
}

#[test]
fn window_lifecycle_commits_and_clears_the_surface() {
    let commands = Arc::new(Mutex::new(Vec::new()));
    let activity =
        Activity::create(SimHost::new(), None, recording_main(commands.clone())).unwrap();

    let window = SimWindow::new(640, 480);
    activity.on_window_created(window.clone());
    assert_eq!(activity.context().window(), Some(window.clone()));

    activity.on_window_destroyed();
    assert_eq!(activity.context().window(), None);

    activity.on_destroy();

    let seen = commands.lock().clone();
    assert_eq!(
        seen.iter().filter(|c| **c == Command::InitWindow).count(),
        1
    );
    assert_eq!(
        seen.iter().filter(|c| **c == Command::TermWindow).count(),
        1
    );
}

#[test]
fn repeated_window_handoff_with_equal_surface_is_idempotent() {
    let commands = Arc::new(Mutex::new(Vec::new()));
    let activity =
        Activity::create(SimHost::new(), None, recording_main(commands.clone())).unwrap();

    let window = SimWindow::new(320, 240);
    activity.on_window_created(window.clone());
    activity.on_window_created(window.clone());
    assert_eq!(activity.context().window(), Some(window));

    activity.on_destroy();

    let seen = commands.lock().clone();
    assert_eq!(
        seen.iter().filter(|c| **c == Command::InitWindow).count(),
        1
    );
    assert_eq!(
        seen.iter().filter(|c| **c == Command::TermWindow).count(),
        0
    );
}

#[test]
fn window_replacement_serializes_teardown_before_setup() {
    let commands = Arc::new(Mutex::new(Vec::new()));
    let activity =
        Activity::create(SimHost::new(), None, recording_main(commands.clone())).unwrap();

    let first = SimWindow::new(640, 480);
    let second = SimWindow::new(1280, 720);
    activity.on_window_created(first);
    activity.on_window_created(second.clone());
    assert_eq!(activity.context().window(), Some(second));

    activity.on_destroy();

    let window_commands: Vec<Command> = commands
        .lock()
        .iter()
        .copied()
        .filter(|c| matches!(c, Command::InitWindow | Command::TermWindow))
        .collect();
    assert_eq!(
        window_commands,
        vec![Command::InitWindow, Command::TermWindow, Command::InitWindow]
    );
}

#[test]
fn lifecycle_phases_are_committed_before_the_callback_returns() {
    let activity = Activity::create(SimHost::new(), None, |mut app| {
        run_until_destroyed(&mut app);
    })
    .unwrap();

    activity.on_start();
    assert_eq!(
        activity.context().activity_state(),
        Some(ActivityState::Start)
    );
    activity.on_resume();
    assert_eq!(
        activity.context().activity_state(),
        Some(ActivityState::Resume)
    );
    activity.on_pause();
    assert_eq!(
        activity.context().activity_state(),
        Some(ActivityState::Pause)
    );
    activity.on_stop();
    assert_eq!(
        activity.context().activity_state(),
        Some(ActivityState::Stop)
    );

    activity.on_destroy();
}

#[test]
fn save_transfers_blob_ownership_and_resume_clears_it() {
    let activity = Activity::create(SimHost::new(), None, |mut app| {
        app.on_app_cmd = Some(Box::new(|app, command| {
            if command == Command::SaveState {
                app.store_saved_state(vec![10, 20, 30, 40, 50]);
            }
        }));
        run_until_destroyed(&mut app);
    })
    .unwrap();

    let blob = activity.on_save_instance_state();
    assert_eq!(blob, Some(vec![10, 20, 30, 40, 50]));
    // Ownership moved to the host; the context keeps nothing.
    assert_eq!(activity.context().saved_state(), None);

    activity.on_resume();
    assert_eq!(activity.context().saved_state(), None);

    activity.on_destroy();
}

#[test]
fn save_without_a_stored_blob_returns_none() {
    let activity = Activity::create(SimHost::new(), None, |mut app| {
        run_until_destroyed(&mut app);
    })
    .unwrap();

    assert_eq!(activity.on_save_instance_state(), None);
    activity.on_destroy();
}

#[test]
fn graceful_shutdown_is_acknowledged() {
    let (tx, rx) = mpsc::channel();
    let activity = Activity::create(SimHost::new(), None, move |mut app| {
        run_until_destroyed(&mut app);
        tx.send(app.destroy_requested()).unwrap();
    })
    .unwrap();

    activity.on_destroy();
    // on_destroy only returns after the app thread exited its loop, so the
    // exit marker must already be queued.
    assert_eq!(rx.try_recv().unwrap(), true);
}

#[test]
fn focus_toggle_delivers_both_commands_in_order() {
    let commands = Arc::new(Mutex::new(Vec::new()));
    let activity =
        Activity::create(SimHost::new(), None, recording_main(commands.clone())).unwrap();

    activity.on_window_focus_changed(true);
    activity.on_window_focus_changed(false);
    activity.on_destroy();

    let focus: Vec<Command> = commands
        .lock()
        .iter()
        .copied()
        .filter(|c| matches!(c, Command::GainedFocus | Command::LostFocus))
        .collect();
    assert_eq!(focus, vec![Command::GainedFocus, Command::LostFocus]);
}

#[test]
fn commands_are_received_in_write_order() {
    let commands = Arc::new(Mutex::new(Vec::new()));
    let activity =
        Activity::create(SimHost::new(), None, recording_main(commands.clone())).unwrap();

    activity.on_configuration_changed();
    activity.on_low_memory();
    activity.on_window_focus_changed(true);
    activity.on_window_focus_changed(false);
    activity.on_low_memory();
    activity.on_destroy();

    assert_eq!(
        commands.lock().clone(),
        vec![
            Command::ConfigChanged,
            Command::LowMemory,
            Command::GainedFocus,
            Command::LostFocus,
            Command::LowMemory,
            Command::Destroy,
        ]
    );
}

#[test]
fn input_queue_handoff_attaches_and_detaches_exactly_once() {
    let activity = Activity::create(SimHost::new(), None, |mut app| {
        run_until_destroyed(&mut app);
    })
    .unwrap();

    let queue = SimInputQueue::new();
    activity.on_input_queue_created(queue.clone());
    assert_eq!(queue.attach_count(), 1);
    assert_eq!(activity.context().input_queue(), Some(queue.clone()));

    activity.on_input_queue_destroyed();
    assert_eq!(queue.detach_count(), 1);
    assert_eq!(activity.context().input_queue(), None);

    activity.on_destroy();
    assert_eq!(queue.attach_count(), 1);
    assert_eq!(queue.detach_count(), 1);
}

#[test]
fn input_events_are_dispatched_filtered_and_finished() {
    let activity = Activity::create(SimHost::new(), None, |mut app| {
        app.on_input_event = Some(Box::new(|_app, event| {
            matches!(event, SimInputEvent::Motion { .. })
        }));
        run_until_destroyed(&mut app);
    })
    .unwrap();

    let queue = SimInputQueue::new();
    activity.on_input_queue_created(queue.clone());

    queue.push_event(SimInputEvent::Motion { x: 5.0, y: 6.0 });
    queue.push_event(SimInputEvent::Key {
        code: 29,
        system: false,
    });
    // Consumed by the host's pre-dispatch filter; never finished.
    queue.push_event(SimInputEvent::Key {
        code: 4,
        system: true,
    });

    assert!(wait_for(|| queue.finished_events().len() == 2));
    assert_eq!(
        queue.finished_events(),
        vec![
            (SimInputEvent::Motion { x: 5.0, y: 6.0 }, true),
            (
                SimInputEvent::Key {
                    code: 29,
                    system: false
                },
                false
            ),
        ]
    );

    activity.on_destroy();
    assert_eq!(queue.finished_events().len(), 2);
}

#[test]
fn configuration_change_is_reloaded_from_the_asset_source() {
    let host = SimHost::new();
    let (tx, rx) = mpsc::channel();
    let activity = Activity::create(host.clone(), None, move |mut app| {
        let tx = tx.clone();
        app.on_app_cmd = Some(Box::new(move |app, command| {
            if command == Command::ConfigChanged {
                tx.send(app.config().clone()).unwrap();
            }
        }));
        run_until_destroyed(&mut app);
    })
    .unwrap();

    host.set_config_json(r#"{"language": "de", "country": "DE", "sdk_version": 34}"#);
    activity.on_configuration_changed();

    let config = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(config.language, "de");
    assert_eq!(config.country, "DE");

    activity.on_destroy();
}
