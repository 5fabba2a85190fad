//! Scripted demo harness.
//!
//! Plays the host role against the simulated platform: creates an activity,
//! walks it through start/resume, hands over a window and an input queue,
//! feeds touch input, collects a saved-state blob, tears everything down and
//! finally performs a warm restart from the blob.
//!
//! Run with `RUST_LOG=debug` to watch the command traffic.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{error, info, warn};
use native_activity_embedder::sim::{SimHost, SimInputEvent, SimInputQueue, SimWindow};
use native_activity_embedder::{Activity, App, Command};

/// The state the demo app carries across restarts: last touch position and
/// how many frames it has presented.
struct Engine {
    frame: u64,
    last_x: f32,
    last_y: f32,
    animating: bool,
    has_surface: bool,
}

impl Engine {
    fn restore(blob: Option<Vec<u8>>) -> Self {
        let mut engine = Engine {
            frame: 0,
            last_x: 0.0,
            last_y: 0.0,
            animating: false,
            has_surface: false,
        };
        if let Some(bytes) = blob {
            let mut cursor = Cursor::new(bytes);
            match (
                cursor.read_u64::<LittleEndian>(),
                cursor.read_f32::<LittleEndian>(),
                cursor.read_f32::<LittleEndian>(),
            ) {
                (Ok(frame), Ok(x), Ok(y)) => {
                    info!("[Demo] restored state: frame {frame}, touch ({x}, {y})");
                    engine.frame = frame;
                    engine.last_x = x;
                    engine.last_y = y;
                }
                _ => warn!("[Demo] discarding malformed saved state"),
            }
        }
        engine
    }

    fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.write_u64::<LittleEndian>(self.frame).expect("vec write");
        out.write_f32::<LittleEndian>(self.last_x).expect("vec write");
        out.write_f32::<LittleEndian>(self.last_y).expect("vec write");
        out
    }
}

fn engine_mut(app: &mut App<SimHost>) -> Option<&mut Engine> {
    app.user_data.as_mut()?.downcast_mut::<Engine>()
}

fn engine_is_animating(app: &App<SimHost>) -> bool {
    app.user_data
        .as_ref()
        .and_then(|data| data.downcast_ref::<Engine>())
        .map(|engine| engine.animating && engine.has_surface)
        .unwrap_or(false)
}

/// The application main: restore, install hooks, run the blocking loop
/// until the host asks for destruction.
fn demo_main(mut app: App<SimHost>) {
    let engine = Engine::restore(app.saved_state());
    info!(
        "[Demo] up with config {:?}, starting at frame {}",
        app.config(),
        engine.frame
    );
    app.user_data = Some(Box::new(engine));

    app.on_app_cmd = Some(Box::new(|app, command| {
        match command {
            Command::InitWindow => {
                let size = app.window().map(|w| (w.width(), w.height()));
                if let Some(engine) = engine_mut(app) {
                    engine.has_surface = size.is_some();
                }
                if let Some((width, height)) = size {
                    info!("[Demo] surface ready: {width}x{height}");
                }
            }
            Command::TermWindow => {
                if let Some(engine) = engine_mut(app) {
                    engine.has_surface = false;
                }
                info!("[Demo] surface released");
            }
            Command::GainedFocus => {
                if let Some(engine) = engine_mut(app) {
                    engine.animating = true;
                }
            }
            Command::LostFocus => {
                if let Some(engine) = engine_mut(app) {
                    engine.animating = false;
                }
            }
            Command::SaveState => {
                let blob = engine_mut(app).map(|engine| engine.snapshot());
                if let Some(blob) = blob {
                    app.store_saved_state(blob);
                }
            }
            Command::ConfigChanged => {
                info!("[Demo] now configured as {:?}", app.config());
            }
            Command::LowMemory => {
                info!("[Demo] dropping caches");
            }
            Command::Destroy => {
                info!("[Demo] shutting down");
            }
            _ => {}
        }
    }));

    app.on_input_event = Some(Box::new(|app, event| match event {
        SimInputEvent::Motion { x, y } => {
            let (x, y) = (*x, *y);
            if let Some(engine) = engine_mut(app) {
                engine.last_x = x;
                engine.last_y = y;
            }
            true
        }
        SimInputEvent::Key { .. } => false,
    }));

    loop {
        let animating = engine_is_animating(&app);
        // Animating: drain pending work and keep drawing. Idle: sleep in
        // the loop until the host sends something.
        let timeout = if animating { Some(Duration::ZERO) } else { None };
        let event = app.poll(timeout);
        app.dispatch(event);

        if app.destroy_requested() {
            let frames = engine_mut(&mut app).map(|e| e.frame).unwrap_or(0);
            info!("[Demo] loop exited after {frames} frames");
            return;
        }

        if animating {
            if let Some(engine) = engine_mut(&mut app) {
                engine.frame += 1;
                if engine.frame % 10 == 0 {
                    info!(
                        "[Demo] frame {} around touch ({}, {})",
                        engine.frame, engine.last_x, engine.last_y
                    );
                }
            }
            // Stand-in for the present/vsync interval.
            thread::sleep(Duration::from_millis(16));
        }
    }
}

fn main() {
    native_activity_embedder::init_logging();

    let host = SimHost::new();
    info!("[Harness] creating activity");
    let activity = Activity::create(host.clone(), None, demo_main).unwrap_or_else(|err| {
        error!("[Harness] failed to start application thread: {err:?}");
        std::process::exit(1);
    });

    activity.on_start();
    activity.on_resume();

    let window = SimWindow::new(1080, 1920);
    activity.on_window_created(window.clone());

    let queue = SimInputQueue::new();
    activity.on_input_queue_created(queue.clone());

    activity.on_window_focus_changed(true);

    for step in 0..5 {
        queue.push_event(SimInputEvent::Motion {
            x: 100.0 + step as f32 * 24.0,
            y: 480.0,
        });
        thread::sleep(Duration::from_millis(40));
    }
    // A system key: consumed by the host before the app sees it.
    queue.push_event(SimInputEvent::Key {
        code: 4,
        system: true,
    });

    host.set_config_json(
        r#"{"language": "en", "country": "US", "orientation": "landscape", "density": 420, "sdk_version": 34}"#,
    );
    activity.on_configuration_changed();
    activity.on_low_memory();

    let saved = activity.on_save_instance_state();
    info!(
        "[Harness] collected saved state: {} bytes",
        saved.as_ref().map(Vec::len).unwrap_or(0)
    );

    activity.on_window_focus_changed(false);
    activity.on_pause();
    activity.on_stop();
    activity.on_input_queue_destroyed();
    activity.on_window_destroyed();
    activity.on_destroy();
    info!(
        "[Harness] activity destroyed; host finished {} input events",
        queue.finished_events().len()
    );

    if let Some(blob) = saved {
        info!("[Harness] warm restart from {} bytes", blob.len());
        let activity = Activity::create(host, Some(&blob), demo_main).unwrap_or_else(|err| {
            error!("[Harness] failed to restart application thread: {err:?}");
            std::process::exit(1);
        });
        activity.on_start();
        activity.on_resume();
        activity.on_destroy();
        info!("[Harness] warm activity destroyed");
    }
}
