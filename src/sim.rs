//! Deterministic in-process host for demo harnesses and tests.
//!
//! [`SimHost`] plays the platform runtime: its asset source is a JSON
//! configuration blob, its window and input-queue handles are plain
//! reference-counted values with identity equality, and the input queue
//! records every attach, detach and finished event so a harness can assert
//! on the protocol from the outside.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::host::{Configuration, Host, InputQueue};
use crate::looper::Waker;

const DEFAULT_CONFIG_JSON: &str = r#"{
    "language": "en",
    "country": "US",
    "orientation": "portrait",
    "density": 420,
    "sdk_version": 34
}"#;

/// A simulated platform host.
pub struct SimHost {
    assets: Mutex<String>,
}

impl SimHost {
    /// A host whose asset source holds a sensible default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(DEFAULT_CONFIG_JSON)
    }

    /// A host whose asset source holds the given JSON configuration blob.
    pub fn with_config(json: &str) -> Arc<Self> {
        Arc::new(Self {
            assets: Mutex::new(json.to_owned()),
        })
    }

    /// Replace the asset blob, as a platform does before delivering a
    /// configuration-changed callback.
    pub fn set_config_json(&self, json: &str) {
        *self.assets.lock() = json.to_owned();
    }
}

impl Host for SimHost {
    type Window = SimWindow;
    type InputQueue = SimInputQueue;

    fn load_configuration(&self) -> Configuration {
        Configuration::from_json(&self.assets.lock())
    }
}

static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(1);

/// A simulated window surface. Clones share identity, like a native surface
/// handle; equality is identity.
#[derive(Clone, Debug)]
pub struct SimWindow {
    inner: Arc<WindowInner>,
}

#[derive(Debug)]
struct WindowInner {
    id: u32,
    width: u32,
    height: u32,
}

impl SimWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(WindowInner {
                id: NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }
}

impl PartialEq for SimWindow {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SimWindow {}

/// One simulated input event.
#[derive(Debug, Clone, PartialEq)]
pub enum SimInputEvent {
    /// A pointer sample.
    Motion { x: f32, y: f32 },
    /// A key press. `system` keys are consumed by the host before dispatch.
    Key { code: u32, system: bool },
}

/// A simulated input queue. Clones share the same underlying channel;
/// equality is identity.
#[derive(Clone)]
pub struct SimInputQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    events: Mutex<VecDeque<SimInputEvent>>,
    waker: Mutex<Option<Waker>>,
    finished: Mutex<Vec<(SimInputEvent, bool)>>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
}

impl SimInputQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                events: Mutex::new(VecDeque::new()),
                waker: Mutex::new(None),
                finished: Mutex::new(Vec::new()),
                attaches: AtomicUsize::new(0),
                detaches: AtomicUsize::new(0),
            }),
        }
    }

    /// Enqueue an event and notify the attached loop, if any.
    pub fn push_event(&self, event: SimInputEvent) {
        // Held across the wake so a concurrent attach either counts this
        // event in its backlog or is already installed.
        let mut events = self.inner.events.lock();
        events.push_back(event);
        if let Some(waker) = self.inner.waker.lock().as_ref() {
            waker.wake();
        }
    }

    /// Events returned to the host so far, with their handled flags, in
    /// finish order.
    pub fn finished_events(&self) -> Vec<(SimInputEvent, bool)> {
        self.inner.finished.lock().clone()
    }

    /// How many times a loop attached to this queue.
    pub fn attach_count(&self) -> usize {
        self.inner.attaches.load(Ordering::Relaxed)
    }

    /// How many times this queue was detached.
    pub fn detach_count(&self) -> usize {
        self.inner.detaches.load(Ordering::Relaxed)
    }
}

impl InputQueue for SimInputQueue {
    type Event = SimInputEvent;

    fn attach(&self, waker: Waker) {
        self.inner.attaches.fetch_add(1, Ordering::Relaxed);
        // Events queued before attachment still need a notification each.
        let events = self.inner.events.lock();
        for _ in 0..events.len() {
            waker.wake();
        }
        *self.inner.waker.lock() = Some(waker);
    }

    fn detach(&self) {
        self.inner.detaches.fetch_add(1, Ordering::Relaxed);
        *self.inner.waker.lock() = None;
    }

    fn next_event(&self) -> Option<SimInputEvent> {
        self.inner.events.lock().pop_front()
    }

    fn pre_dispatch(&self, event: &SimInputEvent) -> bool {
        matches!(event, SimInputEvent::Key { system: true, .. })
    }

    fn finish_event(&self, event: SimInputEvent, handled: bool) {
        self.inner.finished.lock().push((event, handled));
    }
}

impl PartialEq for SimInputQueue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SimInputQueue {}

impl std::fmt::Debug for SimInputQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimInputQueue")
            .field("inner", &Arc::as_ptr(&self.inner))
            .finish()
    }
}
