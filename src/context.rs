//! The shared-state block bridging the host thread and the application
//! thread.
//!
//! All cross-thread state lives behind one mutex with one condition
//! variable. Resource handoffs follow a single pattern: the host thread sets
//! a pending field, enqueues a command, and waits until the committed field
//! equals the pending one; the application thread commits the pending value
//! while processing the command and broadcasts. The host callback therefore
//! never returns before the application thread has acknowledged, and the
//! application thread only ever observes resource changes between commands,
//! never mid-frame.
//!
//! Every wait is a `while (committed != pending) wait(cond)` loop so spurious
//! wakeups and coalesced broadcasts are tolerated.

use std::sync::Arc;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::command::{ActivityState, Command};
use crate::host::{Host, InputQueue};
use crate::looper::Waker;
use crate::pipe::CommandWriter;

/// The single shared record owned jointly by the host thread and the
/// application thread. Created during the host's create callback; freed when
/// the last handle drops after destruction is acknowledged.
pub struct AppContext<H: Host> {
    host: Arc<H>,
    state: Mutex<SharedState<H>>,
    cond: Condvar,
    commands: CommandWriter,
}

struct SharedState<H: Host> {
    running: bool,
    state_saved: bool,
    destroy_requested: bool,
    destroyed: bool,
    activity_state: Option<ActivityState>,
    window: Option<H::Window>,
    pending_window: Option<H::Window>,
    input_queue: Option<H::InputQueue>,
    pending_input_queue: Option<H::InputQueue>,
    saved_state: Option<Vec<u8>>,
}

impl<H: Host> AppContext<H> {
    pub(crate) fn new(
        host: Arc<H>,
        saved_state: Option<&[u8]>,
        commands: CommandWriter,
    ) -> Self {
        let saved_state = saved_state
            .filter(|bytes| !bytes.is_empty())
            .map(<[u8]>::to_vec);
        Self {
            host,
            state: Mutex::new(SharedState {
                running: false,
                state_saved: false,
                destroy_requested: false,
                destroyed: false,
                activity_state: None,
                window: None,
                pending_window: None,
                input_queue: None,
                pending_input_queue: None,
                saved_state,
            }),
            cond: Condvar::new(),
            commands,
        }
    }

    /// The host handle this context was created for.
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    fn write_command(&self, command: Command) {
        self.commands.write(command.code());
    }

    //-----------------------------------------------------------------------
    // Host-thread protocol: fire-and-forget, state-synchronous and
    // result-synchronous handoffs.
    //-----------------------------------------------------------------------

    /// Enqueue a command without waiting for the application thread.
    pub(crate) fn send_command(&self, command: Command) {
        // Taking the state lock orders the write against any handoff in
        // progress on either thread.
        let _state = self.state.lock();
        self.write_command(command);
    }

    /// Hand a new window surface (or `None`) to the application thread and
    /// block until it has been committed.
    ///
    /// A pending surface is torn down before the replacement is announced,
    /// so the application always observes teardown before setup. Handing
    /// over a surface equal to the current pending one is a no-op apart from
    /// waiting out any handoff still in flight.
    pub(crate) fn set_window(&self, window: Option<H::Window>) {
        let mut state = self.state.lock();
        if state.pending_window != window {
            if state.pending_window.is_some() {
                self.write_command(Command::TermWindow);
            }
            state.pending_window = window.clone();
            if window.is_some() {
                self.write_command(Command::InitWindow);
            }
        }
        while state.window != state.pending_window {
            self.cond.wait(&mut state);
        }
    }

    /// Hand a new input queue (or `None`) to the application thread and
    /// block until it has been committed and attached to the loop.
    pub(crate) fn set_input_queue(&self, queue: Option<H::InputQueue>) {
        let mut state = self.state.lock();
        state.pending_input_queue = queue;
        self.write_command(Command::InputChanged);
        while state.input_queue != state.pending_input_queue {
            self.cond.wait(&mut state);
        }
    }

    /// Announce a lifecycle phase and block until the application thread has
    /// committed it.
    pub(crate) fn set_activity_state(&self, target: ActivityState) {
        let mut state = self.state.lock();
        self.write_command(target.command());
        while state.activity_state != Some(target) {
            self.cond.wait(&mut state);
        }
    }

    /// Ask the application for a saved-state blob and block until the save
    /// command has completed. Ownership of the returned buffer transfers to
    /// the caller; the context keeps nothing.
    pub(crate) fn save_instance_state(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        state.state_saved = false;
        self.write_command(Command::SaveState);
        while !state.state_saved {
            self.cond.wait(&mut state);
        }
        state.saved_state.take()
    }

    /// Enqueue destruction and block until the application thread has torn
    /// down and acknowledged. After this returns no field is ever mutated
    /// again.
    pub(crate) fn request_destroy(&self) {
        let mut state = self.state.lock();
        self.write_command(Command::Destroy);
        while !state.destroyed {
            self.cond.wait(&mut state);
        }
    }

    /// Block until the application thread has started running. Used once,
    /// during creation.
    pub(crate) fn wait_until_running(&self) {
        let mut state = self.state.lock();
        while !state.running {
            self.cond.wait(&mut state);
        }
    }

    //-----------------------------------------------------------------------
    // Application-thread commits. Each runs under the mutex and broadcasts
    // so every host-thread waiter rechecks its condition.
    //-----------------------------------------------------------------------

    pub(crate) fn mark_running(&self) {
        let mut state = self.state.lock();
        state.running = true;
        self.cond.notify_all();
    }

    pub(crate) fn commit_pending_window(&self) {
        let mut state = self.state.lock();
        state.window = state.pending_window.clone();
        self.cond.notify_all();
    }

    /// Pre-teardown broadcast: the window is still committed while the
    /// application releases resources that depend on it.
    pub(crate) fn announce_window_teardown(&self) {
        let _state = self.state.lock();
        self.cond.notify_all();
    }

    pub(crate) fn clear_window(&self) {
        let mut state = self.state.lock();
        state.window = None;
        self.cond.notify_all();
    }

    /// Detach the old committed queue, commit the pending one and attach it
    /// to the loop through `waker`. Returns the newly committed queue so the
    /// application thread can keep its own copy for draining.
    pub(crate) fn commit_pending_input_queue(&self, waker: Waker) -> Option<H::InputQueue> {
        let mut state = self.state.lock();
        if let Some(old) = state.input_queue.take() {
            old.detach();
        }
        state.input_queue = state.pending_input_queue.clone();
        if let Some(queue) = &state.input_queue {
            debug!("[AppContext] attaching input queue to the loop");
            queue.attach(waker);
        }
        self.cond.notify_all();
        state.input_queue.clone()
    }

    pub(crate) fn commit_activity_state(&self, target: ActivityState) {
        let mut state = self.state.lock();
        debug!("[AppContext] activity state {target:?}");
        state.activity_state = Some(target);
        self.cond.notify_all();
    }

    pub(crate) fn set_destroy_requested(&self) {
        self.state.lock().destroy_requested = true;
    }

    pub(crate) fn free_saved_state(&self) {
        self.state.lock().saved_state = None;
    }

    pub(crate) fn mark_state_saved(&self) {
        let mut state = self.state.lock();
        state.state_saved = true;
        self.cond.notify_all();
    }

    /// Final application-thread teardown: release the saved state, detach
    /// any committed input queue and acknowledge destruction. The context
    /// must not be mutated after this.
    pub(crate) fn finish_destroy(&self) {
        let mut state = self.state.lock();
        state.saved_state = None;
        if let Some(queue) = state.input_queue.take() {
            queue.detach();
        }
        state.destroyed = true;
        self.cond.notify_all();
    }

    //-----------------------------------------------------------------------
    // Committed-state accessors, readable from either thread.
    //-----------------------------------------------------------------------

    /// The committed window surface, if any.
    pub fn window(&self) -> Option<H::Window> {
        self.state.lock().window.clone()
    }

    /// The committed input queue, if any.
    pub fn input_queue(&self) -> Option<H::InputQueue> {
        self.state.lock().input_queue.clone()
    }

    /// The last committed lifecycle phase.
    pub fn activity_state(&self) -> Option<ActivityState> {
        self.state.lock().activity_state
    }

    /// Whether destruction has been requested; the application loop must
    /// exit once this reads true.
    pub fn destroy_requested(&self) -> bool {
        self.state.lock().destroy_requested
    }

    /// A copy of the saved-state blob, if one is currently held.
    pub fn saved_state(&self) -> Option<Vec<u8>> {
        self.state.lock().saved_state.clone()
    }

    /// Store a saved-state blob for the host to collect. An empty buffer
    /// clears the slot; a held blob is never empty.
    pub fn store_saved_state(&self, bytes: Vec<u8>) {
        let mut state = self.state.lock();
        state.saved_state = if bytes.is_empty() { None } else { Some(bytes) };
    }
}
