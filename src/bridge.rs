//! Host-thread entry points.
//!
//! [`Activity`] is the value the host keeps in its per-activity instance
//! slot. Each lifecycle callback the host delivers maps onto one method
//! here, and each method follows one of three patterns:
//!
//! - **Fire-and-forget**: enqueue a command and return
//!   (configuration-changed, low-memory, focus changes).
//! - **State-synchronous**: enqueue and block until the application thread
//!   has committed the matching field (window, input queue, lifecycle
//!   phase).
//! - **Result-synchronous**: enqueue, block until the save completes, and
//!   take ownership of whatever blob the application stored
//!   (save-instance-state).
//!
//! The host runtime invokes these serially on its own thread; none of them
//! are re-entrant.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use log::debug;

use crate::app::{App, app_entry};
use crate::command::{ActivityState, Command};
use crate::context::AppContext;
use crate::host::Host;
use crate::pipe::command_pipe;

/// The host-thread handle to one embedded application.
pub struct Activity<H: Host> {
    ctx: Arc<AppContext<H>>,
}

impl<H: Host> Activity<H> {
    /// Create the application context and start the application thread.
    ///
    /// 1. Build the command pipe and the shared context, copying any
    ///    saved-state blob the host restored.
    /// 2. Spawn the detached worker that will run `main`.
    /// 3. Block until the worker signals `running`, so every later callback
    ///    finds a live loop on the other end of the pipe.
    ///
    /// Failure to start the worker is fatal: no context is returned.
    pub fn create<F>(host: Arc<H>, saved_state: Option<&[u8]>, main: F) -> Result<Self>
    where
        F: FnOnce(App<H>) + Send + 'static,
    {
        let (writer, reader) = command_pipe();
        let ctx = Arc::new(AppContext::new(host, saved_state, writer));

        let thread_ctx = ctx.clone();
        // Detached on purpose: the worker outlives this call and is joined
        // logically, not by handle, through the destroy handshake.
        thread::Builder::new()
            .name("app-main".into())
            .spawn(move || app_entry(thread_ctx, reader, main))
            .context("spawning the application thread")?;

        ctx.wait_until_running();
        debug!("[Bridge] application thread running");
        Ok(Self { ctx })
    }

    /// The shared context, for hosts that want to observe committed state.
    pub fn context(&self) -> &Arc<AppContext<H>> {
        &self.ctx
    }

    //-----------------------------------------------------------------------
    // Lifecycle phases (state-synchronous).
    //-----------------------------------------------------------------------

    pub fn on_start(&self) {
        debug!("[Bridge] start");
        self.ctx.set_activity_state(ActivityState::Start);
    }

    pub fn on_resume(&self) {
        debug!("[Bridge] resume");
        self.ctx.set_activity_state(ActivityState::Resume);
    }

    pub fn on_pause(&self) {
        debug!("[Bridge] pause");
        self.ctx.set_activity_state(ActivityState::Pause);
    }

    pub fn on_stop(&self) {
        debug!("[Bridge] stop");
        self.ctx.set_activity_state(ActivityState::Stop);
    }

    //-----------------------------------------------------------------------
    // Resource handoffs (state-synchronous).
    //-----------------------------------------------------------------------

    /// The host created a window surface for this activity.
    pub fn on_window_created(&self, window: H::Window) {
        debug!("[Bridge] window created");
        self.ctx.set_window(Some(window));
    }

    /// The host is about to destroy the current window surface. When this
    /// returns the application no longer holds the handle.
    pub fn on_window_destroyed(&self) {
        debug!("[Bridge] window destroyed");
        self.ctx.set_window(None);
    }

    /// The host created the input queue for this activity.
    pub fn on_input_queue_created(&self, queue: H::InputQueue) {
        debug!("[Bridge] input queue created");
        self.ctx.set_input_queue(Some(queue));
    }

    /// The host is destroying the input queue. When this returns the queue
    /// is detached from the application loop.
    pub fn on_input_queue_destroyed(&self) {
        debug!("[Bridge] input queue destroyed");
        self.ctx.set_input_queue(None);
    }

    //-----------------------------------------------------------------------
    // Result-synchronous.
    //-----------------------------------------------------------------------

    /// Ask the application for a saved-state blob. Ownership of the returned
    /// buffer transfers to the host.
    pub fn on_save_instance_state(&self) -> Option<Vec<u8>> {
        debug!("[Bridge] save instance state");
        self.ctx.save_instance_state()
    }

    //-----------------------------------------------------------------------
    // Fire-and-forget.
    //-----------------------------------------------------------------------

    pub fn on_configuration_changed(&self) {
        debug!("[Bridge] configuration changed");
        self.ctx.send_command(Command::ConfigChanged);
    }

    pub fn on_low_memory(&self) {
        debug!("[Bridge] low memory");
        self.ctx.send_command(Command::LowMemory);
    }

    pub fn on_window_focus_changed(&self, focused: bool) {
        debug!("[Bridge] focus changed: {focused}");
        self.ctx.send_command(if focused {
            Command::GainedFocus
        } else {
            Command::LostFocus
        });
    }

    //-----------------------------------------------------------------------
    // Teardown.
    //-----------------------------------------------------------------------

    /// The host is destroying the activity. Blocks until the application
    /// thread has exited its loop and acknowledged; afterwards the pipe
    /// endpoints are closed and the context is released with the last
    /// handle.
    pub fn on_destroy(self) {
        debug!("[Bridge] destroy");
        self.ctx.request_destroy();
    }
}
