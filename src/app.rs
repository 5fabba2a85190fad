//! The application-thread side of the embedder.
//!
//! [`App`] is the handle the user's main function receives. It owns the
//! event loop, the command pipe's read end, the reloaded configuration and
//! the two optional callback slots; everything else it reads through the
//! shared [`AppContext`].
//!
//! Command processing is split around the user hook: glue the user may
//! *query* during the hook (is there still a window?) is applied before the
//! hook runs, glue that reflects the hook's *completion* (the saved-state
//! blob exists now) is applied after.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};

use crate::command::Command;
use crate::context::AppContext;
use crate::host::{Configuration, Host, InputQueue};
use crate::looper::{Looper, PollEvent, SourceId};
use crate::pipe::CommandReader;

/// Callback invoked once per received command, between the pre- and
/// post-handlers.
pub type AppCmdHandler<H> = Box<dyn FnMut(&mut App<H>, Command)>;

/// Callback invoked for each input event that the host does not consume
/// itself. Returns whether the event was handled.
pub type InputHandler<H> =
    Box<dyn FnMut(&mut App<H>, &<<H as Host>::InputQueue as InputQueue>::Event) -> bool>;

/// Per-application state owned by the application thread.
pub struct App<H: Host> {
    ctx: Arc<AppContext<H>>,
    looper: Looper,
    commands: CommandReader,
    config: Configuration,
    input_queue: Option<H::InputQueue>,
    /// Command hook, set by the user before entering the loop.
    pub on_app_cmd: Option<AppCmdHandler<H>>,
    /// Input hook, set by the user before entering the loop.
    pub on_input_event: Option<InputHandler<H>>,
    /// Opaque per-application slot for the user's own state.
    pub user_data: Option<Box<dyn Any>>,
}

impl<H: Host> App<H> {
    /// The shared context backing this application.
    pub fn context(&self) -> &Arc<AppContext<H>> {
        &self.ctx
    }

    /// The host this application runs under.
    pub fn host(&self) -> &Arc<H> {
        self.ctx.host()
    }

    /// The configuration last loaded from the host's asset source.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The committed window surface, if any.
    pub fn window(&self) -> Option<H::Window> {
        self.ctx.window()
    }

    /// The committed input queue, if any.
    pub fn input_queue(&self) -> Option<H::InputQueue> {
        self.input_queue.clone()
    }

    /// The last committed lifecycle phase.
    pub fn activity_state(&self) -> Option<crate::command::ActivityState> {
        self.ctx.activity_state()
    }

    /// The saved-state blob handed over at creation or stored since.
    pub fn saved_state(&self) -> Option<Vec<u8>> {
        self.ctx.saved_state()
    }

    /// Store a saved-state blob; meant to be called from the command hook
    /// while a save is being processed.
    pub fn store_saved_state(&self, bytes: Vec<u8>) {
        self.ctx.store_saved_state(bytes);
    }

    /// Whether the host has requested destruction. The loop must exit once
    /// this reads true.
    pub fn destroy_requested(&self) -> bool {
        self.ctx.destroy_requested()
    }

    /// Block on the event loop until a source is ready or the timeout
    /// elapses. `None` waits indefinitely, `Some(Duration::ZERO)` makes an
    /// animating loop spin through pending work without blocking.
    pub fn poll(&self, timeout: Option<Duration>) -> PollEvent {
        self.looper.poll(timeout)
    }

    /// Run the processor for one poll outcome.
    pub fn dispatch(&mut self, event: PollEvent) {
        match event {
            PollEvent::Source(SourceId::Commands) => self.process_commands(),
            PollEvent::Source(SourceId::Input) => self.process_input(),
            PollEvent::Timeout => {}
        }
    }

    /// Read one command code from the pipe, apply the pre-handler, invoke
    /// the user's command hook and apply the post-handler.
    pub fn process_commands(&mut self) {
        if let Some(command) = self.read_command() {
            self.pre_handle(command);
            self.dispatch_app_cmd(command);
            self.post_handle(command);
        }
    }

    /// Drain the committed input queue, honoring the host's pre-dispatch
    /// filter and finishing every delivered event with its handled flag.
    pub fn process_input(&mut self) {
        let Some(queue) = self.input_queue.clone() else {
            return;
        };
        while let Some(event) = queue.next_event() {
            if queue.pre_dispatch(&event) {
                continue;
            }
            let handled = self.dispatch_input_event(&event);
            queue.finish_event(event, handled);
        }
    }

    fn read_command(&mut self) -> Option<Command> {
        match self.commands.read() {
            Some(code) => match Command::from_code(code) {
                Some(command) => Some(command),
                None => {
                    error!("[AppThread] unknown command code {code} on pipe");
                    None
                }
            },
            None => {
                error!("[AppThread] no data on command pipe");
                None
            }
        }
    }

    fn pre_handle(&mut self, command: Command) {
        match command {
            Command::InputChanged => {
                debug!("[AppThread] input queue changing");
                self.input_queue = self
                    .ctx
                    .commit_pending_input_queue(self.looper.waker(SourceId::Input));
            }
            Command::InitWindow => {
                debug!("[AppThread] window ready");
                self.ctx.commit_pending_window();
            }
            Command::TermWindow => {
                debug!("[AppThread] window going away");
                self.ctx.announce_window_teardown();
            }
            Command::Start | Command::Resume | Command::Pause | Command::Stop => {
                if let Some(state) = command.activity_state() {
                    self.ctx.commit_activity_state(state);
                }
            }
            Command::ConfigChanged => {
                self.config = self.ctx.host().load_configuration();
                debug!("[AppThread] configuration reloaded: {:?}", self.config);
            }
            Command::SaveState => {
                self.ctx.free_saved_state();
            }
            Command::Destroy => {
                debug!("[AppThread] destroy requested");
                self.ctx.set_destroy_requested();
            }
            Command::GainedFocus | Command::LostFocus | Command::LowMemory => {}
        }
    }

    fn post_handle(&mut self, command: Command) {
        match command {
            Command::TermWindow => self.ctx.clear_window(),
            Command::SaveState => self.ctx.mark_state_saved(),
            // A resumed activity never re-reads the blob it restored from.
            Command::Resume => self.ctx.free_saved_state(),
            _ => {}
        }
    }

    fn dispatch_app_cmd(&mut self, command: Command) {
        if let Some(mut handler) = self.on_app_cmd.take() {
            handler(self, command);
            // The hook may have replaced itself; only restore if it did not.
            if self.on_app_cmd.is_none() {
                self.on_app_cmd = Some(handler);
            }
        }
    }

    fn dispatch_input_event(
        &mut self,
        event: &<<H as Host>::InputQueue as InputQueue>::Event,
    ) -> bool {
        let mut handled = false;
        if let Some(mut handler) = self.on_input_event.take() {
            handled = handler(self, event);
            if self.on_input_event.is_none() {
                self.on_input_event = Some(handler);
            }
        }
        handled
    }
}

/// Body of the detached application thread.
///
/// 1. Load the configuration from the host's asset source.
/// 2. Register the command pipe with a fresh event loop.
/// 3. Signal `running` so the create callback can return.
/// 4. Hand control to the user's main.
/// 5. On return, tear the context down and acknowledge destruction.
pub(crate) fn app_entry<H, F>(ctx: Arc<AppContext<H>>, commands: CommandReader, main: F)
where
    H: Host,
    F: FnOnce(App<H>),
{
    let config = ctx.host().load_configuration();
    debug!("[AppThread] configuration loaded: {config:?}");

    let looper = Looper::new();
    commands.register(looper.waker(SourceId::Commands));

    ctx.mark_running();

    let app = App {
        ctx: ctx.clone(),
        looper,
        commands,
        config,
        input_queue: None,
        on_app_cmd: None,
        on_input_event: None,
        user_data: None,
    };
    main(app);

    debug!("[AppThread] main returned, tearing down");
    ctx.finish_destroy();
}
