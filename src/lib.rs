//! A threaded lifecycle embedder bridging an activity-style host to an
//! application-owned main thread.
//!
//! - The host runtime delivers lifecycle and resource callbacks serially on
//!   its own thread; each maps onto one [`Activity`] entry point.
//! - A detached worker thread runs the user's main function with a blocking
//!   event loop ([`App`]), owning rendering and input consumption.
//! - Resource handoffs (window surface, input queue, saved state) are
//!   acknowledged by the worker before the host callback returns, so hosts
//!   that chain callbacks back-to-back always observe consistent state.
//!
//! The platform itself is abstracted behind [`Host`]; the [`sim`] module
//! provides a deterministic in-process host used by the demo harness and
//! the test suite.

mod app;
mod bridge;
mod command;
mod context;
mod host;
mod looper;
mod pipe;
pub mod sim;

pub use app::{App, AppCmdHandler, InputHandler};
pub use bridge::Activity;
pub use command::{ActivityState, Command};
pub use context::AppContext;
pub use host::{Configuration, Host, InputQueue, Orientation};
pub use looper::{Looper, PollEvent, SourceId, Waker};
pub use pipe::{CommandReader, CommandWriter, command_pipe};

use std::sync::Once;

use env_logger::{Builder, Env};
use log::LevelFilter;

// A process may create and destroy several activities in its lifetime; the
// logger can only be installed for the first one, so keep it behind a Once.
static LOGGER_INIT: Once = Once::new();

/// Install the process-wide logger. Safe to call more than once.
pub fn init_logging() {
    LOGGER_INIT.call_once(|| {
        Builder::from_env(Env::default().default_filter_or("info"))
            .filter(None, LevelFilter::Info)
            .init();
    });
}
