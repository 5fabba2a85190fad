//! Contracts between the embedder and the platform host.
//!
//! The host owns the opaque platform resources: the window surface, the input
//! queue, and the asset source that configuration is loaded from. The
//! embedder only shuttles references to them between threads; it never copies
//! or reference-counts the underlying platform objects. In particular a
//! window handle handed to the embedder must stay valid until the matching
//! teardown callback has returned; destroying the surface earlier leaves the
//! application thread holding a dangling handle.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::looper::Waker;

/// A platform host as seen by the embedder.
///
/// Implementations provide the concrete resource handle types and the asset
/// source configuration is read from. Handles are cheap values: cloning one
/// clones a reference, and equality is handle identity.
pub trait Host: Send + Sync + 'static {
    /// Window surface handle delivered by the host.
    type Window: Clone + PartialEq + Send + 'static;
    /// Input channel handle delivered by the host.
    type InputQueue: InputQueue + Clone + PartialEq + Send + 'static;

    /// Read the current configuration from the host's asset source.
    ///
    /// Called once when the application thread starts and again on every
    /// configuration-changed notification.
    fn load_configuration(&self) -> Configuration;
}

/// An input channel the application thread drains from its event loop.
pub trait InputQueue {
    type Event;

    /// Start reporting readiness through `waker`. At most one loop is
    /// attached at a time; attaching replaces any previous attachment.
    fn attach(&self, waker: Waker);

    /// Stop reporting readiness.
    fn detach(&self);

    /// Take the next pending event, or `None` when drained.
    fn next_event(&self) -> Option<Self::Event>;

    /// Whether the host consumes this event itself (for example system back
    /// keys routed to an input method). Such events are not dispatched and
    /// not finished by the application.
    fn pre_dispatch(&self, event: &Self::Event) -> bool;

    /// Return the event to the host with its handled flag.
    fn finish_event(&self, event: Self::Event, handled: bool);
}

/// Host configuration snapshot, as loaded from the asset source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub mcc: u32,
    pub mnc: u32,
    pub language: String,
    pub country: String,
    pub orientation: Orientation,
    pub density: u32,
    pub sdk_version: u32,
    pub screen_long: bool,
    pub night_mode: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            mcc: 0,
            mnc: 0,
            language: String::new(),
            country: String::new(),
            orientation: Orientation::Unknown,
            density: 0,
            sdk_version: 0,
            screen_long: false,
            night_mode: false,
        }
    }
}

impl Configuration {
    /// Parse a JSON configuration blob, falling back to the defaults (with a
    /// warning) when the blob is malformed.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(err) => {
                warn!("[Config] malformed configuration asset: {err}");
                Self::default()
            }
        }
    }
}

/// Screen orientation reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Unknown,
    Portrait,
    Landscape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_parses_partial_json() {
        let config = Configuration::from_json(
            r#"{"language": "en", "country": "US", "orientation": "portrait", "density": 420}"#,
        );
        assert_eq!(config.language, "en");
        assert_eq!(config.country, "US");
        assert_eq!(config.orientation, Orientation::Portrait);
        assert_eq!(config.density, 420);
        assert_eq!(config.sdk_version, 0);
    }

    #[test]
    fn malformed_configuration_falls_back_to_default() {
        assert_eq!(Configuration::from_json("not json"), Configuration::default());
    }
}
