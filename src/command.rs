//! Command codes carried over the command pipe from the host thread to the
//! application thread, and the coarse activity lifecycle phases they drive.

/// One-byte command codes written by the host thread and consumed by the
/// application thread, in the order they were written.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// The input queue is changing; the pending queue must be committed.
    InputChanged = 0,
    /// A new window surface is pending and must be committed.
    InitWindow = 1,
    /// The committed window is going away and must be released.
    TermWindow = 2,
    GainedFocus = 3,
    LostFocus = 4,
    /// The host configuration changed; reload it from the asset source.
    ConfigChanged = 5,
    LowMemory = 6,
    Start = 7,
    Resume = 8,
    /// The host wants a saved-state blob; the app may store one.
    SaveState = 9,
    Pause = 10,
    Stop = 11,
    /// Terminal command; the application loop must exit.
    Destroy = 12,
}

impl Command {
    /// The wire byte for this command.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte. Returns `None` for bytes outside the protocol.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::InputChanged,
            1 => Self::InitWindow,
            2 => Self::TermWindow,
            3 => Self::GainedFocus,
            4 => Self::LostFocus,
            5 => Self::ConfigChanged,
            6 => Self::LowMemory,
            7 => Self::Start,
            8 => Self::Resume,
            9 => Self::SaveState,
            10 => Self::Pause,
            11 => Self::Stop,
            12 => Self::Destroy,
            _ => return None,
        })
    }

    /// The lifecycle phase this command moves the activity into, if any.
    pub fn activity_state(self) -> Option<ActivityState> {
        match self {
            Self::Start => Some(ActivityState::Start),
            Self::Resume => Some(ActivityState::Resume),
            Self::Pause => Some(ActivityState::Pause),
            Self::Stop => Some(ActivityState::Stop),
            _ => None,
        }
    }
}

/// Coarse lifecycle phase of the host activity, as last committed by the
/// application thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Start,
    Resume,
    Pause,
    Stop,
}

impl ActivityState {
    /// The command that announces this phase.
    pub fn command(self) -> Command {
        match self {
            Self::Start => Command::Start,
            Self::Resume => Command::Resume,
            Self::Pause => Command::Pause,
            Self::Stop => Command::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for cmd in [
            Command::InputChanged,
            Command::InitWindow,
            Command::TermWindow,
            Command::GainedFocus,
            Command::LostFocus,
            Command::ConfigChanged,
            Command::LowMemory,
            Command::Start,
            Command::Resume,
            Command::SaveState,
            Command::Pause,
            Command::Stop,
            Command::Destroy,
        ] {
            assert_eq!(Command::from_code(cmd.code()), Some(cmd));
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(Command::from_code(13), None);
        assert_eq!(Command::from_code(255), None);
    }

    #[test]
    fn lifecycle_commands_map_to_states() {
        assert_eq!(Command::Start.activity_state(), Some(ActivityState::Start));
        assert_eq!(Command::Resume.activity_state(), Some(ActivityState::Resume));
        assert_eq!(Command::Pause.activity_state(), Some(ActivityState::Pause));
        assert_eq!(Command::Stop.activity_state(), Some(ActivityState::Stop));
        assert_eq!(Command::InitWindow.activity_state(), None);
        assert_eq!(ActivityState::Resume.command(), Command::Resume);
    }
}
