/// Crawl state definitions for the engine lifecycle
///
/// Allowed transitions:
///
/// ```text
/// Idle ──start──▶ Working ◀──resume── Paused
///                    └──────pause──────▶┘
/// {Idle, Working, Paused} ──stop──▶ Stopped
/// ```
use std::fmt;

/// Represents the current state of a crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrawlState {
    /// Engine has been built but `start` has not been called
    #[default]
    Idle,

    /// Pages are being dispatched
    Working,

    /// Dispatch of not-yet-started pages is withheld; in-flight fetches continue
    Paused,

    /// Crawl was stopped; the engine is inert from now on
    Stopped,
}

impl CrawlState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Working) => true,
            (Self::Working, Self::Paused) => true,
            (Self::Paused, Self::Working) => true,
            (Self::Idle | Self::Working | Self::Paused, Self::Stopped) => true,
            _ => false,
        }
    }

    /// Short lowercase name, used in logs and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Working => "working",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
