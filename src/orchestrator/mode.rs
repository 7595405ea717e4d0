use std::fmt;

/// Where a round's target shape comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// The player picks any catalog shape.
    FixedSelection,
    /// The shape is dictated by the date.
    DailyRotation,
    /// The player picks a shape and plays it against a paired opponent.
    OpponentPaired,
}

/// Game mode an orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    FreePlay,
    Daily,
    Compete,
}

impl PlayMode {
    pub fn target_source(self) -> TargetSource {
        match self {
            PlayMode::FreePlay => TargetSource::FixedSelection,
            PlayMode::Daily => TargetSource::DailyRotation,
            PlayMode::Compete => TargetSource::OpponentPaired,
        }
    }

    pub fn is_competitive(self) -> bool {
        self.target_source() == TargetSource::OpponentPaired
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayMode::FreePlay => "free play",
            PlayMode::Daily => "daily",
            PlayMode::Compete => "compete",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
