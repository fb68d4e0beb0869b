use super::HouseEventId;

/// An instruction executed on entry to a [`Phase`]: set a house event to a
/// fixed state for the duration of the phase.
#[derive(Debug, Clone, Copy)]
pub struct SetHouseEvent {
    pub house_event: HouseEventId,
    pub state: bool,
}

/// A slice of `[0, mission-time]` with its own house-event instructions.
/// `time_fraction` is in `(0, 1]`; the fractions of every phase in one
/// alignment must sum to 1 (checked by `Model::add_alignment`).
#[derive(Debug, Clone)]
pub struct Phase {
    pub name: String,
    pub time_fraction: f64,
    pub instructions: Vec<SetHouseEvent>,
}

/// A non-overlapping partition of `[0, mission-time]` into [`Phase`]s.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub name: String,
    pub phases: Vec<Phase>,
}
