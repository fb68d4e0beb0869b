use super::GateId;

/// Container of gates with a non-empty set of "top events" (roots).
#[derive(Debug, Clone)]
pub struct FaultTree {
    pub name: String,
    pub top_gates: Vec<GateId>,
}

impl FaultTree {
    pub fn new(name: impl Into<String>, top_gates: Vec<GateId>) -> Self {
        Self {
            name: name.into(),
            top_gates,
        }
    }
}
