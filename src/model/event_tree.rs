use super::{GateId, HouseEventId};
use crate::expr::Expression;
use std::collections::HashMap;

/// A named end state of an event tree path.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub name: String,
}

/// An instruction collected while walking a path to a [`Sequence`].
#[derive(Clone)]
pub enum Instruction {
    CollectExpression(Expression),
    CollectFormula(crate::model::Formula),
    SetHouseEvent(HouseEventId, bool),
    /// Abandon the rest of this outcome's instruction list and continue the
    /// walk from the named entry in [`EventTree::named_branches`] instead of
    /// the outcome's own `next` branch — lets two or more paths share a tail
    /// without duplicating it.
    Goto(String),
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::CollectExpression(_) => write!(f, "CollectExpression(..)"),
            Instruction::CollectFormula(formula) => {
                write!(f, "CollectFormula({:?})", formula.connective)
            }
            Instruction::SetHouseEvent(id, state) => {
                write!(f, "SetHouseEvent({id:?}, {state})")
            }
            Instruction::Goto(label) => write!(f, "Goto({label:?})"),
        }
    }
}

/// One branch of the event tree: either a fork on a functional event's
/// gate (true/false outcome, each carrying its own instructions) or a
/// terminal sequence.
#[derive(Debug, Clone)]
pub enum Branch {
    Fork {
        functional_event: GateId,
        on_success: (Vec<Instruction>, Box<Branch>),
        on_failure: (Vec<Instruction>, Box<Branch>),
    },
    End(String),
}

/// A named trigger with a frequency that heads an event tree (the tree
/// itself; [`super::InitiatingEvent`] references it by name).
#[derive(Debug, Clone)]
pub struct EventTree {
    pub name: String,
    pub root: Branch,
    pub sequences: Vec<Sequence>,
    /// Branch points reachable via `Instruction::Goto`, keyed by label.
    /// Empty unless the tree actually shares a tail between sequences.
    pub named_branches: HashMap<String, Branch>,
}

impl EventTree {
    pub fn new(name: impl Into<String>, root: Branch, sequences: Vec<Sequence>) -> Self {
        Self {
            name: name.into(),
            root,
            sequences,
            named_branches: HashMap::new(),
        }
    }

    pub fn with_named_branches(mut self, named_branches: HashMap<String, Branch>) -> Self {
        self.named_branches = named_branches;
        self
    }

    pub fn named_branch(&self, label: &str) -> Option<&Branch> {
        self.named_branches.get(label)
    }
}
