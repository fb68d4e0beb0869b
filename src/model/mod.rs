//! MEF-level model entities: immutable-after-build objects describing
//! gates, basic/house events, parameters, CCF groups, fault trees, event
//! trees, alignments and phases. Callers build a [`Model`] programmatically;
//! parsing it from MEF XML is a separate, unimplemented loader's job.

mod alignment;
mod ccf;
mod event;
mod event_tree;
mod fault_tree;
mod formula;

pub use alignment::{Alignment, Phase, SetHouseEvent};
pub use ccf::{CcfGroup, CcfModel};
pub use event::{BasicEvent, HouseEvent, InitiatingEvent, Parameter};
pub use event_tree::{Branch, EventTree, Instruction, Sequence};
pub use fault_tree::FaultTree;
pub use formula::{Connective, Formula};

use crate::error::{AnalysisError, Result};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Opaque identifier for a [`Gate`] within a [`Model`]. Stable for the
/// lifetime of the model; indexes into `Model.gates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(pub usize);

/// Opaque identifier for a [`BasicEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasicEventId(pub usize);

/// Opaque identifier for a [`HouseEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HouseEventId(pub usize);

/// A signed reference to an argument of a [`Formula`]: a literal or the
/// complement of an event or gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgRef {
    Gate(GateId, bool),
    Basic(BasicEventId, bool),
    House(HouseEventId, bool),
}

impl ArgRef {
    /// `true` when this reference is negated (a complement literal).
    pub fn is_complement(&self) -> bool {
        match self {
            ArgRef::Gate(_, c) | ArgRef::Basic(_, c) | ArgRef::House(_, c) => *c,
        }
    }
}

/// Named Event whose semantics is its [`Formula`]. May carry a backlink to
/// an external format's origin element for tracing; unused by this
/// implementation so it is left `None` until a loader attaches one.
#[derive(Debug, Clone)]
pub struct Gate {
    pub name: String,
    pub formula: Formula,
}

/// Named namespace owning every MEF construct. Guarantees unique ids per
/// entity type (enforced by the `add_*` constructors returning an id that
/// is always fresh).
#[derive(Default)]
pub struct Model {
    pub name: String,
    gates: Vec<Gate>,
    gate_names: HashMap<String, GateId>,
    basic_events: Vec<BasicEvent>,
    basic_event_names: HashMap<String, BasicEventId>,
    house_events: Vec<HouseEvent>,
    house_event_names: HashMap<String, HouseEventId>,
    parameters: HashMap<String, Rc<Parameter>>,
    ccf_groups: Vec<CcfGroup>,
    fault_trees: Vec<FaultTree>,
    event_trees: Vec<EventTree>,
    initiating_events: Vec<InitiatingEvent>,
    alignments: Vec<Alignment>,
    mission_time: Rc<Cell<f64>>,
}

impl Model {
    pub fn new(name: impl Into<String>, mission_time_hours: f64) -> Self {
        Self {
            name: name.into(),
            mission_time: Rc::new(Cell::new(mission_time_hours)),
            ..Default::default()
        }
    }

    pub fn mission_time(&self) -> Rc<Cell<f64>> {
        Rc::clone(&self.mission_time)
    }

    pub fn add_gate(&mut self, name: impl Into<String>, formula: Formula) -> Result<GateId> {
        let name = name.into();
        if self.gate_names.contains_key(&name) {
            return Err(AnalysisError::Validity(format!(
                "duplicate gate name '{name}'"
            )));
        }
        let id = GateId(self.gates.len());
        self.gate_names.insert(name.clone(), id);
        self.gates.push(Gate { name, formula });
        Ok(id)
    }

    /// Rewrites a gate's formula in place (used by CCF expansion and house
    /// event folding, which replace an already-registered gate's body).
    pub fn set_formula(&mut self, id: GateId, formula: Formula) {
        self.gates[id.0].formula = formula;
    }

    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id.0]
    }

    pub fn gate_id(&self, name: &str) -> Option<GateId> {
        self.gate_names.get(name).copied()
    }

    pub fn gates(&self) -> impl Iterator<Item = (GateId, &Gate)> {
        self.gates.iter().enumerate().map(|(i, g)| (GateId(i), g))
    }

    pub fn add_basic_event(
        &mut self,
        name: impl Into<String>,
        expression: crate::expr::Expression,
    ) -> Result<BasicEventId> {
        let name = name.into();
        if self.basic_event_names.contains_key(&name) {
            return Err(AnalysisError::Validity(format!(
                "duplicate basic event name '{name}'"
            )));
        }
        crate::expr::ensure_probability(&expression)?;
        let id = BasicEventId(self.basic_events.len());
        self.basic_event_names.insert(name.clone(), id);
        self.basic_events.push(BasicEvent {
            name,
            expression,
            ccf_group: None,
        });
        Ok(id)
    }

    pub fn basic_event(&self, id: BasicEventId) -> &BasicEvent {
        &self.basic_events[id.0]
    }

    pub fn basic_event_id(&self, name: &str) -> Option<BasicEventId> {
        self.basic_event_names.get(name).copied()
    }

    pub fn basic_events(&self) -> impl Iterator<Item = (BasicEventId, &BasicEvent)> {
        self.basic_events
            .iter()
            .enumerate()
            .map(|(i, e)| (BasicEventId(i), e))
    }

    pub fn add_house_event(&mut self, name: impl Into<String>, state: bool) -> HouseEventId {
        let name = name.into();
        let id = HouseEventId(self.house_events.len());
        self.house_event_names.insert(name.clone(), id);
        self.house_events.push(HouseEvent {
            name,
            state: Cell::new(state),
        });
        id
    }

    pub fn house_event(&self, id: HouseEventId) -> &HouseEvent {
        &self.house_events[id.0]
    }

    pub fn house_event_id(&self, name: &str) -> Option<HouseEventId> {
        self.house_event_names.get(name).copied()
    }

    pub fn house_events(&self) -> impl Iterator<Item = (HouseEventId, &HouseEvent)> {
        self.house_events
            .iter()
            .enumerate()
            .map(|(i, e)| (HouseEventId(i), e))
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, expression: crate::expr::Expression) {
        self.parameters
            .insert(name.into(), Rc::new(Parameter { expression }));
    }

    pub fn parameter(&self, name: &str) -> Option<&Rc<Parameter>> {
        self.parameters.get(name)
    }

    pub fn add_fault_tree(&mut self, tree: FaultTree) -> Result<()> {
        if tree.top_gates.is_empty() {
            return Err(AnalysisError::Validity(format!(
                "fault tree '{}' has no top events",
                tree.name
            )));
        }
        self.fault_trees.push(tree);
        Ok(())
    }

    pub fn fault_trees(&self) -> &[FaultTree] {
        &self.fault_trees
    }

    pub fn add_event_tree(&mut self, tree: EventTree) {
        self.event_trees.push(tree);
    }

    pub fn event_tree(&self, name: &str) -> Option<&EventTree> {
        self.event_trees.iter().find(|t| t.name == name)
    }

    pub fn add_initiating_event(&mut self, ie: InitiatingEvent) {
        self.initiating_events.push(ie);
    }

    pub fn initiating_events(&self) -> &[InitiatingEvent] {
        &self.initiating_events
    }

    pub fn add_alignment(&mut self, alignment: Alignment) -> Result<()> {
        let total: f64 = alignment.phases.iter().map(|p| p.time_fraction).sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::Validity(format!(
                "alignment '{}' phase fractions sum to {total}, expected 1.0",
                alignment.name
            )));
        }
        self.alignments.push(alignment);
        Ok(())
    }

    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    pub fn add_ccf_group(&mut self, group: CcfGroup) -> Result<()> {
        if group.members.len() < 2 {
            return Err(AnalysisError::Validity(format!(
                "CCF group '{}' needs at least 2 members",
                group.name
            )));
        }
        self.ccf_groups.push(group);
        Ok(())
    }

    pub fn ccf_groups(&self) -> &[CcfGroup] {
        &self.ccf_groups
    }

    /// Checks the no-cycles invariant over every gate's argument graph
    /// using `petgraph`. Unlike the PDAG itself (a bespoke indexed arena, see
    /// [`crate::pdag`]), this check runs once at model-validation time and
    /// is not on the hot path, so reaching for `petgraph::algo::is_cyclic_directed`
    /// here is the idiomatic choice.
    pub fn validate_acyclic(&self) -> Result<()> {
        use petgraph::algo::is_cyclic_directed;
        use petgraph::graph::DiGraph;

        let mut graph = DiGraph::<(), ()>::with_capacity(self.gates.len(), 0);
        let nodes: Vec<_> = (0..self.gates.len()).map(|_| graph.add_node(())).collect();
        for (id, gate) in self.gates() {
            for arg in gate.formula.args() {
                if let ArgRef::Gate(target, _) = arg {
                    graph.add_edge(nodes[id.0], nodes[target.0], ());
                }
            }
        }
        if is_cyclic_directed(&graph) {
            return Err(AnalysisError::Validity(
                "gate argument graph contains a cycle".into(),
            ));
        }
        Ok(())
    }
}

impl crate::Arbitrary for Model {
    /// A small three-basic-event two-gate fault tree: `TOP = G1 OR C`,
    /// `G1 = A AND B`, with fixed small probabilities. Not randomized in the
    /// statistical sense — enough to give each test its own independent
    /// model without hand-writing the boilerplate every time.
    fn random() -> Self {
        let mut model = Model::new("arbitrary", 1.0);
        let a = model
            .add_basic_event("A", crate::expr::Expression::constant(0.01))
            .expect("fresh model accepts a new basic event");
        let b = model
            .add_basic_event("B", crate::expr::Expression::constant(0.02))
            .expect("fresh model accepts a new basic event");
        let c = model
            .add_basic_event("C", crate::expr::Expression::constant(0.03))
            .expect("fresh model accepts a new basic event");
        let g1 = model
            .add_gate("G1", Formula::new(Connective::And, vec![ArgRef::Basic(a, false), ArgRef::Basic(b, false)]))
            .expect("fresh model accepts a new gate");
        let top = model
            .add_gate("TOP", Formula::new(Connective::Or, vec![ArgRef::Gate(g1, false), ArgRef::Basic(c, false)]))
            .expect("fresh model accepts a new gate");
        model
            .add_fault_tree(FaultTree::new("FT", vec![top]))
            .expect("fresh model accepts a new fault tree");
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    #[test]
    fn arbitrary_model_validates_acyclic_and_exposes_its_top_gate() {
        let model = Model::random();
        model.validate_acyclic().unwrap();
        assert_eq!(model.fault_trees().len(), 1);
        let top = model.gate_id("TOP").unwrap();
        assert_eq!(model.fault_trees()[0].top_gates, vec![top]);
    }
}
