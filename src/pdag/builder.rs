use super::node::{Edge, GateNode, NodeId};
use super::Pdag;
use crate::model::{ArgRef, BasicEventId, CcfGroup, GateId, Model};
use std::collections::HashMap;

/// Where a PDAG Variable's probability comes from: a plain basic event, or
/// a probability synthesized during CCF-group expansion — CCF groups are
/// expanded into sub-gates over derived basic events before indexing;
/// those derived events have no `BasicEventId` of their own.
#[derive(Debug, Clone, Copy)]
pub enum VariableSource {
    Basic(BasicEventId),
    CcfDerived(f64),
}

/// Output of [`PdagBuilder::build`]: the PDAG plus the lookups orchestration
/// needs to relate PDAG indices back to MEF gates and basic events.
pub struct PdagArtifacts {
    pub pdag: Pdag,
    pub gate_for_index: HashMap<u32, GateId>,
    pub index_for_gate: HashMap<GateId, u32>,
    pub variable_source: HashMap<NodeId, VariableSource>,
}

/// Walks the MEF gate DAG in post-order and produces a [`Pdag`] rooted at
/// `root`, plus a bimap relating PDAG gate indices back to MEF gates (used
/// by orchestration to trace products/importance back to named gates).
pub struct PdagBuilder<'m> {
    model: &'m Model,
    pdag: Pdag,
    gate_nodes: HashMap<GateId, NodeId>,
    variables: HashMap<BasicEventId, NodeId>,
    /// `(ccf group name, subset of member names)` -> synthesized subset
    /// variable, shared across every member that subset contains.
    ccf_subset_vars: HashMap<(String, Vec<String>), NodeId>,
    /// Synthesized per-member OR-gate over the subsets containing it,
    /// memoized so repeated references to the same CCF-member basic event
    /// share one node (builder "Process multiple definitions" in miniature).
    ccf_member_gates: HashMap<BasicEventId, NodeId>,
    variable_source: HashMap<NodeId, VariableSource>,
    forward: HashMap<u32, GateId>,
    backward: HashMap<GateId, u32>,
}

impl<'m> PdagBuilder<'m> {
    pub fn build(root: GateId, model: &'m Model) -> PdagArtifacts {
        let mut builder = Self {
            model,
            pdag: Pdag::empty(),
            gate_nodes: HashMap::new(),
            variables: HashMap::new(),
            ccf_subset_vars: HashMap::new(),
            ccf_member_gates: HashMap::new(),
            variable_source: HashMap::new(),
            forward: HashMap::new(),
            backward: HashMap::new(),
        };
        builder.discover_variables(root);
        let root_node = builder.build_gate(root);
        builder.pdag.set_root(root_node);
        builder.pdag.recompute_flags();
        #[cfg(debug_assertions)]
        builder.pdag.assert_invariants();
        PdagArtifacts {
            pdag: builder.pdag,
            gate_for_index: builder.forward,
            index_for_gate: builder.backward,
            variable_source: builder.variable_source,
        }
    }

    /// Builds a PDAG rooted at a formula that is not itself a registered
    /// model gate — used for event-tree synthesized sequence gates, whose
    /// arguments are still real model gates/basic events but whose AND-of-
    /// path-literals root has no `GateId` of its own.
    pub fn build_virtual(model: &'m Model, formula: &crate::model::Formula) -> PdagArtifacts {
        let mut builder = Self {
            model,
            pdag: Pdag::empty(),
            gate_nodes: HashMap::new(),
            variables: HashMap::new(),
            ccf_subset_vars: HashMap::new(),
            ccf_member_gates: HashMap::new(),
            variable_source: HashMap::new(),
            forward: HashMap::new(),
            backward: HashMap::new(),
        };
        let mut visited = std::collections::HashSet::new();
        for &arg in formula.args() {
            builder.discover_arg(arg, &mut visited);
        }
        let node = builder.compose(formula.connective, formula.args());
        let root_node = builder.pdag.add_gate(node);
        builder.pdag.set_root(root_node);
        builder.pdag.recompute_flags();
        #[cfg(debug_assertions)]
        builder.pdag.assert_invariants();
        PdagArtifacts {
            pdag: builder.pdag,
            gate_for_index: builder.forward,
            index_for_gate: builder.backward,
            variable_source: builder.variable_source,
        }
    }

    /// Pass 1: registers every basic event (and every CCF-derived subset)
    /// reachable from `root` as a PDAG Variable, in first-encounter
    /// post-order, so the variable index range stays dense and contiguous
    /// gates are only added in pass 2.
    fn discover_variables(&mut self, root: GateId) {
        let mut visited_gates = std::collections::HashSet::new();
        self.discover_rec(root, &mut visited_gates);
    }

    fn discover_rec(&mut self, gate: GateId, visited: &mut std::collections::HashSet<GateId>) {
        if !visited.insert(gate) {
            return;
        }
        let args: Vec<ArgRef> = self.model.gate(gate).formula.args().to_vec();
        for arg in args {
            self.discover_arg(arg, visited);
        }
    }

    fn discover_arg(&mut self, arg: ArgRef, visited: &mut std::collections::HashSet<GateId>) {
        match arg {
            ArgRef::Gate(g, _) => self.discover_rec(g, visited),
            ArgRef::Basic(b, _) => self.discover_variable(b),
            ArgRef::House(_, _) => {}
        }
    }

    fn discover_variable(&mut self, bid: BasicEventId) {
        let event = self.model.basic_event(bid);
        match &event.ccf_group {
            None => {
                if let std::collections::hash_map::Entry::Vacant(entry) = self.variables.entry(bid)
                {
                    let id = self.pdag.add_variable();
                    self.variable_source.insert(id, VariableSource::Basic(bid));
                    entry.insert(id);
                }
            }
            Some(group_name) => {
                if let Some(group) = self.model.ccf_groups().iter().find(|g| &g.name == group_name)
                {
                    let base_p = event.probability();
                    let group = group.clone();
                    self.ensure_ccf_group_variables(&group, base_p);
                }
            }
        }
    }

    fn ensure_ccf_group_variables(&mut self, group: &CcfGroup, base_p: f64) {
        for (subset, expr) in group.derive(base_p) {
            let key = (group.name.clone(), subset);
            if let std::collections::hash_map::Entry::Vacant(entry) =
                self.ccf_subset_vars.entry(key)
            {
                let id = self.pdag.add_variable();
                self.variable_source
                    .insert(id, VariableSource::CcfDerived(expr.value()));
                entry.insert(id);
            }
        }
    }

    fn build_gate(&mut self, gate: GateId) -> NodeId {
        if let Some(existing) = self.gate_nodes.get(&gate) {
            return *existing;
        }
        let model_gate = self.model.gate(gate);
        let connective = model_gate.formula.connective;
        let args: Vec<ArgRef> = model_gate.formula.args().to_vec();

        // reserve the id before recursing so a pathological self-reference
        // (only possible in an invalid model — Model::validate_acyclic
        // rejects it beforehand) can't infinite-loop.
        let placeholder = self.pdag.add_gate(GateNode::new(connective));
        self.gate_nodes.insert(gate, placeholder);

        let node = self.compose(connective, &args);
        *self.pdag.node_mut(placeholder) = super::node::Node {
            kind: super::node::NodeKind::Gate(node),
            parents: Vec::new(),
        };
        let arg_targets: Vec<NodeId> = self
            .pdag
            .gate(placeholder)
            .args()
            .map(|e| e.target)
            .collect();
        for target in arg_targets {
            self.pdag.node_mut(target).parents.push(placeholder);
        }

        self.forward.insert(placeholder.index() as u32, gate);
        self.backward.insert(gate, placeholder.index() as u32);
        placeholder
    }

    fn compose(&mut self, connective: crate::model::Connective, args: &[ArgRef]) -> GateNode {
        let mut node = GateNode::new(connective);
        for &arg in args {
            let edge = self.resolve_arg(arg);
            self.classify(&mut node, edge);
        }
        node
    }

    fn resolve_arg(&mut self, arg: ArgRef) -> Edge {
        match arg {
            ArgRef::Gate(g, complement) => {
                let target = self.build_gate(g);
                Edge { target, complement }
            }
            ArgRef::Basic(b, complement) => {
                let target = self.resolve_basic(b);
                Edge { target, complement }
            }
            ArgRef::House(h, complement) => {
                let state = self.model.house_event(h).state.get();
                let value = state ^ complement;
                if value {
                    Edge::positive(self.pdag.true_node())
                } else {
                    Edge::negative(self.pdag.true_node())
                }
            }
        }
    }

    fn resolve_basic(&mut self, bid: BasicEventId) -> NodeId {
        let event = self.model.basic_event(bid);
        match event.ccf_group.clone() {
            None => *self
                .variables
                .get(&bid)
                .expect("basic event variable discovered in pass 1"),
            Some(group_name) => {
                if let Some(existing) = self.ccf_member_gates.get(&bid) {
                    return *existing;
                }
                let group = self
                    .model
                    .ccf_groups()
                    .iter()
                    .find(|g| g.name == group_name)
                    .expect("CCF group referenced by basic event exists in model")
                    .clone();
                let member_name = event.name.clone();
                let member_gate = self.synthesize_ccf_member(&group, &member_name);
                self.ccf_member_gates.insert(bid, member_gate);
                member_gate
            }
        }
    }

    /// OR of every derived subset variable whose subset contains `member`
    /// — the member fails either independently or as part of a common-cause
    /// combination.
    fn synthesize_ccf_member(&mut self, group: &CcfGroup, member: &str) -> NodeId {
        let mut gate = GateNode::new(crate::model::Connective::Or);
        let subsets: Vec<Vec<String>> = self
            .ccf_subset_vars
            .keys()
            .filter(|(g, subset)| g == &group.name && subset.iter().any(|m| m == member))
            .map(|(_, subset)| subset.clone())
            .collect();
        for subset in subsets {
            let var = self.ccf_subset_vars[&(group.name.clone(), subset)];
            gate.arg_variables.push(Edge::positive(var));
        }
        if gate.arg_count() == 1 {
            return gate.args().next().unwrap().target;
        }
        self.pdag.add_gate(gate)
    }

    fn classify(&self, gate: &mut GateNode, edge: Edge) {
        if self.pdag.is_constant(edge.target) {
            gate.arg_constants.push(edge);
        } else if self.pdag.is_variable(edge.target) {
            gate.arg_variables.push(edge);
        } else {
            gate.arg_gates.push(edge);
        }
    }
}
