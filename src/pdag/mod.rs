//! Indexed Boolean DAG: the shared substrate consumed by the preprocessor
//! and every qualitative/quantitative backend.
//!
//! Ownership model: every node is owned exclusively by
//! the arena (`Pdag.nodes`); parent sets are weak lookup shortcuts rebuilt
//! by the preprocessor whenever a gate is rewritten, never an ownership
//! edge. This replaces the source's raw-pointer parent graph with
//! "arena + indices + weak lookup".

mod builder;
mod node;

pub use builder::{PdagArtifacts, PdagBuilder, VariableSource};
pub use node::{Edge, GateNode, Node, NodeId, NodeKind};

use crate::model::Connective;

/// An indexed, signed-edge Boolean DAG rooted at exactly one gate.
pub struct Pdag {
    nodes: Vec<Node>,
    /// dense index where variable nodes begin; everything at or above this
    /// index (and not a constant) is a Variable.
    variable_start: u32,
    root: NodeId,
    /// analyze the negation of root.
    pub complement: bool,
    pub normal: bool,
    pub coherent: bool,
    pub has_null_gates: bool,
    pub has_constants: bool,
}

impl Pdag {
    /// Builds an empty arena with only the shared TRUE constant allocated,
    /// and a placeholder root (overwritten once the real root gate is
    /// added — see [`PdagBuilder`]).
    pub(crate) fn empty() -> Self {
        let constant = Node {
            kind: NodeKind::Constant,
            parents: Vec::new(),
        };
        Self {
            nodes: vec![constant],
            variable_start: 2,
            root: NodeId::new(1),
            complement: false,
            normal: true,
            coherent: true,
            has_null_gates: false,
            has_constants: false,
        }
    }

    pub fn true_node(&self) -> NodeId {
        NodeId::new(1)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn gate(&self, id: NodeId) -> &GateNode {
        match &self.node(id).kind {
            NodeKind::Gate(g) => g,
            other => panic!("node {:?} is not a gate: {other:?}", id),
        }
    }

    pub fn gate_mut(&mut self, id: NodeId) -> &mut GateNode {
        match &mut self.node_mut(id).kind {
            NodeKind::Gate(g) => g,
            other => panic!("node is not a gate: {other:?}"),
        }
    }

    pub fn is_variable(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Variable { .. })
    }
    pub fn is_constant(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Constant)
    }
    pub fn is_gate(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Gate(_))
    }

    pub fn variable_start(&self) -> u32 {
        self.variable_start
    }

    /// This variable's position in the linear BDD/ZBDD order. Falls back to
    /// the node's own dense index when [`Pdag::assign_variable_order`]
    /// hasn't run yet, which is still a valid (if unoptimized) total order.
    pub fn variable_order(&self, id: NodeId) -> u32 {
        match self.node(id).kind {
            NodeKind::Variable { order: Some(o) } => o,
            _ => id.index() as u32,
        }
    }

    /// Assigns a linear variable order by topological first-appearance from
    /// the root, walking positive edges before negative ones to break ties.
    /// Stable under repeated preprocessor runs since it only depends on
    /// current graph shape.
    pub fn assign_variable_order(&mut self) {
        let mut seen = vec![false; self.nodes.len() + 1];
        let mut order_counter = 0u32;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let idx = id.index();
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            match self.node(id).kind.clone() {
                NodeKind::Variable { .. } => {
                    self.node_mut(id).kind = NodeKind::Variable {
                        order: Some(order_counter),
                    };
                    order_counter += 1;
                }
                NodeKind::Constant => {}
                NodeKind::Gate(g) => {
                    let mut positive: Vec<NodeId> = Vec::new();
                    let mut negative: Vec<NodeId> = Vec::new();
                    for edge in g.args() {
                        if edge.complement {
                            negative.push(edge.target);
                        } else {
                            positive.push(edge.target);
                        }
                    }
                    stack.extend(negative);
                    stack.extend(positive);
                }
            }
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(|i| NodeId::new(i as u32 + 1))
            .filter(|id| self.is_variable(*id))
    }

    pub fn gates(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(|i| NodeId::new(i as u32 + 1))
            .filter(|id| self.is_gate(*id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parents: Vec::new(),
        });
        NodeId::new(self.nodes.len() as u32)
    }

    pub(crate) fn add_variable(&mut self) -> NodeId {
        self.push_node(NodeKind::Variable { order: None })
    }

    /// Adds a gate and registers it as a parent of every argument it
    /// references.
    pub(crate) fn add_gate(&mut self, gate: GateNode) -> NodeId {
        let args: Vec<NodeId> = gate.args().map(|e| e.target).collect();
        let id = self.push_node(NodeKind::Gate(gate));
        for arg in args {
            self.node_mut(arg).parents.push(id);
        }
        id
    }

    /// Recomputes every parent set from scratch by scanning all gates.
    /// Required after bulk in-place gate rewrites.
    pub fn rebuild_parents(&mut self) {
        for node in &mut self.nodes {
            node.parents.clear();
        }
        let gate_ids: Vec<NodeId> = self.gates().collect();
        for gate_id in gate_ids {
            let args: Vec<NodeId> = self.gate(gate_id).args().map(|e| e.target).collect();
            for arg in args {
                self.node_mut(arg).parents.push(gate_id);
            }
        }
    }

    /// Recomputes `normal`/`coherent`/`has_null_gates`/`has_constants` by
    /// walking from the root. `normal` means no XOR/ATLEAST reachable;
    /// `coherent` means no negations reachable.
    pub fn recompute_flags(&mut self) {
        let mut normal = true;
        let mut coherent = true;
        let mut has_null_gates = false;
        let mut has_constants = false;
        let mut seen = vec![false; self.nodes.len() + 1];
        let mut stack = vec![Edge::positive(self.root)];
        while let Some(edge) = stack.pop() {
            if edge.complement {
                coherent = false;
            }
            let idx = edge.target.index();
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            match &self.node(edge.target).kind {
                NodeKind::Constant => has_constants = true,
                NodeKind::Variable { .. } => {}
                NodeKind::Gate(g) => {
                    match g.connective {
                        Connective::Xor | Connective::Atleast(_) | Connective::Cardinality(..) => {
                            normal = false
                        }
                        Connective::Nand | Connective::Nor | Connective::Not | Connective::Iff
                        | Connective::Imply => coherent = false,
                        _ => {}
                    }
                    if matches!(g.connective, Connective::Null) {
                        has_null_gates = true;
                    }
                    stack.extend(g.args());
                }
            }
        }
        self.normal = normal;
        self.coherent = coherent;
        self.has_null_gates = has_null_gates;
        self.has_constants = has_constants;
    }

    /// Debug-only structural invariant check: every edge
    /// indexes an existing node, arities respect each connective, and the
    /// root has no ancestor cycle. Internal-consistency failures panic
    /// rather than return `Result`.
    #[cfg(debug_assertions)]
    pub fn assert_invariants(&self) {
        for id in self.gates() {
            let gate = self.gate(id);
            for edge in gate.args() {
                assert!(
                    edge.target.index() < self.nodes.len(),
                    "dangling edge from gate {:?} to {:?}",
                    id,
                    edge.target
                );
            }
        }
        assert!(!self.has_cycle(), "PDAG gate-argument graph has a cycle");
    }

    #[cfg(debug_assertions)]
    fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut marks = vec![Mark::Unvisited; self.nodes.len() + 1];
        fn visit(pdag: &Pdag, id: NodeId, marks: &mut [Mark]) -> bool {
            match marks[id.index()] {
                Mark::Done => return false,
                Mark::InProgress => return true,
                Mark::Unvisited => {}
            }
            marks[id.index()] = Mark::InProgress;
            if let NodeKind::Gate(g) = &pdag.node(id).kind {
                for edge in g.args() {
                    if pdag.is_gate(edge.target) && visit(pdag, edge.target, marks) {
                        return true;
                    }
                }
            }
            marks[id.index()] = Mark::Done;
            false
        }
        visit(self, self.root, &mut marks)
    }
}
