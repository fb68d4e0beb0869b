//! Synthesizes one AND-of-path-literals [`Formula`] per event-tree sequence
//! by walking every root-to-`End` path and collecting the fork outcomes,
//! house-event instructions, and expression factors along it. A `Goto`
//! instruction redirects the walk into [`EventTree::named_branches`] instead
//! of the outcome's own `next` branch, so two paths can share a tail.

use crate::model::{ArgRef, Branch, Connective, EventTree, Formula, HouseEventId, Instruction};

#[derive(Debug, Clone)]
pub struct SequenceResult {
    pub sequence: String,
    /// `None` when the path collected no fork outcome or spliced formula —
    /// a degenerate sequence valued purely by `expression_factor`.
    pub formula: Option<Formula>,
    pub house_event_instructions: Vec<(HouseEventId, bool)>,
    pub expression_factor: f64,
    pub is_expression_only: bool,
}

pub fn synthesize(tree: &EventTree) -> Vec<SequenceResult> {
    let mut results = Vec::with_capacity(tree.sequences.len());
    let mut literals = Vec::new();
    let mut house = Vec::new();
    let mut goto_path = Vec::new();
    walk(tree, &tree.root, &mut literals, &mut house, 1.0, &mut goto_path, &mut results);
    results
}

fn walk(
    tree: &EventTree,
    branch: &Branch,
    literals: &mut Vec<ArgRef>,
    house: &mut Vec<(HouseEventId, bool)>,
    expr_factor: f64,
    goto_path: &mut Vec<String>,
    results: &mut Vec<SequenceResult>,
) {
    match branch {
        Branch::End(sequence) => {
            let formula = match literals.len() {
                0 => None,
                1 => Some(Formula::new(Connective::Null, literals.clone())),
                _ => Some(Formula::new(Connective::And, literals.clone())),
            };
            results.push(SequenceResult {
                sequence: sequence.clone(),
                is_expression_only: literals.is_empty(),
                formula,
                house_event_instructions: house.clone(),
                expression_factor: expr_factor,
            });
        }
        Branch::Fork {
            functional_event,
            on_success,
            on_failure,
        } => {
            descend(tree, *functional_event, true, on_success, literals, house, expr_factor, goto_path, results);
            descend(tree, *functional_event, false, on_failure, literals, house, expr_factor, goto_path, results);
        }
    }
}

/// `success = true` walks the success outcome (functional event did not
/// occur, a negated literal); `false` walks the failure outcome.
#[allow(clippy::too_many_arguments)]
fn descend(
    tree: &EventTree,
    functional_event: crate::model::GateId,
    success: bool,
    outcome: &(Vec<Instruction>, Box<Branch>),
    literals: &mut Vec<ArgRef>,
    house: &mut Vec<(HouseEventId, bool)>,
    expr_factor: f64,
    goto_path: &mut Vec<String>,
    results: &mut Vec<SequenceResult>,
) {
    let (instructions, next) = outcome;
    let pushed_literal = literals.len();
    literals.push(ArgRef::Gate(functional_event, success));

    let pushed_house = house.len();
    let mut factor = expr_factor;
    let mut goto_label: Option<&str> = None;
    for instruction in instructions {
        match instruction {
            Instruction::SetHouseEvent(id, state) => house.push((*id, *state)),
            Instruction::CollectExpression(e) => factor *= e.value(),
            Instruction::CollectFormula(formula) => {
                if formula.connective == Connective::And {
                    literals.extend(formula.args().iter().copied());
                } else {
                    log::warn!(
                        "event tree instruction collects a non-AND formula ({:?}); \
                         only AND-connective CollectFormula instructions are spliced \
                         into the synthesized sequence gate, this one is dropped",
                        formula.connective
                    );
                }
            }
            Instruction::Goto(label) => {
                goto_label = Some(label.as_str());
                break;
            }
        }
    }

    match goto_label {
        Some(label) => {
            let target = tree
                .named_branch(label)
                .unwrap_or_else(|| panic!("event tree goto references unknown branch '{label}'"));
            assert!(
                !goto_path.iter().any(|visited| visited == label),
                "event tree goto '{label}' forms a cycle"
            );
            goto_path.push(label.to_string());
            walk(tree, target, literals, house, factor, goto_path, results);
            goto_path.pop();
        }
        None => walk(tree, next, literals, house, factor, goto_path, results),
    }

    literals.truncate(pushed_literal);
    house.truncate(pushed_house);
}
