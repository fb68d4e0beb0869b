use super::ArgRef;

/// Boolean connective of a gate's formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
    Not,
    Xor,
    Nand,
    Nor,
    Iff,
    Imply,
    Null,
    /// `ATLEAST(k)`: true when at least `k` of the arguments are true.
    Atleast(usize),
    /// `CARDINALITY(l, h)`: true when between `l` and `h` arguments (both
    /// inclusive) are true.
    Cardinality(usize, usize),
}

/// `{connective, args}` where each arg is a signed reference to another
/// event or gate.
#[derive(Debug, Clone)]
pub struct Formula {
    pub connective: Connective,
    args: Vec<ArgRef>,
}

impl Formula {
    pub fn new(connective: Connective, args: Vec<ArgRef>) -> Self {
        let formula = Self { connective, args };
        formula.assert_arity();
        formula
    }

    pub fn args(&self) -> &[ArgRef] {
        &self.args
    }

    /// AND/OR gates have >=2 arguments; NULL and NOT have exactly one;
    /// ATLEAST(k) has at least k+1. Violations here are model-construction
    /// bugs, not user input (a validated model can't reach this), so they
    /// panic rather than return `Result`.
    fn assert_arity(&self) {
        match self.connective {
            Connective::And | Connective::Or | Connective::Xor | Connective::Nand
            | Connective::Nor | Connective::Iff | Connective::Imply => {
                assert!(
                    self.args.len() >= 2,
                    "{:?} gate requires >=2 arguments, got {}",
                    self.connective,
                    self.args.len()
                );
            }
            Connective::Not | Connective::Null => {
                assert_eq!(
                    self.args.len(),
                    1,
                    "{:?} gate requires exactly 1 argument, got {}",
                    self.connective,
                    self.args.len()
                );
            }
            Connective::Atleast(k) => {
                assert!(
                    self.args.len() >= k + 1,
                    "ATLEAST({k}) requires at least {} arguments, got {}",
                    k + 1,
                    self.args.len()
                );
            }
            Connective::Cardinality(l, h) => {
                assert!(l <= h, "CARDINALITY(l={l}, h={h}) requires l <= h");
                assert!(
                    self.args.len() >= h,
                    "CARDINALITY({l},{h}) requires at least {h} arguments, got {}",
                    self.args.len()
                );
            }
        }
    }
}
