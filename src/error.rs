use crate::{
    algebra::{ops::EvaluationError, ParseError},
    solve::SolveError,
    units::UnitError,
};
use smol_str::SmolStr;

/// Everything that can go wrong when working with [`crate::Variable`]s and
/// [`crate::Relation`]s.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unable to use {value} as a value, only finite numbers are supported")]
    UnsupportedValue { value: f64 },
    #[error("The relation's {field} can only be set once")]
    AlreadySet { field: &'static str },
    #[error("\"{name}\" doesn't have a value yet")]
    ValueUnknown { name: SmolStr },
    #[error("\"{name}\" isn't one of the relation's variables")]
    UndeclaredVariable { name: SmolStr },
    #[error("\"{name}\" was provided more than once")]
    DuplicateVariable { name: SmolStr },
    #[error("Expected {expected} variables but {found} were provided")]
    ArityMismatch { expected: usize, found: usize },
    #[error("Exactly one variable must be unknown, but found {}", .unknowns.len())]
    UnderOrOverDetermined { unknowns: Vec<SmolStr> },
    #[error("\"{name}\" doesn't appear in the equation, so it can't be solved for")]
    Unconstrained { name: SmolStr },
    #[error("A relation needs {missing} before it can be built")]
    Incomplete { missing: &'static str },
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("Unable to solve the relation")]
    Solve(#[from] SolveError),
    #[error("Unable to parse the equation")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}
