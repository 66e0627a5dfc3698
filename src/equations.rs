use crate::algebra::{Expression, Parameter, ParseError};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// An equality between two [`Expression`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    left: Expression,
    right: Expression,
}

impl Equation {
    pub fn new<L, R>(left: L, right: R) -> Self
    where
        L: Into<Expression>,
        R: Into<Expression>,
    {
        Equation {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn left(&self) -> &Expression { &self.left }

    pub fn right(&self) -> &Expression { &self.right }

    /// The equation rearranged as a single expression which should equal zero
    /// (i.e. `left - right`).
    pub fn body(&self) -> Expression { self.left.clone() - self.right.clone() }

    /// Every distinct [`Parameter`] mentioned by this [`Equation`], in the
    /// order they first appear.
    pub fn params(&self) -> Vec<Parameter> {
        let mut params: Vec<Parameter> = Vec::new();

        for param in self.left.params().chain(self.right.params()) {
            if !params.contains(param) {
                params.push(param.clone());
            }
        }

        params
    }
}

impl FromStr for Equation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.find('=') {
            Some(index) => {
                let (left, right) = s.split_at(index);
                let right = &right[1..];
                Ok(Equation::new(
                    left.parse::<Expression>()?,
                    right.parse::<Expression>()?,
                ))
            },
            // a bare expression is implicitly equal to zero
            None => Ok(Equation::new(s.parse::<Expression>()?, 0.0)),
        }
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}
