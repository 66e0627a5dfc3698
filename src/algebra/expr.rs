use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A free symbol which gets its value from somewhere else.
    Parameter(Parameter),
    Constant(f64),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Negate the expression.
    Negate(Box<Expression>),
    /// Invoke a builtin function.
    FunctionCall {
        function: SmolStr,
        argument: Box<Expression>,
    },
}

impl Expression {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self {
        Expression::Parameter(Parameter::named(name))
    }

    pub fn call<S: Into<SmolStr>>(function: S, argument: Expression) -> Self {
        Expression::FunctionCall {
            function: function.into(),
            argument: Box::new(argument),
        }
    }

    /// Iterate over every [`Parameter`] this [`Expression`] mentions.
    ///
    /// A parameter is yielded once for each time it appears.
    pub fn params(&self) -> impl Iterator<Item = &Parameter> + '_ {
        let mut found = Vec::new();
        self.visit(&mut |expr| {
            if let Expression::Parameter(p) = expr {
                found.push(p);
            }
        });

        found.into_iter()
    }

    /// The names of every function this [`Expression`] calls.
    pub fn functions(&self) -> impl Iterator<Item = &SmolStr> + '_ {
        let mut found = Vec::new();
        self.visit(&mut |expr| {
            if let Expression::FunctionCall { function, .. } = expr {
                found.push(function);
            }
        });

        found.into_iter()
    }

    /// Does this [`Expression`] mention a particular [`Parameter`]?
    pub fn depends_on(&self, param: &Parameter) -> bool {
        self.params().any(|p| p == param)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expression::Constant(_))
    }

    pub fn powi(self, exponent: i32) -> Expression {
        self.pow(Expression::Constant(exponent.into()))
    }

    pub fn pow(self, exponent: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(exponent),
            op: BinaryOperation::Power,
        }
    }

    pub fn sqrt(self) -> Expression { Expression::call("sqrt", self) }

    pub fn sin(self) -> Expression { Expression::call("sin", self) }

    pub fn cos(self) -> Expression { Expression::call("cos", self) }

    pub fn tan(self) -> Expression { Expression::call("tan", self) }

    pub fn exp(self) -> Expression { Expression::call("exp", self) }

    pub fn ln(self) -> Expression { Expression::call("ln", self) }

    fn visit<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        visitor(self);

        match self {
            Expression::Binary { left, right, .. } => {
                left.visit(visitor);
                right.visit(visitor);
            },
            Expression::Negate(inner) => inner.visit(visitor),
            Expression::FunctionCall { argument, .. } => {
                argument.visit(visitor)
            },
            Expression::Parameter(_) | Expression::Constant(_) => {},
        }
    }

    /// How tightly this expression binds when printed next to an operator.
    fn precedence(&self) -> u8 {
        match self {
            Expression::Parameter(_) | Expression::FunctionCall { .. } => 4,
            Expression::Constant(value) if *value < 0.0 => 2,
            Expression::Constant(_) => 4,
            Expression::Negate(_) => 2,
            Expression::Binary { op, .. } => op.precedence(),
        }
    }
}

/// A named symbol whose value is looked up when the [`Expression`] is
/// evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter(SmolStr);

impl Parameter {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self { Parameter(name.into()) }

    pub fn name(&self) -> &str { &self.0 }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    fn precedence(self) -> u8 {
        match self {
            BinaryOperation::Plus | BinaryOperation::Minus => 1,
            BinaryOperation::Times | BinaryOperation::Divide => 2,
            BinaryOperation::Power => 3,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperation::Plus => " + ",
            BinaryOperation::Minus => " - ",
            BinaryOperation::Times => "*",
            BinaryOperation::Divide => "/",
            BinaryOperation::Power => "^",
        }
    }
}

// define some operator overloads to make constructing an expression easier.

macro_rules! binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expression {
            type Output = Expression;

            fn $method(self, rhs: Expression) -> Expression {
                Expression::Binary {
                    left: Box::new(self),
                    right: Box::new(rhs),
                    op: $op,
                }
            }
        }

        impl $trait<f64> for Expression {
            type Output = Expression;

            fn $method(self, rhs: f64) -> Expression {
                $trait::$method(self, Expression::Constant(rhs))
            }
        }

        impl $trait<Expression> for f64 {
            type Output = Expression;

            fn $method(self, rhs: Expression) -> Expression {
                $trait::$method(Expression::Constant(self), rhs)
            }
        }
    };
}

binary_op!(Add, add, BinaryOperation::Plus);
binary_op!(Sub, sub, BinaryOperation::Minus);
binary_op!(Mul, mul, BinaryOperation::Times);
binary_op!(Div, div, BinaryOperation::Divide);

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Expression { Expression::Constant(value) }
}

impl From<Parameter> for Expression {
    fn from(param: Parameter) -> Expression { Expression::Parameter(param) }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Parameter(p) => write!(f, "{}", p),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Binary { left, right, op } => {
                let precedence = op.precedence();

                // "^" is right-associative, everything else associates to the
                // left
                let (left_min, right_min) = match op {
                    BinaryOperation::Power => (precedence + 1, precedence),
                    _ => (precedence, precedence + 1),
                };

                write_operand(left, left_min, f)?;
                write!(f, "{}", op.symbol())?;
                write_operand(right, right_min, f)?;

                Ok(())
            },
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_operand(inner, 3, f)
            },
            Expression::FunctionCall { function, argument } => {
                write!(f, "{}({})", function, argument)
            },
        }
    }
}

fn write_operand(
    expr: &Expression,
    min_precedence: u8,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if expr.precedence() < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let x = || Expression::named("x");
        let inputs = vec![
            (Expression::Constant(3.0), "3"),
            (x(), "x"),
            (Expression::Constant(5.0).sin(), "sin(5)"),
            (-Expression::Constant(5.0), "-5"),
            (-Expression::Constant(5.0).sin(), "-sin(5)"),
            (-(x() + 1.0), "-(x + 1)"),
            (1.0 + x(), "1 + x"),
            (x() - 1.0, "x - 1"),
            (x() * 1.0, "x*1"),
            (x() / 2.0, "x/2"),
            ((x() + 2.0) / 3.0, "(x + 2)/3"),
            (x() - (x() - 1.0), "x - (x - 1)"),
            (x().powi(2), "x^2"),
            ((2.0 * x()).powi(2), "(2*x)^2"),
            (x().pow(x().powi(2)), "x^x^2"),
            (x().powi(2).powi(3), "(x^2)^3"),
            (x() * Expression::Constant(-2.0), "x*(-2)"),
            (x().sin().powi(2), "sin(x)^2"),
        ];

        for (expr, should_be) in inputs {
            let got = expr.to_string();
            assert_eq!(got, should_be);
        }
    }

    #[test]
    fn collect_parameters() {
        let x = Expression::named("x");
        let y = Expression::named("y");
        let expr = (x.clone() * y).sin() + x.powi(2);

        let got: Vec<_> = expr.params().map(Parameter::name).collect();

        assert_eq!(got, vec!["x", "y", "x"]);
        assert!(expr.depends_on(&Parameter::named("y")));
        assert!(!expr.depends_on(&Parameter::named("z")));
    }

    #[test]
    fn collect_functions() {
        let expr = Expression::named("x").tan().sqrt() + 1.0;

        let got: Vec<_> = expr.functions().map(|f| f.as_str()).collect();

        assert_eq!(got, vec!["sqrt", "tan"]);
    }
}
