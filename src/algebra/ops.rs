//! [`Expression`] operations.

use crate::algebra::{BinaryOperation, Expression, Parameter};
use euclid::approxeq::ApproxEq;
use smol_str::SmolStr;

/// Contextual information used when evaluating an [`Expression`].
pub trait Context {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError>;

    /// For some [`Parameter`], `x`, and function, `f`, get `f'(x)`.
    fn differentiate_function(
        &self,
        name: &str,
        param: &Parameter,
    ) -> Result<Expression, EvaluationError>;

    /// Is this a function the [`Context`] knows how to evaluate?
    fn is_known_function(&self, name: &str) -> bool {
        self.evaluate_function(name, 0.5).is_ok()
    }
}

impl<'a, C: Context + ?Sized> Context for &'a C {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError> {
        (**self).evaluate_function(name, argument)
    }

    fn differentiate_function(
        &self,
        name: &str,
        param: &Parameter,
    ) -> Result<Expression, EvaluationError> {
        (**self).differentiate_function(name, param)
    }

    fn is_known_function(&self, name: &str) -> bool {
        (**self).is_known_function(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("there is no function called \"{name}\"")]
    UnknownFunction { name: SmolStr },
    #[error("unable to differentiate \"{name}\"")]
    UnableToDifferentiate { name: SmolStr },
    #[error("no value was provided for \"{name}\"")]
    UnknownParameter { name: SmolStr },
}

/// The set of builtin functions.
///
/// All trigonometric functions work in radians.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Builtins;

impl Context for Builtins {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError> {
        match name {
            "sin" => Ok(argument.sin()),
            "cos" => Ok(argument.cos()),
            "tan" => Ok(argument.tan()),
            "asin" => Ok(argument.asin()),
            "acos" => Ok(argument.acos()),
            "atan" => Ok(argument.atan()),
            "sqrt" => Ok(argument.sqrt()),
            "exp" => Ok(argument.exp()),
            "ln" => Ok(argument.ln()),
            _ => Err(EvaluationError::UnknownFunction { name: name.into() }),
        }
    }

    fn differentiate_function(
        &self,
        name: &str,
        param: &Parameter,
    ) -> Result<Expression, EvaluationError> {
        let x = || Expression::Parameter(param.clone());

        match name {
            "sin" => Ok(x().cos()),
            "cos" => Ok(-x().sin()),
            // sec²(x)
            "tan" => Ok(1.0 / x().cos().powi(2)),
            "asin" => Ok(1.0 / (1.0 - x().powi(2)).sqrt()),
            "acos" => Ok(-(1.0 / (1.0 - x().powi(2)).sqrt())),
            "atan" => Ok(1.0 / (1.0 + x().powi(2))),
            "sqrt" => Ok(Expression::Constant(0.5) / x().sqrt()),
            "exp" => Ok(x().exp()),
            "ln" => Ok(1.0 / x()),
            _ => Err(EvaluationError::UnableToDifferentiate {
                name: name.into(),
            }),
        }
    }
}

/// Evaluate an [`Expression`], using `lookup_parameter_value` to find the
/// value of each [`Parameter`].
pub fn evaluate<F, C>(
    expr: &Expression,
    lookup_parameter_value: &F,
    ctx: &C,
) -> Result<f64, EvaluationError>
where
    F: Fn(&Parameter) -> Option<f64>,
    C: Context,
{
    match expr {
        Expression::Parameter(p) => lookup_parameter_value(p).ok_or_else(|| {
            EvaluationError::UnknownParameter {
                name: p.name().into(),
            }
        }),
        Expression::Constant(value) => Ok(*value),
        Expression::Binary { left, right, op } => {
            let left = evaluate(left, lookup_parameter_value, ctx)?;
            let right = evaluate(right, lookup_parameter_value, ctx)?;
            Ok(apply(*op, left, right))
        },
        Expression::Negate(inner) => {
            evaluate(inner, lookup_parameter_value, ctx).map(|value| -value)
        },
        Expression::FunctionCall { function, argument } => {
            let argument = evaluate(argument, lookup_parameter_value, ctx)?;
            ctx.evaluate_function(function, argument)
        },
    }
}

fn apply(op: BinaryOperation, left: f64, right: f64) -> f64 {
    match op {
        BinaryOperation::Plus => left + right,
        BinaryOperation::Minus => left - right,
        BinaryOperation::Times => left * right,
        BinaryOperation::Divide => left / right,
        BinaryOperation::Power => left.powf(right),
    }
}

/// Simplify an expression by evaluating all constant operations.
pub fn fold_constants<C>(expr: &Expression, ctx: &C) -> Expression
where
    C: Context,
{
    match expr {
        Expression::Binary { left, right, op } => {
            fold_binary_op(left, right, *op, ctx)
        },
        Expression::Negate(expr) => match fold_constants(expr, ctx) {
            Expression::Constant(value) => Expression::Constant(-value),
            // double negative
            Expression::Negate(inner) => *inner,
            other => Expression::Negate(Box::new(other)),
        },
        Expression::FunctionCall { function, argument } => {
            let argument = fold_constants(argument, ctx);

            if let Expression::Constant(argument) = argument {
                if let Ok(result) = ctx.evaluate_function(function, argument) {
                    return Expression::Constant(result);
                }
            }

            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(argument),
            }
        },
        _ => expr.clone(),
    }
}

fn fold_binary_op<C>(
    left: &Expression,
    right: &Expression,
    op: BinaryOperation,
    ctx: &C,
) -> Expression
where
    C: Context,
{
    let left = fold_constants(left, ctx);
    let right = fold_constants(right, ctx);

    // If our operands contain constants, we can use arithmetic's identity laws
    // to simplify things
    match (left, right, op) {
        // x + x = 2x, x - x = 0, x / x = 1
        (left, right, BinaryOperation::Plus) if left == right => {
            fold_constants(&(Expression::Constant(2.0) * left), ctx)
        },
        (left, right, BinaryOperation::Minus) if left == right => {
            Expression::Constant(0.0)
        },
        (left, right, BinaryOperation::Divide) if left == right => {
            Expression::Constant(1.0)
        },

        // x + 0 = x
        (Expression::Constant(l), right, BinaryOperation::Plus)
            if l.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Plus)
            if r.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            left
        },

        // 0 * x = 0
        (Expression::Constant(l), _, BinaryOperation::Times)
            if l.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            Expression::Constant(0.0)
        },
        (_, Expression::Constant(r), BinaryOperation::Times)
            if r.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            Expression::Constant(0.0)
        },

        // 1 * x = x
        (Expression::Constant(l), right, BinaryOperation::Times)
            if l.approx_eq_eps(&1.0, &f64::EPSILON) =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Times)
            if r.approx_eq_eps(&1.0, &f64::EPSILON) =>
        {
            left
        },

        // 0 / x = 0
        (Expression::Constant(l), _, BinaryOperation::Divide)
            if l.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            Expression::Constant(0.0)
        },

        // x / 1 = x
        (left, Expression::Constant(r), BinaryOperation::Divide)
            if r.approx_eq_eps(&1.0, &f64::EPSILON) =>
        {
            left
        },

        // 0 - x = -x
        (Expression::Constant(l), right, BinaryOperation::Minus)
            if l.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            -right
        },

        // x - 0 = x
        (left, Expression::Constant(r), BinaryOperation::Minus)
            if r.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            left
        },

        // x^1 = x, x^0 = 1
        (left, Expression::Constant(r), BinaryOperation::Power)
            if r.approx_eq_eps(&1.0, &f64::EPSILON) =>
        {
            left
        },
        (_, Expression::Constant(r), BinaryOperation::Power)
            if r.approx_eq_eps(&0.0, &f64::EPSILON) =>
        {
            Expression::Constant(1.0)
        },

        // (x * y) * z
        (
            Expression::Constant(constant_a),
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            },
            BinaryOperation::Times,
        ) if left.is_constant() || right.is_constant() => {
            let (constant_b, expr) = split_constant(*left, *right);
            Expression::Constant(constant_a * constant_b) * expr
        },
        (
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            },
            Expression::Constant(constant_a),
            BinaryOperation::Times,
        ) if left.is_constant() || right.is_constant() => {
            let (constant_b, expr) = split_constant(*left, *right);
            Expression::Constant(constant_a * constant_b) * expr
        },

        // Evaluate in-place
        (Expression::Constant(l), Expression::Constant(r), op) => {
            Expression::Constant(apply(op, l, r))
        },

        // Oh well, we tried
        (left, right, op) => Expression::Binary {
            left: Box::new(left),
            right: Box::new(right),
            op,
        },
    }
}

fn split_constant(left: Expression, right: Expression) -> (f64, Expression) {
    match (left, right) {
        (Expression::Constant(left), right) => (left, right),
        (left, Expression::Constant(right)) => (right, left),
        _ => unreachable!(),
    }
}

/// Replace all references to a [`Parameter`] with an [`Expression`].
pub fn substitute(
    expression: &Expression,
    param: &Parameter,
    value: &Expression,
) -> Expression {
    match expression {
        Expression::Parameter(p) => {
            if p == param {
                value.clone()
            } else {
                Expression::Parameter(p.clone())
            }
        },
        Expression::Constant(value) => Expression::Constant(*value),
        Expression::Binary { left, right, op } => {
            let left = substitute(left, param, value);
            let right = substitute(right, param, value);
            Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op: *op,
            }
        },
        Expression::Negate(inner) => -substitute(inner, param, value),
        Expression::FunctionCall { function, argument } => {
            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(substitute(argument, param, value)),
            }
        },
    }
}

/// Calculate an [`Expression`]'s partial derivative with respect to a
/// particular [`Parameter`].
pub fn partial_derivative<C>(
    expr: &Expression,
    param: &Parameter,
    ctx: &C,
) -> Result<Expression, EvaluationError>
where
    C: Context,
{
    let got = match expr {
        Expression::Parameter(p) => {
            if p == param {
                Expression::Constant(1.0)
            } else {
                Expression::Constant(0.0)
            }
        },
        Expression::Constant(_) => Expression::Constant(0.0),
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Plus,
        } => {
            partial_derivative(left, param, ctx)?
                + partial_derivative(right, param, ctx)?
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Minus,
        } => {
            partial_derivative(left, param, ctx)?
                - partial_derivative(right, param, ctx)?
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Times,
        } => {
            // The product rule
            let d_left = partial_derivative(left, param, ctx)?;
            let d_right = partial_derivative(right, param, ctx)?;
            let left = Expression::clone(left);
            let right = Expression::clone(right);

            d_left * right + d_right * left
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Divide,
        } => {
            // The quotient rule
            let d_left = partial_derivative(left, param, ctx)?;
            let d_right = partial_derivative(right, param, ctx)?;
            let right = Expression::clone(right);
            let left = Expression::clone(left);

            (d_left * right.clone() - left * d_right) / right.powi(2)
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } if !right.depends_on(param) => {
            // The power rule, (u^n)' = n * u^(n-1) * u'
            let d_left = partial_derivative(left, param, ctx)?;
            let exponent = Expression::clone(right);
            let base = Expression::clone(left);

            exponent.clone() * base.pow(exponent - 1.0) * d_left
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } => {
            // (u^v)' = u^v * (v' * ln(u) + v * u' / u)
            let d_left = partial_derivative(left, param, ctx)?;
            let d_right = partial_derivative(right, param, ctx)?;
            let base = Expression::clone(left);
            let exponent = Expression::clone(right);

            base.clone().pow(exponent.clone())
                * (d_right * base.clone().ln() + exponent * d_left / base)
        },

        Expression::Negate(inner) => -partial_derivative(inner, param, ctx)?,
        Expression::FunctionCall { function, argument } => {
            // implement the chain rule: (f o g)' = (f' o g) * g'
            let g = Parameter::named("__temp__");
            let f_dash_of_g = ctx.differentiate_function(function, &g)?;
            let g_dash = partial_derivative(argument, param, ctx)?;

            substitute(&f_dash_of_g, &g, argument) * g_dash
        },
    };

    Ok(got)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn constant_fold_simple_arithmetic() {
        let inputs = vec![
            ("1", 1.0),
            ("1 + 1.5", 1.0 + 1.5),
            ("1 - 1.5", 1.0 - 1.5),
            ("2 * 3", 2.0 * 3.0),
            ("4 / 2", 4.0 / 2.0),
            ("2^10", 1024.0),
            ("sqrt(4)", 4_f64.sqrt()),
            ("sqrt(2 + 2)", (2_f64 + 2.0).sqrt()),
            ("sin(1.5)", 1.5_f64.sin()),
            ("atan(1)", 1_f64.atan()),
            ("sqrt(2 + sqrt(4))", (2.0 + 4_f64.sqrt()).sqrt()),
            ("-(1 + 2)", -(1.0 + 2.0)),
            ("0 * x", 0.0),
            ("x - x", 0.0),
            ("x/x", 1.0),
            ("x^0", 1.0),
        ];
        let ctx = Builtins::default();

        for (src, should_be) in inputs {
            let expr: Expression = src.parse().unwrap();
            let got = fold_constants(&expr, &ctx);

            match got {
                Expression::Constant(value) => assert_eq!(
                    value, should_be,
                    "{} -> {} != {}",
                    expr, value, should_be
                ),
                other => panic!(
                    "Expected a constant expression, but got \"{}\"",
                    other
                ),
            }
        }
    }

    #[test]
    fn constant_folding_leaves_unknowns_unevaluated() {
        let inputs = vec![
            ("x", "x"),
            ("-(2 * 3 + x)", "-(6 + x)"),
            ("unknown_function(3)", "unknown_function(3)"),
            ("2 * x * 3", "6 * x"),
            ("x + 5", "x + 5"),
            ("x + 5*2", "x + 10"),
            ("x + x", "2*x"),
            ("0 + x", "x"),
            ("x + 0", "x"),
            ("1 * x", "x"),
            ("x * 1", "x"),
            ("x - 0", "x"),
            ("0 - x", "-x"),
            ("x / 1", "x"),
            ("--x", "x"),
            ("x^1", "x"),
            ("(x + x)*3 + 5", "6*x + 5"),
        ];
        let ctx = Builtins::default();

        for (src, should_be) in inputs {
            let expr: Expression = src.parse().unwrap();

            let got = fold_constants(&expr, &ctx);

            let should_be: Expression = should_be.parse().unwrap();

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn basic_substitutions() {
        let parameter = Parameter::named("x");
        let inputs = vec![
            ("1 + 2", "3", "1 + 2"),
            ("x", "5", "5"),
            ("y", "5", "y"),
            ("x + 5", "5", " 5 + 5"),
            ("-x", "5", "-5"),
            ("sin(x)", "y + y", "sin(y + y)"),
            ("x^2", "3", "3^2"),
        ];

        for (src, new_value, should_be) in inputs {
            let original: Expression = src.parse().unwrap();
            let new_value: Expression = new_value.parse().unwrap();
            let should_be: Expression = should_be.parse().unwrap();

            let got = substitute(&original, &parameter, &new_value);

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn evaluate_with_parameters() {
        let inputs = vec![
            ("x", 2.0),
            ("x*y", 6.0),
            ("x^2 + y", 7.0),
            ("x^y", 8.0),
            ("-x/y", -2.0 / 3.0),
            ("sin(x*y)", 6_f64.sin()),
            ("ln(exp(y))", 3.0),
        ];
        let ctx = Builtins::default();
        let lookup = |p: &Parameter| match p.name() {
            "x" => Some(2.0),
            "y" => Some(3.0),
            _ => None,
        };

        for (src, should_be) in inputs {
            let expr: Expression = src.parse().unwrap();

            let got = evaluate(&expr, &lookup, &ctx).unwrap();

            approx::assert_relative_eq!(got, should_be);
        }
    }

    #[test]
    fn evaluating_a_missing_parameter_fails() {
        let expr: Expression = "x + z".parse().unwrap();
        let ctx = Builtins::default();

        let got = evaluate(&expr, &|_: &Parameter| None, &ctx).unwrap_err();

        assert_eq!(got, EvaluationError::UnknownParameter { name: "x".into() });
    }

    #[test]
    fn evaluating_an_unknown_function_fails() {
        let expr: Expression = "foo(1)".parse().unwrap();
        let ctx = Builtins::default();

        let got = evaluate(&expr, &|_: &Parameter| None, &ctx).unwrap_err();

        assert_eq!(got, EvaluationError::UnknownFunction { name: "foo".into() });
    }

    #[test]
    fn trig_uses_radians() {
        let ctx = Builtins::default();

        approx::assert_relative_eq!(
            ctx.evaluate_function("sin", PI / 2.0).unwrap(),
            1.0
        );
        approx::assert_relative_eq!(
            ctx.evaluate_function("tan", PI / 4.0).unwrap(),
            1.0,
            epsilon = 1e-12
        );
        assert!(ctx.is_known_function("acos"));
        assert!(!ctx.is_known_function("foo"));
    }

    #[test]
    fn differentiate_wrt_x() {
        let x = Parameter::named("x");
        let inputs = vec![
            ("x", "1"),
            ("1", "0"),
            ("x*x", "2 * x"),
            ("3*x*x + 5*x + 2", "6*x + 5"),
            ("x - y", "1"),
            ("sin(x)", "cos(x)"),
            ("cos(x)", "-sin(x)"),
            ("sqrt(x)", "0.5 / sqrt(x)"),
            ("x^3", "3*x^2"),
            ("exp(x)", "exp(x)"),
        ];
        let ctx = Builtins::default();

        for (src, should_be) in inputs {
            let original: Expression = src.parse().unwrap();
            let should_be: Expression = should_be.parse().unwrap();

            let got = partial_derivative(&original, &x, &ctx).unwrap();
            let got = fold_constants(&got, &ctx);

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn derivatives_agree_with_finite_differences() {
        let x = Parameter::named("x");
        let inputs = vec![
            "x/(1 + x)",
            "tan(x)",
            "asin(x)",
            "acos(x)",
            "atan(x^2)",
            "ln(x)*x",
            "x^x",
            "2^x",
            "2*(1/tan(x))*(16*sin(x)^2 - 1)/(16*(1.4 + cos(2*x)) + 2)",
        ];
        let ctx = Builtins::default();
        let at = 0.4;
        let h = 1e-6;

        for src in inputs {
            let original: Expression = src.parse().unwrap();
            let derivative = partial_derivative(&original, &x, &ctx).unwrap();
            let value_at = |v: f64| {
                evaluate(&original, &|_: &Parameter| Some(v), &ctx).unwrap()
            };

            let got =
                evaluate(&derivative, &|_: &Parameter| Some(at), &ctx).unwrap();
            let should_be = (value_at(at + h) - value_at(at - h)) / (2.0 * h);

            approx::assert_relative_eq!(
                got,
                should_be,
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn unknown_functions_cant_be_differentiated() {
        let x = Parameter::named("x");
        let original: Expression = "foo(x)".parse().unwrap();
        let ctx = Builtins::default();

        let got = partial_derivative(&original, &x, &ctx).unwrap_err();

        assert_eq!(
            got,
            EvaluationError::UnableToDifferentiate { name: "foo".into() }
        );
    }
}
