use crate::{
    algebra::{
        ops::{self, Builtins, Context, EvaluationError},
        Expression,
    },
    solve::{self, SolverConfig},
    units::UnitQuantity,
    Equation, Error, Variable,
};
use smol_str::SmolStr;
use std::fmt::{self, Display, Formatter};

/// How the [`Variable`]s passed to [`Relation::solve()`] are matched up with
/// the variables a [`Relation`] was declared with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pairing {
    /// Match each input to the declared variable with the same name.
    ByName,
    /// Match inputs to declared variables by position, ignoring their names.
    Positional,
}

impl Default for Pairing {
    fn default() -> Pairing { Pairing::ByName }
}

/// Options used by [`Relation::solve_with()`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolveOptions {
    /// The starting point for the root finder, in the unknown's base units.
    pub guess: f64,
    pub pairing: Pairing,
    /// Print the solved variable to stdout.
    pub verbose: bool,
    pub solver: SolverConfig,
}

impl Default for SolveOptions {
    fn default() -> SolveOptions {
        SolveOptions {
            guess: 0.1,
            pairing: Pairing::default(),
            verbose: true,
            solver: SolverConfig::default(),
        }
    }
}

/// An [`Equation`] relating a fixed set of [`Variable`]s, which can be solved
/// for whichever of those variables is unknown.
#[derive(Debug, Clone)]
pub struct Relation {
    variables: Vec<Variable>,
    equation: Equation,
    is_static: bool,
    description: String,
}

impl Relation {
    pub fn new<V>(variables: V, equation: Equation) -> Result<Relation, Error>
    where
        V: IntoIterator<Item = Variable>,
    {
        Relation::builder()
            .variables(variables)?
            .equation(equation)?
            .build()
    }

    pub fn builder() -> RelationBuilder { RelationBuilder::new() }

    pub fn equation(&self) -> &Equation { &self.equation }

    /// The equation rearranged so it equals zero (i.e. `left - right`).
    pub fn expression(&self) -> Expression { self.equation.body() }

    pub fn variables(&self) -> &[Variable] { &self.variables }

    pub fn is_static(&self) -> bool { self.is_static }

    pub fn set_static(&mut self, is_static: bool) { self.is_static = is_static; }

    pub fn description(&self) -> &str { &self.description }

    pub fn set_description<S: Into<String>>(&mut self, description: S) {
        self.description = description.into();
    }

    /// Solve for the one unknown [`Variable`] in `variables`, using the
    /// default [`SolveOptions`].
    pub fn solve(&self, variables: &[Variable]) -> Result<Variable, Error> {
        self.solve_with(variables, &SolveOptions::default())
    }

    /// Solve for whichever of the declared variables is unknown.
    pub fn solve_auto(&self) -> Result<Variable, Error> {
        self.solve_auto_with(&SolveOptions::default())
    }

    pub fn solve_auto_with(
        &self,
        options: &SolveOptions,
    ) -> Result<Variable, Error> {
        self.solve_with(&self.variables, options)
    }

    /// Solve for the one unknown [`Variable`] in `variables`.
    ///
    /// Every known variable is converted to base units and substituted into
    /// the equation, then the resulting single-variable equation is solved
    /// numerically. The root is converted back to the unknown's unit and
    /// stored in the caller's [`Variable`], which is also returned.
    pub fn solve_with(
        &self,
        variables: &[Variable],
        options: &SolveOptions,
    ) -> Result<Variable, Error> {
        if variables.len() != self.variables.len() {
            return Err(Error::ArityMismatch {
                expected: self.variables.len(),
                found: variables.len(),
            });
        }

        let pairs = self.pair_up(variables, options.pairing)?;

        let unknowns: Vec<_> =
            pairs.iter().filter(|(_, input)| !input.is_known()).collect();
        let (declared, unknown) = match unknowns.as_slice() {
            [(declared, unknown)] => (*declared, *unknown),
            _ => {
                return Err(Error::UnderOrOverDetermined {
                    unknowns: unknowns
                        .iter()
                        .map(|(_, input)| SmolStr::new(input.name()))
                        .collect(),
                })
            },
        };

        let mut expr = self.expression();

        for (slot, input) in &pairs {
            if input.is_known() {
                let value = input.quantity()?.to_base_units().magnitude();
                expr = ops::substitute(
                    &expr,
                    &slot.parameter(),
                    &Expression::Constant(value),
                );
            }
        }

        let expr = ops::fold_constants(&expr, &Builtins);
        tracing::debug!(
            relation = %self.equation,
            unknown = declared.name(),
            expression = %expr,
            "Substituted the known values"
        );

        let param = declared.parameter();
        if !expr.depends_on(&param) {
            return Err(Error::Unconstrained {
                name: unknown.name().into(),
            });
        }

        let solution = solve::solve(
            std::slice::from_ref(&expr),
            std::slice::from_ref(&param),
            &[options.guess],
            &Builtins,
            &options.solver,
        )?;

        let root = solution.known_values[&param];
        let unit = unknown.unit();
        let value = UnitQuantity::new(root, unit.base()).convert_to(&unit)?;
        unknown.set_value(value)?;

        tracing::info!(
            variable = unknown.name(),
            value = %unknown,
            iterations = solution.iterations,
            "Solved"
        );
        if options.verbose {
            println!("{}", unknown);
        }

        Ok(unknown.clone())
    }

    /// Match each declared variable with the caller-supplied variable which
    /// will provide its value.
    fn pair_up<'a>(
        &'a self,
        variables: &'a [Variable],
        pairing: Pairing,
    ) -> Result<Vec<(&'a Variable, &'a Variable)>, Error> {
        match pairing {
            Pairing::Positional => {
                Ok(self.variables.iter().zip(variables).collect())
            },
            Pairing::ByName => {
                ensure_unique(variables)?;

                if let Some(undeclared) = variables
                    .iter()
                    .find(|v| self.declared(v.name()).is_none())
                {
                    return Err(Error::UndeclaredVariable {
                        name: undeclared.name().into(),
                    });
                }

                // every input is declared, the names are unique and the
                // lengths match, so every declared name has an input
                Ok(variables
                    .iter()
                    .filter_map(|v| self.declared(v.name()).map(|d| (d, v)))
                    .collect())
            },
        }
    }

    fn declared(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.equation)
    }
}

/// A builder for [`Relation`]s where the variables and equation may each only
/// be set once.
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    variables: Option<Vec<Variable>>,
    equation: Option<Equation>,
    is_static: bool,
    description: String,
}

impl RelationBuilder {
    pub fn new() -> Self {
        RelationBuilder {
            variables: None,
            equation: None,
            is_static: true,
            description: String::new(),
        }
    }

    pub fn variables<V>(mut self, variables: V) -> Result<Self, Error>
    where
        V: IntoIterator<Item = Variable>,
    {
        if self.variables.is_some() {
            return Err(Error::AlreadySet { field: "variables" });
        }

        self.variables = Some(variables.into_iter().collect());
        Ok(self)
    }

    pub fn equation(mut self, equation: Equation) -> Result<Self, Error> {
        if self.equation.is_some() {
            return Err(Error::AlreadySet { field: "equation" });
        }

        self.equation = Some(equation);
        Ok(self)
    }

    pub fn is_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn build(self) -> Result<Relation, Error> {
        let variables = self
            .variables
            .ok_or(Error::Incomplete { missing: "variables" })?;
        let equation = self
            .equation
            .ok_or(Error::Incomplete { missing: "an equation" })?;

        ensure_unique(&variables)?;

        for param in equation.params() {
            if !variables.iter().any(|v| v.name() == param.name()) {
                return Err(Error::UndeclaredVariable {
                    name: param.name().into(),
                });
            }
        }

        let body = equation.body();
        if let Some(function) =
            body.functions().find(|f| !Builtins.is_known_function(f))
        {
            return Err(EvaluationError::UnknownFunction {
                name: function.clone(),
            }
            .into());
        }

        Ok(Relation {
            variables,
            equation,
            is_static: self.is_static,
            description: self.description,
        })
    }
}

impl Default for RelationBuilder {
    fn default() -> Self { RelationBuilder::new() }
}

fn ensure_unique(variables: &[Variable]) -> Result<(), Error> {
    for (i, variable) in variables.iter().enumerate() {
        if variables[..i].iter().any(|v| v.name() == variable.name()) {
            return Err(Error::DuplicateVariable {
                name: variable.name().into(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        solve::SolveError,
        units::{Unit, UnitRegistry},
    };

    fn unit(name: &str) -> Unit { UnitRegistry::global().parse_unit(name).unwrap() }

    fn quiet() -> SolveOptions {
        SolveOptions {
            verbose: false,
            ..Default::default()
        }
    }

    const OBLIQUE_SHOCK: &str = "tan(theta) = 2*(1/tan(beta))*(M^2*sin(beta)^2 - 1)/(M^2*(gamma + cos(2*beta)) + 2)";

    struct Shock {
        theta: Variable,
        beta: Variable,
        mach: Variable,
        gamma: Variable,
        relation: Relation,
    }

    fn oblique_shock() -> Shock {
        let theta = Variable::new("theta", unit("deg"))
            .with_description("Slope half angle");
        let beta = Variable::new("beta", unit("deg"))
            .with_description("Shock wave angle");
        let mach = Variable::dimensionless("M").with_description("Mach number");
        let gamma = Variable::dimensionless("gamma")
            .with_magnitude(1.4)
            .unwrap()
            .with_description("Specific heat ratio");

        let relation = Relation::new(
            vec![beta.clone(), theta.clone(), mach.clone(), gamma.clone()],
            OBLIQUE_SHOCK.parse().unwrap(),
        )
        .unwrap();

        Shock {
            theta,
            beta,
            mach,
            gamma,
            relation,
        }
    }

    fn velocity() -> (Variable, Variable, Relation) {
        let v1 = Variable::new("v_1", unit("m^2/s^2")).with_magnitude(45.0).unwrap();
        let x1 = Variable::new("x_1", unit("ft/s"));
        let relation = Relation::new(
            vec![x1.clone(), v1.clone()],
            "x_1^2 = v_1".parse().unwrap(),
        )
        .unwrap();

        (x1, v1, relation)
    }

    #[test]
    fn solve_for_the_shock_wave_angle() {
        let shock = oblique_shock();
        shock.theta.set_value(30.0 * unit("deg")).unwrap();
        shock.mach.set_value(4.0).unwrap();

        let got = shock.relation.solve_auto_with(&quiet()).unwrap();

        assert!(got.same_as(&shock.beta));
        assert_eq!(got.unit(), unit("deg"));
        let beta = got.magnitude().unwrap();
        assert!(0.0 < beta && beta < 90.0);
        approx::assert_relative_eq!(beta, 45.2240763, max_relative = 1e-6);

        // everything else is untouched
        assert_eq!(shock.theta.magnitude().unwrap(), 30.0);
        assert_eq!(shock.gamma.magnitude().unwrap(), 1.4);

        shock.beta.convert_to(&unit("rad")).unwrap();
        approx::assert_relative_eq!(
            shock.beta.magnitude().unwrap(),
            0.78930903,
            max_relative = 1e-6
        );
    }

    #[test]
    fn solve_for_velocity_in_feet_per_second() {
        let (x1, v1, relation) = velocity();

        let got = relation.solve_with(&[x1.clone(), v1], &quiet()).unwrap();

        assert!(got.same_as(&x1));
        assert_eq!(x1.unit(), unit("ft/s"));
        approx::assert_relative_eq!(
            x1.magnitude().unwrap(),
            45.0_f64.sqrt() / 0.3048,
            max_relative = 1e-9
        );
        approx::assert_relative_eq!(
            x1.magnitude().unwrap(),
            22.0085,
            max_relative = 1e-5
        );
    }

    #[test]
    fn inputs_can_be_in_any_order_when_paired_by_name() {
        let (x1, v1, relation) = velocity();

        relation.solve_with(&[v1, x1.clone()], &quiet()).unwrap();

        approx::assert_relative_eq!(
            x1.magnitude().unwrap(),
            45.0_f64.sqrt() / 0.3048,
            max_relative = 1e-9
        );
    }

    #[test]
    fn positional_pairing_substitutes_other_variables() {
        let (x1, v1, relation) = velocity();
        let x2 = Variable::new("X_2", unit("mi/yr"));
        let options = SolveOptions {
            pairing: Pairing::Positional,
            ..quiet()
        };

        let got = relation.solve_with(&[x2.clone(), v1], &options).unwrap();

        assert!(got.same_as(&x2));
        assert!(!x1.is_known());
        assert_eq!(x2.unit(), unit("mi/yr"));
        approx::assert_relative_eq!(
            x2.magnitude().unwrap(),
            45.0_f64.sqrt() * 31_557_600.0 / 1609.344,
            max_relative = 1e-9
        );
    }

    #[test]
    fn undeclared_inputs_are_rejected_when_paired_by_name() {
        let (_, v1, relation) = velocity();
        let x2 = Variable::new("X_2", unit("mi/yr"));

        let got = relation.solve_with(&[x2.clone(), v1], &quiet()).unwrap_err();

        assert_eq!(got, Error::UndeclaredVariable { name: "X_2".into() });
        assert!(!x2.is_known());
    }

    #[test]
    fn repeated_inputs_are_rejected() {
        let (_, v1, relation) = velocity();

        let got = relation.solve_with(&[v1.clone(), v1], &quiet()).unwrap_err();

        assert_eq!(got, Error::DuplicateVariable { name: "v_1".into() });
    }

    #[test]
    fn wrong_number_of_inputs() {
        let (x1, _, relation) = velocity();

        let got = relation.solve_with(&[x1], &quiet()).unwrap_err();

        assert_eq!(
            got,
            Error::ArityMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn exactly_one_variable_must_be_unknown() {
        let (x1, v1, relation) = velocity();

        v1.clear_value();
        let got = relation.solve_auto_with(&quiet()).unwrap_err();
        assert_eq!(
            got,
            Error::UnderOrOverDetermined {
                unknowns: vec!["x_1".into(), "v_1".into()]
            }
        );

        v1.set_value(45.0).unwrap();
        x1.set_value(22.0).unwrap();
        let got = relation.solve_auto_with(&quiet()).unwrap_err();
        assert_eq!(got, Error::UnderOrOverDetermined { unknowns: vec![] });
    }

    #[test]
    fn equations_may_only_use_declared_variables() {
        let x = Variable::dimensionless("x");

        let got = Relation::new(vec![x], "x + y = 2".parse().unwrap())
            .unwrap_err();

        assert_eq!(got, Error::UndeclaredVariable { name: "y".into() });
    }

    #[test]
    fn declared_variables_must_be_unique() {
        let x = Variable::dimensionless("x");
        let also_x = Variable::dimensionless("x");

        let got = Relation::new(vec![x, also_x], "x = 2".parse().unwrap())
            .unwrap_err();

        assert_eq!(got, Error::DuplicateVariable { name: "x".into() });
    }

    #[test]
    fn equations_may_only_call_known_functions() {
        let x = Variable::dimensionless("x");

        let got = Relation::new(vec![x], "cot(x) = 2".parse().unwrap())
            .unwrap_err();

        assert_eq!(
            got,
            Error::Evaluation(EvaluationError::UnknownFunction {
                name: "cot".into()
            })
        );
    }

    #[test]
    fn variables_and_equations_can_only_be_set_once() {
        let x = Variable::dimensionless("x");
        let equation: Equation = "x = 2".parse().unwrap();

        let got = Relation::builder()
            .variables(vec![x.clone()])
            .unwrap()
            .variables(vec![x.clone()])
            .unwrap_err();
        assert_eq!(got, Error::AlreadySet { field: "variables" });

        let got = Relation::builder()
            .equation(equation.clone())
            .unwrap()
            .equation(equation.clone())
            .unwrap_err();
        assert_eq!(got, Error::AlreadySet { field: "equation" });

        let got = Relation::builder().equation(equation).unwrap().build();
        assert_eq!(got.unwrap_err(), Error::Incomplete { missing: "variables" });
    }

    #[test]
    fn builder_sets_the_informational_fields() {
        let x = Variable::dimensionless("x");

        let mut relation = Relation::builder()
            .variables(vec![x])
            .unwrap()
            .equation("x^2 = 2".parse().unwrap())
            .unwrap()
            .is_static(false)
            .description("Square root of two")
            .build()
            .unwrap();

        assert!(!relation.is_static());
        assert_eq!(relation.description(), "Square root of two");
        assert_eq!(relation.to_string(), "x^2 = 2");
        assert_eq!(relation.expression().to_string(), "x^2 - 2");

        relation.set_static(true);
        relation.set_description("sqrt(2)");
        assert!(relation.is_static());
        assert_eq!(relation.description(), "sqrt(2)");
    }

    #[test]
    fn relations_are_static_by_default() {
        let (_, _, relation) = velocity();

        assert!(relation.is_static());
        assert_eq!(relation.description(), "");
        assert_eq!(relation.variables().len(), 2);
    }

    #[test]
    fn solved_values_are_shared_between_relations() {
        let a = Variable::new("a", unit("m")).with_magnitude(3.0).unwrap();
        let b = Variable::new("b", unit("m"));
        let c = Variable::new("c", unit("m")).with_magnitude(5.0).unwrap();
        let area = Variable::new("area", unit("ft^2"));

        let pythagoras = Relation::new(
            vec![a.clone(), b.clone(), c.clone()],
            "a^2 + b^2 = c^2".parse().unwrap(),
        )
        .unwrap();
        let rectangle = Relation::new(
            vec![a.clone(), b.clone(), area.clone()],
            "area = a*b".parse().unwrap(),
        )
        .unwrap();

        pythagoras.solve_auto_with(&quiet()).unwrap();
        rectangle.solve_auto_with(&quiet()).unwrap();

        approx::assert_relative_eq!(b.magnitude().unwrap(), 4.0, max_relative = 1e-9);
        approx::assert_relative_eq!(
            area.magnitude().unwrap(),
            12.0 / (0.3048 * 0.3048),
            max_relative = 1e-9
        );
    }

    #[test]
    fn unknowns_missing_from_the_equation_cant_be_solved() {
        let x = Variable::dimensionless("x").with_magnitude(2.0).unwrap();
        let unused = Variable::dimensionless("unused");
        let relation = Relation::new(
            vec![x, unused.clone()],
            "x^2 = 4".parse().unwrap(),
        )
        .unwrap();

        let got = relation.solve_auto_with(&quiet()).unwrap_err();

        assert_eq!(got, Error::Unconstrained { name: "unused".into() });
        assert!(!unused.is_known());
    }

    #[test]
    fn unknowns_which_cancel_out_cant_be_solved() {
        let x = Variable::dimensionless("x");
        let relation =
            Relation::new(vec![x.clone()], "x - x = 0".parse().unwrap())
                .unwrap();

        let got = relation.solve_auto_with(&quiet()).unwrap_err();

        assert_eq!(got, Error::Unconstrained { name: "x".into() });
        assert!(!x.is_known());
    }

    #[test]
    fn solver_failures_are_reported() {
        let x = Variable::dimensionless("x");
        let relation =
            Relation::new(vec![x], "x^2 + 1 = 0".parse().unwrap()).unwrap();

        let got = relation.solve_auto_with(&quiet()).unwrap_err();

        assert_eq!(got, Error::Solve(SolveError::DidntConverge));
    }
}
