use crate::{
    algebra::{Expression, Parameter},
    units::{Unit, UnitQuantity},
    Error,
};
use smol_str::SmolStr;
use std::{
    cell::RefCell,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

/// A named physical quantity which may or may not have a known value.
///
/// A [`Variable`] is a handle. Cloning it gives you another reference to the
/// same underlying state, so a value set through one handle (e.g. when a
/// [`crate::Relation`] solves for it) is seen by every other handle.
///
/// The unit a variable is measured in is chosen when it is created and is only
/// ever changed by [`Variable::convert_to()`].
#[derive(Debug, Clone)]
pub struct Variable(Rc<Inner>);

#[derive(Debug)]
struct Inner {
    name: SmolStr,
    state: RefCell<State>,
}

#[derive(Debug, Clone, PartialEq)]
struct State {
    unit: Unit,
    magnitude: f64,
    known: bool,
    description: String,
}

/// Something which can be assigned to a [`Variable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A bare number, assumed to already be in the variable's unit.
    Magnitude(f64),
    /// A quantity which will be converted to the variable's unit.
    Quantity(UnitQuantity),
}

impl From<f64> for Value {
    fn from(magnitude: f64) -> Value { Value::Magnitude(magnitude) }
}

impl From<UnitQuantity> for Value {
    fn from(quantity: UnitQuantity) -> Value { Value::Quantity(quantity) }
}

impl<'a> From<&'a UnitQuantity> for Value {
    fn from(quantity: &'a UnitQuantity) -> Value {
        Value::Quantity(quantity.clone())
    }
}

impl Variable {
    /// Create a new [`Variable`] with an unknown value.
    pub fn new<S: Into<SmolStr>>(name: S, unit: Unit) -> Variable {
        Variable(Rc::new(Inner {
            name: name.into(),
            state: RefCell::new(State {
                unit,
                magnitude: 0.0,
                known: false,
                description: String::new(),
            }),
        }))
    }

    pub fn dimensionless<S: Into<SmolStr>>(name: S) -> Variable {
        Variable::new(name, Unit::dimensionless())
    }

    pub fn with_magnitude(self, magnitude: f64) -> Result<Variable, Error> {
        self.set_value(magnitude)?;
        Ok(self)
    }

    pub fn with_description<S: Into<String>>(self, description: S) -> Variable {
        self.set_description(description);
        self
    }

    /// Give this [`Variable`] a value, converting it to the variable's unit
    /// when necessary.
    pub fn set_value<V: Into<Value>>(&self, value: V) -> Result<(), Error> {
        let mut state = self.0.state.borrow_mut();

        let magnitude = match value.into() {
            Value::Magnitude(magnitude) => magnitude,
            Value::Quantity(quantity) => {
                quantity.unit().convert(quantity.magnitude(), &state.unit)?
            },
        };

        if !magnitude.is_finite() {
            return Err(Error::UnsupportedValue { value: magnitude });
        }

        state.magnitude = magnitude;
        state.known = true;

        Ok(())
    }

    /// Change the unit this [`Variable`] is measured in, rescaling its
    /// magnitude to match.
    ///
    /// An unknown variable keeps its (implicit zero) magnitude.
    pub fn convert_to(&self, unit: &Unit) -> Result<(), Error> {
        let mut state = self.0.state.borrow_mut();

        state.magnitude = state.unit.convert(state.magnitude, unit)?;
        state.unit = unit.clone();

        Ok(())
    }

    /// Forget this [`Variable`]'s value.
    pub fn clear_value(&self) {
        let mut state = self.0.state.borrow_mut();
        state.magnitude = 0.0;
        state.known = false;
    }

    pub fn is_known(&self) -> bool { self.0.state.borrow().known }

    pub fn magnitude(&self) -> Result<f64, Error> {
        let state = self.0.state.borrow();

        if state.known {
            Ok(state.magnitude)
        } else {
            Err(Error::ValueUnknown {
                name: self.0.name.clone(),
            })
        }
    }

    /// The value of this [`Variable`] as a [`UnitQuantity`].
    pub fn quantity(&self) -> Result<UnitQuantity, Error> {
        let magnitude = self.magnitude()?;
        Ok(UnitQuantity::new(magnitude, self.unit()))
    }

    pub fn name(&self) -> &str { &self.0.name }

    pub fn unit(&self) -> Unit { self.0.state.borrow().unit.clone() }

    pub fn description(&self) -> String {
        self.0.state.borrow().description.clone()
    }

    pub fn set_description<S: Into<String>>(&self, description: S) {
        self.0.state.borrow_mut().description = description.into();
    }

    /// The [`Parameter`] this variable is referred to by in an equation.
    pub fn parameter(&self) -> Parameter { Parameter::named(self.0.name.clone()) }

    /// An [`Expression`] referring to this variable.
    pub fn symbol(&self) -> Expression { Expression::Parameter(self.parameter()) }

    /// Do these two handles refer to the same [`Variable`]?
    pub fn same_as(&self, other: &Variable) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();

        write!(f, "{} = ", self.0.name)?;

        if state.known {
            write!(f, "{}", state.magnitude)?;
        } else {
            write!(f, "?")?;
        }

        if !state.unit.is_unitless() {
            write!(f, " {}", state.unit)?;
        }

        Ok(())
    }
}
