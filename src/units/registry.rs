use crate::{
    algebra::{
        self,
        ops::{self, Builtins},
        BinaryOperation, Expression,
    },
    units::{Dimension, Unit, UnitError, UnitQuantity},
};
use smol_str::SmolStr;
use std::{collections::HashMap, sync::OnceLock};

/// SI prefixes, as `(long name, symbol, factor)`.
const PREFIXES: &[(&str, &str, f64)] = &[
    ("yotta", "Y", 1e24),
    ("zetta", "Z", 1e21),
    ("exa", "E", 1e18),
    ("peta", "P", 1e15),
    ("tera", "T", 1e12),
    ("giga", "G", 1e9),
    ("mega", "M", 1e6),
    ("kilo", "k", 1e3),
    ("hecto", "h", 1e2),
    ("deca", "da", 1e1),
    ("deci", "d", 1e-1),
    ("centi", "c", 1e-2),
    ("milli", "m", 1e-3),
    ("micro", "u", 1e-6),
    ("nano", "n", 1e-9),
    ("pico", "p", 1e-12),
    ("femto", "f", 1e-15),
];

/// The SI base units, as `(names, dimension)`. The first name is the symbol.
const BASE_UNITS: &[(&[&str], Dimension)] = &[
    (&["m", "meter", "metre", "meters", "metres"], Dimension::LENGTH),
    (&["s", "second", "seconds", "sec"], Dimension::TIME),
    (&["A", "ampere", "amp", "amps"], Dimension::CURRENT),
    (&["K", "kelvin"], Dimension::TEMPERATURE),
    (&["mol", "mole", "moles"], Dimension::AMOUNT),
    (&["cd", "candela"], Dimension::LUMINOUS_INTENSITY),
];

/// Units defined in terms of other units, as `(names, definition,
/// prefixable)`. Order matters, a definition may only refer to units defined
/// above it.
const DERIVED_UNITS: &[(&[&str], &str, bool)] = &[
    // angles
    (&["rad", "radian", "radians"], "1", false),
    (&["deg", "degree", "degrees"], "0.017453292519943295*rad", false),
    (&["rev", "revolution", "turn"], "6.283185307179586*rad", false),
    // mass
    (&["g", "gram", "grams"], "0.001*kg", true),
    (&["t", "tonne", "tonnes"], "1000*kg", false),
    (&["lb", "lbm", "pound", "pounds"], "0.45359237*kg", false),
    (&["slug", "slugs"], "14.593902937206364*kg", false),
    // time
    (&["min", "minute", "minutes"], "60*s", false),
    (&["h", "hr", "hour", "hours"], "60*min", false),
    (&["day", "days"], "24*h", false),
    (&["week", "weeks"], "7*day", false),
    (&["yr", "year", "years"], "365.25*day", false),
    // length
    (&["in", "inch", "inches"], "0.0254*m", false),
    (&["ft", "foot", "feet"], "12*in", false),
    (&["yd", "yard", "yards"], "3*ft", false),
    (&["mi", "mile", "miles"], "5280*ft", false),
    (&["nmi", "nautical_mile"], "1852*m", false),
    // volume
    (&["L", "l", "liter", "litre", "liters", "litres"], "0.001*m^3", true),
    (&["gal", "gallon", "gallons"], "231*in^3", false),
    // velocity
    (&["mph"], "mi/h", false),
    (&["kn", "knot", "knots"], "nmi/h", false),
    // mechanics
    (&["Hz", "hertz"], "1/s", true),
    (&["N", "newton", "newtons"], "kg*m/s^2", true),
    (&["lbf", "pound_force"], "4.4482216152605*N", false),
    (&["Pa", "pascal", "pascals"], "N/m^2", true),
    (&["bar"], "100000*Pa", true),
    (&["atm", "atmosphere"], "101325*Pa", false),
    (&["psi"], "lbf/in^2", false),
    (&["J", "joule", "joules"], "N*m", true),
    (&["cal", "calorie", "calories"], "4.184*J", true),
    (&["Btu", "BTU"], "1055.05585262*J", false),
    (&["W", "watt", "watts"], "J/s", true),
    (&["hp", "horsepower"], "550*ft*lbf/s", false),
    // electromagnetism
    (&["C", "coulomb", "coulombs"], "A*s", true),
    (&["V", "volt", "volts"], "W/A", true),
    (&["ohm", "ohms"], "V/A", true),
    // temperature differences (no offset scales)
    (&["R", "rankine", "degR"], "5/9*K", false),
];

#[derive(Debug, Clone, PartialEq)]
struct Definition {
    unit: Unit,
    prefixable: bool,
}

/// A collection of named units which knows how to turn text like `"m^2/s^2"`
/// into a [`Unit`].
///
/// A registry is pure configuration. Most code will use the shared instance
/// from [`UnitRegistry::global()`], but callers are free to build their own
/// and [`define`](UnitRegistry::define) extra units.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRegistry {
    definitions: Vec<Definition>,
    names: HashMap<SmolStr, usize>,
}

impl UnitRegistry {
    /// A registry which only knows about `dimensionless` and the SI base
    /// units.
    pub fn new() -> Self {
        let mut registry = UnitRegistry {
            definitions: Vec::new(),
            names: HashMap::new(),
        };

        registry.insert(
            &["dimensionless", "dmnl"],
            Unit::dimensionless(),
            false,
        );
        registry.insert(
            &["kg", "kilogram", "kilograms"],
            Unit::primitive("kg", 1.0, Dimension::MASS),
            false,
        );

        for (names, dimension) in BASE_UNITS {
            let unit = Unit::primitive(names[0], 1.0, *dimension);
            registry.insert(names, unit, true);
        }

        registry
    }

    /// The process-wide default registry.
    pub fn global() -> &'static UnitRegistry {
        static GLOBAL: OnceLock<UnitRegistry> = OnceLock::new();
        GLOBAL.get_or_init(UnitRegistry::default)
    }

    /// Define a new unit in terms of existing ones (e.g. `"660*ft"`).
    ///
    /// The first name is used as the unit's symbol and any aliases may be used
    /// to look it up.
    pub fn define(
        &mut self,
        name: &str,
        aliases: &[&str],
        definition: &str,
    ) -> Result<Unit, UnitError> {
        self.define_unit(name, aliases, definition, false)
    }

    fn define_unit(
        &mut self,
        name: &str,
        aliases: &[&str],
        definition: &str,
        prefixable: bool,
    ) -> Result<Unit, UnitError> {
        let names: Vec<&str> =
            std::iter::once(name).chain(aliases.iter().copied()).collect();

        if let Some(taken) = names.iter().find(|n| self.contains(n)) {
            return Err(UnitError::AlreadyDefined {
                name: SmolStr::new(taken),
            });
        }

        let expr = parse_expression(definition)?;
        let value = self.evaluate(&expr, true)?;
        let unit = Unit::primitive(name, value.factor(), value.dimension());

        self.insert(&names, unit.clone(), prefixable);
        tracing::debug!(%name, %definition, "Defined a new unit");

        Ok(unit)
    }

    fn insert(&mut self, names: &[&str], unit: Unit, prefixable: bool) {
        let index = self.definitions.len();
        self.definitions.push(Definition { unit, prefixable });

        for name in names {
            self.names.insert(SmolStr::new(name), index);
        }
    }

    /// Is there a unit with this exact name or alias?
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Look up a single named unit, allowing SI prefixes (`km`, `kilometre`,
    /// `MPa`) on units which accept them.
    pub fn unit(&self, name: &str) -> Result<Unit, UnitError> {
        if let Some(&index) = self.names.get(name) {
            return Ok(self.definitions[index].unit.clone());
        }

        for (long, short, factor) in PREFIXES {
            let rest = name
                .strip_prefix(long)
                .or_else(|| name.strip_prefix(short));

            let definition = match rest.and_then(|r| self.names.get(r)) {
                Some(&index) => &self.definitions[index],
                None => continue,
            };

            if definition.prefixable {
                let base = &definition.unit;
                let symbol = format!("{}{}", short, base);
                return Ok(Unit::primitive(
                    symbol,
                    factor * base.factor(),
                    base.dimension(),
                ));
            }
        }

        Err(UnitError::UnknownUnit { name: name.into() })
    }

    /// Parse a unit expression like `"m^2/s^2"`, `"kg*m/s**2"` or `"1/s"`.
    ///
    /// An empty string is dimensionless.
    pub fn parse_unit(&self, text: &str) -> Result<Unit, UnitError> {
        if text.trim().is_empty() {
            return Ok(Unit::dimensionless());
        }

        let expr = parse_expression(text)?;
        self.evaluate(&expr, false)
    }

    /// Parse a quantity like `"30 deg"` or `"45 m^2/s^2"`. A bare number is
    /// dimensionless.
    pub fn parse_quantity(&self, text: &str) -> Result<UnitQuantity, UnitError> {
        let text = text.trim();
        let (number, unit) = match text.find(char::is_whitespace) {
            Some(index) => text.split_at(index),
            None => (text, ""),
        };

        let magnitude: f64 = number.parse().map_err(|_| UnitError::Parse {
            text: text.to_string(),
            reason: format!("\"{}\" isn't a number", number),
        })?;
        let unit = self.parse_unit(unit)?;

        Ok(UnitQuantity::new(magnitude, unit))
    }

    fn evaluate(
        &self,
        expr: &Expression,
        allow_scaling: bool,
    ) -> Result<Unit, UnitError> {
        match expr {
            Expression::Parameter(p) => self.unit(p.name()),
            Expression::Constant(value)
                if allow_scaling || *value == 1.0 =>
            {
                Ok(Unit::dimensionless().scaled(*value))
            },
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            } => {
                let left = self.evaluate(left, allow_scaling)?;
                let right = self.evaluate(right, allow_scaling)?;
                left.checked_mul(&right).ok_or_else(|| overflowed(expr))
            },
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Divide,
            } => {
                let left = self.evaluate(left, allow_scaling)?;
                let right = self.evaluate(right, allow_scaling)?;
                left.checked_div(&right).ok_or_else(|| overflowed(expr))
            },
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Power,
            } => {
                let base = self.evaluate(left, allow_scaling)?;
                let exponent = integer_exponent(right)?;
                base.checked_powi(exponent).ok_or_else(|| overflowed(expr))
            },
            other => Err(UnitError::Parse {
                text: other.to_string(),
                reason: String::from(
                    "units may only be multiplied, divided or raised to an \
                     integer power",
                ),
            }),
        }
    }
}

impl Default for UnitRegistry {
    /// A registry containing the SI units and a selection of common imperial
    /// and engineering units.
    fn default() -> Self {
        let mut registry = UnitRegistry::new();

        for (names, definition, prefixable) in DERIVED_UNITS {
            registry
                .define_unit(names[0], &names[1..], definition, *prefixable)
                .expect("The builtin unit definitions are all valid");
        }

        registry
    }
}

fn parse_expression(text: &str) -> Result<Expression, UnitError> {
    algebra::parse(text).map_err(|e| UnitError::Parse {
        text: text.to_string(),
        reason: e.to_string(),
    })
}

fn integer_exponent(expr: &Expression) -> Result<i32, UnitError> {
    let min = f64::from(i8::MIN);
    let max = f64::from(i8::MAX);

    match ops::fold_constants(expr, &Builtins) {
        Expression::Constant(value) if value.fract() == 0.0 => {
            if min <= value && value <= max {
                Ok(value as i32)
            } else {
                Err(UnitError::Parse {
                    text: value.to_string(),
                    reason: format!(
                        "exponents must be between {} and {}",
                        min, max
                    ),
                })
            }
        },
        other => Err(UnitError::Parse {
            text: other.to_string(),
            reason: String::from("exponents must be integers"),
        }),
    }
}

fn overflowed(expr: &Expression) -> UnitError {
    UnitError::Parse {
        text: expr.to_string(),
        reason: String::from("the unit's exponents are too large"),
    }
}
