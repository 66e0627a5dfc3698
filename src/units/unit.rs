use crate::units::{Dimension, UnitError};
use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Div, Mul},
};

/// A unit of measure.
///
/// Every unit knows its [`Dimension`] and the factor which takes a magnitude
/// in this unit to the SI-canonical ("base") unit for that dimension. Only
/// multiplicative units are supported, so there are no offset scales like
/// Celsius or Fahrenheit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// The named units this unit is made of, and the power each is raised to.
    terms: Vec<(SmolStr, i32)>,
    factor: f64,
    dimension: Dimension,
}

impl Unit {
    /// The identity unit.
    pub fn dimensionless() -> Unit {
        Unit {
            terms: Vec::new(),
            factor: 1.0,
            dimension: Dimension::DIMENSIONLESS,
        }
    }

    /// A named unit which can't be broken down any further.
    pub fn primitive<S: Into<SmolStr>>(
        symbol: S,
        factor: f64,
        dimension: Dimension,
    ) -> Unit {
        Unit {
            terms: vec![(symbol.into(), 1)],
            factor,
            dimension,
        }
    }

    /// The SI-canonical unit with this [`Dimension`].
    pub fn base_for(dimension: Dimension) -> Unit {
        Unit {
            terms: dimension
                .terms()
                .map(|(symbol, exponent)| (SmolStr::new(symbol), exponent))
                .collect(),
            factor: 1.0,
            dimension,
        }
    }

    /// The SI-canonical unit with the same [`Dimension`] as this one.
    pub fn base(&self) -> Unit { Unit::base_for(self.dimension) }

    pub fn factor(&self) -> f64 { self.factor }

    pub fn dimension(&self) -> Dimension { self.dimension }

    pub fn is_dimensionless(&self) -> bool { self.dimension.is_dimensionless() }

    /// Is this the identity unit (i.e. has no name and no scaling)?
    pub fn is_unitless(&self) -> bool {
        self.terms.is_empty() && self.factor == 1.0
    }

    pub fn is_compatible_with(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Does this unit describe exactly the same scale as `other`, even if
    /// they are spelled differently?
    pub fn is_equivalent_to(&self, other: &Unit) -> bool {
        self.is_compatible_with(other)
            && approx::relative_eq!(self.factor, other.factor)
    }

    /// The number a magnitude in this unit must be multiplied by to express it
    /// in `target`.
    pub fn conversion_factor(&self, target: &Unit) -> Result<f64, UnitError> {
        if self.is_compatible_with(target) {
            Ok(self.factor / target.factor)
        } else {
            Err(UnitError::Incompatible {
                from: self.clone(),
                to: target.clone(),
            })
        }
    }

    /// Convert a magnitude expressed in this unit into `target`.
    pub fn convert(
        &self,
        magnitude: f64,
        target: &Unit,
    ) -> Result<f64, UnitError> {
        let factor = self.conversion_factor(target)?;
        tracing::trace!(from = %self, to = %target, factor, "Converting");

        Ok(magnitude * factor)
    }

    /// # Panics
    ///
    /// If the resulting exponents are too large. See
    /// [`Unit::checked_powi()`].
    pub fn powi(&self, exponent: i32) -> Unit {
        self.checked_powi(exponent).unwrap_or_else(|| {
            panic!("Raising {} to the power of {} overflowed", self, exponent)
        })
    }

    pub fn checked_powi(&self, exponent: i32) -> Option<Unit> {
        let mut terms = Vec::new();

        if exponent != 0 {
            for (symbol, e) in &self.terms {
                terms.push((symbol.clone(), e.checked_mul(exponent)?));
            }
        }

        Some(Unit {
            terms,
            factor: self.factor.powi(exponent),
            dimension: self.dimension.checked_powi(exponent)?,
        })
    }

    pub fn checked_mul(&self, rhs: &Unit) -> Option<Unit> {
        Some(Unit {
            terms: self.merge_terms(rhs, 1)?,
            factor: self.factor * rhs.factor,
            dimension: self.dimension.checked_mul(rhs.dimension)?,
        })
    }

    pub fn checked_div(&self, rhs: &Unit) -> Option<Unit> {
        Some(Unit {
            terms: self.merge_terms(rhs, -1)?,
            factor: self.factor / rhs.factor,
            dimension: self.dimension.checked_div(rhs.dimension)?,
        })
    }

    /// Multiply the scale of this unit by a constant (e.g. `ft` to `660*ft`).
    pub(crate) fn scaled(mut self, factor: f64) -> Unit {
        self.factor *= factor;
        self
    }

    fn merge_terms(
        &self,
        other: &Unit,
        sign: i32,
    ) -> Option<Vec<(SmolStr, i32)>> {
        let mut terms = self.terms.clone();

        for (symbol, exponent) in &other.terms {
            let exponent = exponent.checked_mul(sign)?;

            match terms.iter_mut().find(|(s, _)| s == symbol) {
                Some((_, e)) => *e = e.checked_add(exponent)?,
                None => terms.push((symbol.clone(), exponent)),
            }
        }

        terms.retain(|(_, e)| *e != 0);
        Some(terms)
    }
}

impl Default for Unit {
    fn default() -> Unit { Unit::dimensionless() }
}

impl<'a> Mul<&'a Unit> for &'a Unit {
    type Output = Unit;

    fn mul(self, rhs: &'a Unit) -> Unit {
        self.checked_mul(rhs).unwrap_or_else(|| {
            panic!("Multiplying {} by {} overflowed", self, rhs)
        })
    }
}

impl<'a> Div<&'a Unit> for &'a Unit {
    type Output = Unit;

    fn div(self, rhs: &'a Unit) -> Unit {
        self.checked_div(rhs).unwrap_or_else(|| {
            panic!("Dividing {} by {} overflowed", self, rhs)
        })
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit { &self * &rhs }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit { &self / &rhs }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let numerator: Vec<_> =
            self.terms.iter().filter(|(_, e)| *e > 0).collect();
        let denominator: Vec<_> =
            self.terms.iter().filter(|(_, e)| *e < 0).collect();

        if numerator.is_empty() {
            if denominator.is_empty() {
                return Ok(());
            }
            write!(f, "1")?;
        }

        for (i, (symbol, exponent)) in numerator.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write_term(f, symbol, *exponent)?;
        }

        match denominator.len() {
            0 => Ok(()),
            1 => {
                let (symbol, exponent) = denominator[0];
                write!(f, "/")?;
                write_term(f, symbol, -exponent)
            },
            _ => {
                write!(f, "/(")?;
                for (i, (symbol, exponent)) in denominator.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    write_term(f, symbol, -exponent)?;
                }
                write!(f, ")")
            },
        }
    }
}

fn write_term(f: &mut Formatter<'_>, symbol: &str, exponent: i32) -> fmt::Result {
    if exponent == 1 {
        write!(f, "{}", symbol)
    } else {
        write!(f, "{}^{}", symbol, exponent)
    }
}
