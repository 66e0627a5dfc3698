use crate::units::{Unit, UnitError, UnitRegistry};
use std::{
    fmt::{self, Display, Formatter},
    ops::Mul,
    str::FromStr,
};

/// A magnitude paired with the [`Unit`] it is measured in.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitQuantity {
    magnitude: f64,
    unit: Unit,
}

impl UnitQuantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        UnitQuantity { magnitude, unit }
    }

    pub fn dimensionless(magnitude: f64) -> Self {
        UnitQuantity::new(magnitude, Unit::dimensionless())
    }

    pub fn magnitude(&self) -> f64 { self.magnitude }

    pub fn unit(&self) -> &Unit { &self.unit }

    /// Express this quantity in another unit.
    pub fn convert_to(&self, target: &Unit) -> Result<UnitQuantity, UnitError> {
        let magnitude = self.unit.convert(self.magnitude, target)?;
        Ok(UnitQuantity::new(magnitude, target.clone()))
    }

    /// Express this quantity in SI-canonical units.
    pub fn to_base_units(&self) -> UnitQuantity {
        UnitQuantity::new(self.magnitude * self.unit.factor(), self.unit.base())
    }
}

impl From<f64> for UnitQuantity {
    fn from(magnitude: f64) -> UnitQuantity {
        UnitQuantity::dimensionless(magnitude)
    }
}

impl Mul<Unit> for f64 {
    type Output = UnitQuantity;

    fn mul(self, unit: Unit) -> UnitQuantity { UnitQuantity::new(self, unit) }
}

impl<'a> Mul<&'a Unit> for f64 {
    type Output = UnitQuantity;

    fn mul(self, unit: &'a Unit) -> UnitQuantity {
        UnitQuantity::new(self, unit.clone())
    }
}

impl FromStr for UnitQuantity {
    type Err = UnitError;

    /// Parse something like `"30 deg"` using the global [`UnitRegistry`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitRegistry::global().parse_quantity(s)
    }
}

impl Display for UnitQuantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.unit.is_unitless() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}
